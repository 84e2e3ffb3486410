//! Wi-Fi bring-up: station mode with a bounded association budget, and
//! an open setup access point for provisioning.

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
};
use log::{info, warn};

use crate::adapters::credentials::NetworkCredentials;
use crate::config::NetworkConfig;

pub type Wifi = BlockingWifi<EspWifi<'static>>;

pub fn new_driver(
    modem: Modem,
    sysloop: EspSystemEventLoop,
    nvs: Option<EspDefaultNvsPartition>,
) -> Result<Wifi, EspError> {
    BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), nvs)?, sysloop)
}

/// Associate with the stored network.  `Ok(false)` when the budget runs
/// out.
pub fn connect_station(
    wifi: &mut Wifi,
    creds: &NetworkCredentials,
    config: &NetworkConfig,
) -> Result<bool, EspError> {
    let auth_method = if creds.password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: creds.ssid.clone(),
        password: creds.password.clone(),
        auth_method,
        ..Default::default()
    }))?;
    wifi.start()?;

    for attempt in 1..=config.attempt_budget {
        match wifi.connect() {
            Ok(()) => {
                wifi.wait_netif_up()?;
                let ip = wifi.wifi().sta_netif().get_ip_info()?;
                info!("WiFi: connected to '{}' as {} (attempt {})", creds.ssid, ip.ip, attempt);
                return Ok(true);
            }
            Err(e) => {
                warn!("WiFi: attempt {}/{} failed: {}", attempt, config.attempt_budget, e);
                std::thread::sleep(std::time::Duration::from_millis(u64::from(
                    config.attempt_delay_ms,
                )));
            }
        }
    }
    warn!("WiFi: giving up on '{}'", creds.ssid);
    Ok(false)
}

/// Raise the open setup access point named in `config`.
pub fn start_setup_ap(wifi: &mut Wifi, config: &NetworkConfig) -> Result<(), EspError> {
    if wifi.is_started()? {
        wifi.stop()?;
    }
    wifi.set_configuration(&Configuration::AccessPoint(AccessPointConfiguration {
        ssid: config.setup_ssid.clone(),
        auth_method: AuthMethod::None,
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.wait_netif_up()?;
    let ip = wifi.wifi().ap_netif().get_ip_info()?;
    info!(
        "WiFi: setup AP '{}' up at {}; send 'set_wifi <ssid> [password]' on port {}",
        config.setup_ssid, ip.ip, config.dashboard_port
    );
    Ok(())
}
