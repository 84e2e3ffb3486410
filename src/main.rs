//! Sensything Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  ConsoleSink   RadioSink      DashboardSink   FileLogSink      │
//! │  (stdout)      (BLE notify)   (WebSocket)     (SD card)        │
//! │  BrokerSink    NvsAdapter     MonotonicClock                   │
//! │  (MQTT)        (config+creds) (esp_timer)                      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Platform (pure logic)                     │    │
//! │  │  Scheduler · SinkRegistry · CommandInterpreter         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  CapacitanceBoard<Fdc1004<I2cDriver, Delay>>                   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;
use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::fs::fatfs::Fatfs;
use esp_idf_svc::hal::delay::{Delay, FreeRtos};
use esp_idf_svc::hal::gpio::AnyIOPin;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::hal::sd::mmc::{SdMmcHostConfiguration, SdMmcHostDriver};
use esp_idf_svc::hal::sd::{SdCardConfiguration, SdCardDriver};
use esp_idf_svc::io::vfs::MountedFatfs;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use sensything::adapters::broker::BrokerSink;
use sensything::adapters::console::ConsoleSink;
use sensything::adapters::credentials::{CredentialStore, NvsCredentialStore};
use sensything::adapters::dashboard::DashboardSink;
use sensything::adapters::esp::{
    BleNotifier, EspBrokerClient, WsDashboard, connect_station, new_driver, start_setup_ap,
};
use sensything::adapters::file_log::{DirectoryStore, FileLogSink};
use sensything::adapters::mdns::{DEFAULT_HOSTNAME, MdnsAdvertiser};
use sensything::adapters::nvs::NvsAdapter;
use sensything::adapters::radio::RadioSink;
use sensything::adapters::time::MonotonicClock;
use sensything::app::inbox::CommandInbox;
use sensything::app::model::SinkKind;
use sensything::app::ports::{ReplySink, SinkAdapter};
use sensything::app::service::Platform;
use sensything::error::SinkInitError;
use sensything::pins;
use sensything::sensors::fdc1004::{Fdc1004, Rate};
use sensything::sensors::CapacitanceBoard;

/// Command replies go to the console, unprefixed.
struct ConsoleReplies;

impl ReplySink for ConsoleReplies {
    fn reply(&mut self, line: &str) {
        println!("{line}");
    }
}

fn spawn_console_reader(inbox: Arc<CommandInbox>) -> Result<()> {
    std::thread::Builder::new()
        .name("console-rx".into())
        .stack_size(4096)
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { continue };
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(e) = inbox.submit(&line) {
                    warn!("Console: command dropped: {}", e);
                }
            }
        })?;
    Ok(())
}

fn report(kind: SinkKind, result: Result<(), SinkInitError>) {
    match result {
        Ok(()) => info!("{} sink ready", kind.name()),
        Err(e) => warn!("{}", e),
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Sensything v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let nvs = NvsAdapter::new()?;
    let config = nvs.load_config();
    let clock = MonotonicClock::new();

    // ── 3. Sensor board ───────────────────────────────────────
    info!(
        "I2C: SDA={} SCL={} @ {} Hz",
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO,
        pins::I2C_FREQ_HZ
    );
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &I2cConfig::new().baudrate(pins::I2C_FREQ_HZ.Hz()),
    )?;
    let board = CapacitanceBoard::new(Fdc1004::new(i2c, Delay::new_default(), Rate::Hz100))?;
    let mut platform = Platform::new(Box::new(board), &config);

    if let Err(e) = platform.init_sensor() {
        // Sensor bring-up failure is fatal for this build.
        error!("Sensor init failed: {} - halting", e);
        loop {
            FreeRtos::delay_ms(1000);
        }
    }

    // ── 4. Sinks ──────────────────────────────────────────────
    report(
        SinkKind::Console,
        platform.init_sink(SinkKind::Console, |_| {
            Ok(Box::new(ConsoleSink::new(std::io::stdout())) as Box<dyn SinkAdapter>)
        }),
    );

    let sd_driver = SdMmcHostDriver::new_1bit(
        peripherals.sdmmc1,
        peripherals.pins.gpio41,
        peripherals.pins.gpio38,
        peripherals.pins.gpio39,
        None::<AnyIOPin>,
        None::<AnyIOPin>,
        &SdMmcHostConfiguration::new(),
    )
    .and_then(|host| SdCardDriver::new_mmc(host, &SdCardConfiguration::new()));
    let _sd_mount = match sd_driver
        .and_then(|card| Fatfs::new_sdcard(0, card))
        .and_then(|fs| MountedFatfs::mount(fs, config.file_log.mount_point.as_str(), 4))
    {
        Ok(mount) => Some(mount),
        Err(e) => {
            warn!("SD card not mounted: {}", e);
            None
        }
    };
    let file_cfg = config.file_log.clone();
    report(
        SinkKind::FileLog,
        platform.init_sink(SinkKind::FileLog, |_| {
            let store = DirectoryStore::new(file_cfg.mount_point.as_str());
            Ok(Box::new(FileLogSink::open(store, &file_cfg)?) as Box<dyn SinkAdapter>)
        }),
    );

    let radio_name = format!("{}{}", config.radio.name_prefix, platform.layout().board().short_name());
    report(
        SinkKind::ShortRangeRadio,
        platform.init_sink(SinkKind::ShortRangeRadio, |_| {
            let ble = BleNotifier::start(&radio_name)
                .map_err(|_| SinkInitError::new(SinkKind::ShortRangeRadio, "BLE stack failed"))?;
            Ok(Box::new(RadioSink::new(ble)) as Box<dyn SinkAdapter>)
        }),
    );

    // ── 5. Network ────────────────────────────────────────────
    let credentials = NvsCredentialStore::new(NvsAdapter::new()?);
    let mut wifi = new_driver(peripherals.modem, sysloop, Some(nvs_partition))?;
    let online = match credentials.load() {
        Ok(creds) => connect_station(&mut wifi, &creds, &config.network)?,
        Err(e) => {
            warn!("No network credentials ({})", e);
            false
        }
    };
    if !online {
        start_setup_ap(&mut wifi, &config.network)?;
    }

    let mut mdns = MdnsAdvertiser::new(
        DEFAULT_HOSTNAME,
        platform.layout().board().short_name(),
        config.network.dashboard_port,
    );
    mdns.start();

    let port = config.network.dashboard_port;
    report(
        SinkKind::NetworkDashboard,
        platform.init_sink(SinkKind::NetworkDashboard, |layout| {
            let ws = WsDashboard::start(port).map_err(|_| {
                SinkInitError::new(SinkKind::NetworkDashboard, "WebSocket server failed")
            })?;
            let sink = DashboardSink::new(ws, credentials, layout).map_err(|_| {
                SinkInitError::new(SinkKind::NetworkDashboard, "init message encoding failed")
            })?;
            Ok(Box::new(sink) as Box<dyn SinkAdapter>)
        }),
    );

    if online {
        let broker_cfg = config.broker.clone();
        report(
            SinkKind::MessageBroker,
            platform.init_sink(SinkKind::MessageBroker, |_| {
                let client = EspBrokerClient::new(&broker_cfg);
                Ok(Box::new(BrokerSink::new(client, &broker_cfg)?) as Box<dyn SinkAdapter>)
            }),
        );
    } else {
        warn!("Broker sink disabled until the device joins a network");
    }

    // ── 6. Commands ───────────────────────────────────────────
    spawn_console_reader(platform.inbox())?;

    let mut replies = ConsoleReplies;
    platform.handle_line("start_all", clock.now_ms(), &mut replies);
    info!("Type 'help' for available commands");

    // ── 7. Run loop ───────────────────────────────────────────
    let _keep = (wifi, mdns);
    loop {
        platform.poll(clock.now_ms(), &mut replies);
        FreeRtos::delay_ms(1);
    }
}
