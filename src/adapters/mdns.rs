//! mDNS advertisement of the dashboard.
//!
//! Publishes `<hostname>.local` and a `_ws._tcp` service on the dashboard
//! port with TXT records for firmware version and board tag.  Uses the IDF
//! mDNS component on the device and is a log-only no-op on the host.
//!
//! Start after the station has an IP; stop before the network goes down.

use log::info;

pub const DEFAULT_HOSTNAME: &str = "sensything";
const SERVICE_TYPE: &str = "_ws";

pub struct MdnsAdvertiser {
    hostname: heapless::String<24>,
    board: &'static str,
    port: u16,
    active: bool,
}

impl MdnsAdvertiser {
    pub fn new(hostname: &str, board: &'static str, port: u16) -> Self {
        let mut name = heapless::String::new();
        for c in hostname.chars() {
            if name.push(c).is_err() {
                break;
            }
        }
        Self {
            hostname: name,
            board,
            port,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.platform_start();
        self.active = true;
        info!(
            "mDNS: ws://{}.local:{}/ ({}.{}, board={})",
            self.hostname, self.port, SERVICE_TYPE, "_tcp", self.board
        );
    }

    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.platform_stop();
        self.active = false;
        info!("mDNS: stopped");
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&self) {
        use esp_idf_svc::sys::*;

        let mut host_buf = [0u8; 32];
        let hb = self.hostname.as_bytes();
        let hl = hb.len().min(31);
        host_buf[..hl].copy_from_slice(&hb[..hl]);

        let mut board_buf = [0u8; 16];
        let bb = self.board.as_bytes();
        let bl = bb.len().min(15);
        board_buf[..bl].copy_from_slice(&bb[..bl]);

        let svc_type = b"_ws\0";
        let svc_proto = b"_tcp\0";
        let ver = concat!(env!("CARGO_PKG_VERSION"), "\0");
        unsafe {
            let ret = mdns_init();
            if ret != ESP_OK {
                log::error!("mDNS: mdns_init failed ({})", ret);
                return;
            }
            mdns_hostname_set(host_buf.as_ptr() as *const _);
            mdns_instance_name_set(b"Sensything\0".as_ptr() as *const _);
            mdns_service_add(
                b"Sensything Dashboard\0".as_ptr() as *const _,
                svc_type.as_ptr() as *const _,
                svc_proto.as_ptr() as *const _,
                self.port,
                core::ptr::null_mut(),
                0,
            );
            mdns_service_txt_item_set(
                svc_type.as_ptr() as *const _,
                svc_proto.as_ptr() as *const _,
                b"version\0".as_ptr() as *const _,
                ver.as_ptr() as *const _,
            );
            mdns_service_txt_item_set(
                svc_type.as_ptr() as *const _,
                svc_proto.as_ptr() as *const _,
                b"board\0".as_ptr() as *const _,
                board_buf.as_ptr() as *const _,
            );
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&self) {
        info!("mDNS(sim): registered {}.local v={}", self.hostname, env!("CARGO_PKG_VERSION"));
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&self) {
        unsafe {
            esp_idf_svc::sys::mdns_free();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&self) {
        info!("mDNS(sim): unregistered");
    }
}

impl Drop for MdnsAdvertiser {
    fn drop(&mut self) {
        self.stop();
    }
}
