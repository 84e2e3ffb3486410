//! ESP-IDF backends for the transport ports.

pub mod ble;
pub mod mqtt;
pub mod wifi;
pub mod ws;

pub use ble::BleNotifier;
pub use mqtt::EspBrokerClient;
pub use wifi::{connect_station, new_driver, start_setup_ap};
pub use ws::WsDashboard;
