//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements               | Connects to                  |
//! |---------------|--------------------------|------------------------------|
//! | `console`     | SinkAdapter              | USB-CDC / UART byte stream   |
//! | `radio`       | SinkAdapter              | `NotifyTransport` (BLE GATT) |
//! | `dashboard`   | SinkAdapter              | `BroadcastTransport` (WS)    |
//! | `file_log`    | SinkAdapter              | `ArtifactStore` (SD card)    |
//! | `broker`      | SinkAdapter              | `BrokerClient` (MQTT)        |
//! | `nvs`         | StoragePort              | NVS / in-memory store        |
//! | `credentials` | CredentialStore          | `StoragePort`                |
//! | `mdns`        |                          | IDF mDNS responder           |
//! | `time`        |                          | ESP32 system timer           |
//! | `esp`         | transport ports          | Bluedroid, HTTP/WS, MQTT     |

pub mod broker;
pub mod console;
pub mod credentials;
pub mod dashboard;
#[cfg(target_os = "espidf")]
pub mod esp;
pub mod file_log;
pub mod mdns;
pub mod nvs;
pub mod radio;
pub mod time;
pub(super) mod utils;
