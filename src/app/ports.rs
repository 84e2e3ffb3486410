//! Port traits: the hexagonal boundary between the acquisition core and
//! the outside world.
//!
//! ```text
//!   SensorDriver ──▶ Platform (core) ──▶ SinkRegistry ──▶ SinkAdapter × 5
//!                        ▲
//!                 CommandInbox ◀── console / dashboard listeners
//! ```
//!
//! The platform holds the driver and each sink as trait objects, so the
//! core never names a concrete board or transport.  Transport-specific
//! ports (notify, broadcast, artifact store, broker client) live beside
//! the sink adapters that consume them.

use crate::app::inbox::CommandInbox;
use crate::app::model::{ArtifactInfo, BoardLayout, MeasurementRecord, SinkKind};
use crate::error::{DeliveryError, HardwareError, IoError, ReadError, StorageError};

// ───────────────────────────────────────────────────────────────
// Sensor port
// ───────────────────────────────────────────────────────────────

/// A sensor board.  The layout is fixed at construction.
pub trait SensorDriver {
    fn layout(&self) -> &BoardLayout;

    /// Probe and configure the front-end.  A failure here is fatal for
    /// sampling but not for the rest of the platform.
    fn init(&mut self) -> Result<(), HardwareError>;

    /// Acquire one record.  Individual channel failures are reported via
    /// status bits; `Err` means the whole cycle produced nothing.
    fn read(&mut self, now_ms: u32) -> Result<MeasurementRecord, ReadError>;
}

// ───────────────────────────────────────────────────────────────
// Sink port
// ───────────────────────────────────────────────────────────────

/// An output channel fed by the fan-out.
///
/// `deliver` must return within a small bounded time; anything slow
/// (reconnects, accepting listeners) belongs in `pump`.
pub trait SinkAdapter {
    fn kind(&self) -> SinkKind;

    fn deliver(
        &mut self,
        record: &MeasurementRecord,
        layout: &BoardLayout,
    ) -> Result<(), DeliveryError>;

    /// Whether the underlying transport or medium is currently usable.
    fn is_live(&self) -> bool;

    /// Background I/O: accept listeners, retry connections, forward
    /// inbound command text.
    fn pump(&mut self, _now_ms: u32, _inbox: &CommandInbox) {}

    /// Push any buffered output to the medium.
    fn flush(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    /// Close the current artifact; the next delivery opens a fresh one.
    fn rotate(&mut self) -> Result<(), IoError> {
        Err(IoError::Unsupported)
    }

    fn artifact(&self) -> Option<ArtifactInfo> {
        None
    }

    /// Erase persisted network credentials.
    fn forget_credentials(&mut self) -> Result<(), StorageError> {
        Err(StorageError::Unsupported)
    }

    /// Persist network credentials for the next bring-up.
    fn store_credentials(&mut self, _ssid: &str, _password: &str) -> Result<(), StorageError> {
        Err(StorageError::Unsupported)
    }
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain → NVS/flash)
// ───────────────────────────────────────────────────────────────

/// Generic key-value storage for persistent data.
pub trait StoragePort {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Reply port
// ───────────────────────────────────────────────────────────────

/// Where command replies and reports go (the console on the device).
pub trait ReplySink {
    fn reply(&mut self, line: &str);
}

impl ReplySink for std::vec::Vec<std::string::String> {
    fn reply(&mut self, line: &str) {
        self.push(line.to_owned());
    }
}

/// Reply sink that forwards lines to the log.
pub struct LogReplies;

impl ReplySink for LogReplies {
    fn reply(&mut self, line: &str) {
        log::info!("{line}");
    }
}
