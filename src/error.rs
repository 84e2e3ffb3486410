//! Typed error values for the Sensything firmware.
//!
//! Every fallible core operation returns one of these enums.  All of them
//! are `Copy` (or carry only `Copy`/fixed-capacity data) so they can travel
//! through the scheduler loop and the command interpreter without
//! allocation.  `anyhow` is reserved for the binary's bring-up path.

use core::fmt;

use crate::app::model::SinkKind;

// ---------------------------------------------------------------------------
// Sensor driver errors
// ---------------------------------------------------------------------------

/// Sensor front-end bring-up failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    /// A bus transaction (I2C/SPI) returned an error.
    Bus,
    /// The device did not answer at its address.
    DeviceNotFound,
    /// The device answered with an unexpected identity register.
    IdentityMismatch { expected: u16, found: u16 },
    /// A conversion did not complete in the allotted time.
    Timeout,
    /// The front-end has no such input.
    InvalidChannel(u8),
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "bus transaction failed"),
            Self::DeviceNotFound => write!(f, "device not found"),
            Self::IdentityMismatch { expected, found } => {
                write!(f, "identity mismatch (expected 0x{expected:04X}, found 0x{found:04X})")
            }
            Self::Timeout => write!(f, "conversion timeout"),
            Self::InvalidChannel(ch) => write!(f, "no input {ch}"),
        }
    }
}

/// A whole acquisition cycle could not produce a record.
///
/// Per-channel failures are not errors: they are reported through the
/// record's status bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// `read` was called before a successful `init`.
    NotInitialized,
    /// The front-end reported a bus fault for the whole cycle.
    Hardware(HardwareError),
    /// No new sample was ready.
    NoData,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "sensor not initialized"),
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::NoData => write!(f, "no sample ready"),
        }
    }
}

impl From<HardwareError> for ReadError {
    fn from(e: HardwareError) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Board layout errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    /// A board must expose at least one channel.
    NoChannels,
    /// More channels than a record can carry.
    TooManyChannels { requested: usize, capacity: usize },
    /// A label or unit does not fit its fixed-capacity buffer.
    TextTooLong,
    /// `min_interval_ms` is zero or above `max_interval_ms`.
    InvalidIntervalRange { min: u32, max: u32 },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChannels => write!(f, "layout declares no channels"),
            Self::TooManyChannels { requested, capacity } => {
                write!(f, "{requested} channels exceed capacity {capacity}")
            }
            Self::TextTooLong => write!(f, "label or unit too long"),
            Self::InvalidIntervalRange { min, max } => {
                write!(f, "invalid interval range {min}..={max} ms")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler errors
// ---------------------------------------------------------------------------

/// Requested sampling interval lies outside the board's declared bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange {
    pub requested: u32,
    pub min: u32,
    pub max: u32,
}

impl fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "interval {} ms out of range ({}-{} ms)",
            self.requested, self.min, self.max
        )
    }
}

// ---------------------------------------------------------------------------
// Sink errors
// ---------------------------------------------------------------------------

/// A sink could not be brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkInitError {
    pub kind: SinkKind,
    pub reason: &'static str,
}

impl SinkInitError {
    pub const fn new(kind: SinkKind, reason: &'static str) -> Self {
        Self { kind, reason }
    }
}

impl fmt::Display for SinkInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} init failed: {}", self.kind.name(), self.reason)
    }
}

/// Operation addressed a sink that was never initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotInitialized(pub SinkKind);

impl fmt::Display for NotInitialized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} not initialized", self.0.name())
    }
}

/// File/storage level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// The storage medium is absent or unmounted.
    NotMounted,
    OpenFailed,
    WriteFailed,
    /// The sink has no such primitive.
    Unsupported,
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotMounted => write!(f, "storage not mounted"),
            Self::OpenFailed => write!(f, "open failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::Unsupported => write!(f, "operation not supported"),
        }
    }
}

/// Transport-level failure inside a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    NotConnected,
    SendFailed,
    /// The payload could not be encoded.
    Encode,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::SendFailed => write!(f, "send failed"),
            Self::Encode => write!(f, "encode failed"),
        }
    }
}

/// A single delivery to a single sink failed.  Never propagated past the
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    Io(IoError),
    Transport(TransportError),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
        }
    }
}

impl From<IoError> for DeliveryError {
    fn from(e: IoError) -> Self {
        Self::Io(e)
    }
}

impl From<TransportError> for DeliveryError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

/// Non-volatile storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    Full,
    IoError,
    /// Stored bytes could not be decoded.
    Corrupted,
    /// The value is not storable (empty, too long or not printable).
    InvalidValue,
    /// The sink has no credential storage.
    Unsupported,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "storage I/O error"),
            Self::Corrupted => write!(f, "stored data corrupted"),
            Self::InvalidValue => write!(f, "value rejected"),
            Self::Unsupported => write!(f, "no credential storage"),
        }
    }
}

/// Failure of an on-demand sink primitive (rotate, forget credentials).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOpError {
    NotInitialized(SinkKind),
    Io(IoError),
    Storage(StorageError),
}

impl fmt::Display for SinkOpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized(kind) => write!(f, "{} not initialized", kind.name()),
            Self::Io(e) => write!(f, "{e}"),
            Self::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl From<NotInitialized> for SinkOpError {
    fn from(e: NotInitialized) -> Self {
        Self::NotInitialized(e.0)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

/// Longest verb echoed back in an "unknown command" reply.
pub const MAX_ECHO_LEN: usize = 32;

/// A command line was rejected.  The interpreter turns every variant into a
/// human-readable reply; none of them alter system state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Unknown(heapless::String<MAX_ECHO_LEN>),
    /// Wrong argument count for the verb.
    Usage(&'static str),
    InvalidArgument(heapless::String<MAX_ECHO_LEN>),
    OutOfRange(OutOfRange),
    /// The addressed sink is initialized but not enabled.
    SinkDisabled(SinkKind),
    Sink(SinkOpError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(verb) => write!(f, "Unknown command: {verb}"),
            Self::Usage(usage) => write!(f, "Usage: {usage}"),
            Self::InvalidArgument(arg) => write!(f, "Invalid argument: {arg}"),
            Self::OutOfRange(e) => write!(f, "Error: {e}"),
            Self::SinkDisabled(kind) => write!(f, "Error: {} is not enabled", kind.name()),
            Self::Sink(e) => write!(f, "Error: {e}"),
        }
    }
}

impl From<OutOfRange> for CommandError {
    fn from(e: OutOfRange) -> Self {
        Self::OutOfRange(e)
    }
}

impl From<SinkOpError> for CommandError {
    fn from(e: SinkOpError) -> Self {
        Self::Sink(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ValidationFailed(&'static str),
    /// Stored blob could not be decoded.
    Corrupted,
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "config invalid: {msg}"),
            Self::Corrupted => write!(f, "stored config corrupted"),
            Self::IoError => write!(f, "config storage I/O error"),
        }
    }
}

impl core::error::Error for HardwareError {}
impl core::error::Error for ReadError {}
impl core::error::Error for LayoutError {}
impl core::error::Error for OutOfRange {}
impl core::error::Error for SinkInitError {}
impl core::error::Error for NotInitialized {}
impl core::error::Error for IoError {}
impl core::error::Error for TransportError {}
impl core::error::Error for DeliveryError {}
impl core::error::Error for StorageError {}
impl core::error::Error for SinkOpError {}
impl core::error::Error for CommandError {}
impl core::error::Error for ConfigError {}

/// Copy `text` into a fixed-capacity echo buffer, truncating on a char
/// boundary.
pub(crate) fn echo(text: &str) -> heapless::String<MAX_ECHO_LEN> {
    let mut out = heapless::String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
