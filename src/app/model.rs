//! Domain model: board layouts, measurement records, sink identities and
//! loop state.
//!
//! ```text
//!   SensorDriver ──read()──▶ MeasurementRecord ──▶ SinkRegistry ──▶ sinks
//!        │                                              ▲
//!        └──layout()──▶ BoardLayout (immutable) ────────┘
//! ```
//!
//! A [`BoardLayout`] is fixed at construction; every sink formats records
//! against it.  A [`MeasurementRecord`] is a plain `Copy` value so one
//! sink can never alter what the next one sees.

use heapless::{String, Vec};

use crate::error::LayoutError;

/// Channel capacity of a single record.
pub const MAX_CHANNELS: usize = 4;
/// Board-specific metadata bytes carried by a record.
pub const MAX_METADATA: usize = 8;
pub const MAX_LABEL_LEN: usize = 32;
pub const MAX_UNIT_LEN: usize = 16;
pub const MAX_NAME_LEN: usize = 32;

/// Bit assignments of [`MeasurementRecord::status`].
pub mod status {
    pub const CH0_FAIL: u8 = 0x01;
    pub const CH1_FAIL: u8 = 0x02;
    pub const CH2_FAIL: u8 = 0x04;
    pub const CH3_FAIL: u8 = 0x08;
    /// Union of the per-channel failure bits.
    pub const CHANNEL_FAIL_MASK: u8 = 0x0F;
    pub const CAPDAC_ADJUSTING: u8 = 0x10;
    pub const BUFFER_OVERFLOW: u8 = 0x20;
    pub const NO_SIGNAL: u8 = 0x40;
    pub const INVALID_DATA: u8 = 0x80;

    /// Failure bit for channel `index` (0 for indices past the mask).
    pub const fn channel_fail(index: usize) -> u8 {
        if index < 4 { 1 << index } else { 0 }
    }
}

// ───────────────────────────────────────────────────────────────
// Board identity and layout
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardId {
    Unknown,
    Capacitance,
    PulseOx,
    Custom,
}

impl BoardId {
    /// Numeric board code as reported by the status command.
    pub const fn code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Capacitance => 1,
            Self::PulseOx => 2,
            Self::Custom => 99,
        }
    }

    /// Short tag used by the dashboard init message and broker payloads.
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Capacitance => "CAP",
            Self::PulseOx => "OX",
            Self::Custom => "CUSTOM",
        }
    }
}

/// Static description of one sensor channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescriptor {
    pub label: String<MAX_LABEL_LEN>,
    pub unit: String<MAX_UNIT_LEN>,
    pub min: f32,
    pub max: f32,
    pub active: bool,
}

impl ChannelDescriptor {
    pub fn new(label: &str, unit: &str, min: f32, max: f32) -> Result<Self, LayoutError> {
        let mut l = String::new();
        l.push_str(label).map_err(|()| LayoutError::TextTooLong)?;
        let mut u = String::new();
        u.push_str(unit).map_err(|()| LayoutError::TextTooLong)?;
        Ok(Self {
            label: l,
            unit: u,
            min,
            max,
            active: true,
        })
    }
}

/// Bus pin assignment of a board.  `None` means the bus is unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusPins {
    pub i2c_sda: Option<u8>,
    pub i2c_scl: Option<u8>,
    pub spi_cs: Option<u8>,
    pub spi_mosi: Option<u8>,
    pub spi_miso: Option<u8>,
    pub spi_sck: Option<u8>,
}

/// Immutable description of a board's channels, buses and sampling bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardLayout {
    board: BoardId,
    board_name: String<MAX_NAME_LEN>,
    sensor_name: String<MAX_NAME_LEN>,
    channels: Vec<ChannelDescriptor, MAX_CHANNELS>,
    pins: BusPins,
    min_interval_ms: u32,
    max_interval_ms: u32,
}

impl BoardLayout {
    pub fn builder(board: BoardId, board_name: &str, sensor_name: &str) -> BoardLayoutBuilder {
        BoardLayoutBuilder {
            board,
            board_name: board_name.to_owned(),
            sensor_name: sensor_name.to_owned(),
            channels: std::vec::Vec::new(),
            pins: BusPins::default(),
            min_interval_ms: 1,
            max_interval_ms: 10_000,
        }
    }

    pub fn board(&self) -> BoardId {
        self.board
    }

    pub fn board_name(&self) -> &str {
        &self.board_name
    }

    pub fn sensor_name(&self) -> &str {
        &self.sensor_name
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self) -> &[ChannelDescriptor] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelDescriptor> {
        self.channels.get(index)
    }

    pub fn pins(&self) -> BusPins {
        self.pins
    }

    pub fn min_interval_ms(&self) -> u32 {
        self.min_interval_ms
    }

    pub fn max_interval_ms(&self) -> u32 {
        self.max_interval_ms
    }

    /// Value of channel `index` if it is declared active, present in the
    /// record and not flagged as failed.  Every sink formats through this
    /// so a failed channel can never leak its raw value.
    pub fn reading(&self, record: &MeasurementRecord, index: usize) -> Option<f32> {
        match self.channels.get(index) {
            Some(desc) if desc.active => record.channel(index),
            _ => None,
        }
    }
}

pub struct BoardLayoutBuilder {
    board: BoardId,
    board_name: std::string::String,
    sensor_name: std::string::String,
    channels: std::vec::Vec<ChannelDescriptor>,
    pins: BusPins,
    min_interval_ms: u32,
    max_interval_ms: u32,
}

impl BoardLayoutBuilder {
    #[must_use]
    pub fn channel(mut self, descriptor: ChannelDescriptor) -> Self {
        self.channels.push(descriptor);
        self
    }

    #[must_use]
    pub fn pins(mut self, pins: BusPins) -> Self {
        self.pins = pins;
        self
    }

    #[must_use]
    pub fn interval_range(mut self, min_ms: u32, max_ms: u32) -> Self {
        self.min_interval_ms = min_ms;
        self.max_interval_ms = max_ms;
        self
    }

    pub fn build(self) -> Result<BoardLayout, LayoutError> {
        if self.channels.is_empty() {
            return Err(LayoutError::NoChannels);
        }
        if self.channels.len() > MAX_CHANNELS {
            return Err(LayoutError::TooManyChannels {
                requested: self.channels.len(),
                capacity: MAX_CHANNELS,
            });
        }
        if self.min_interval_ms == 0 || self.min_interval_ms > self.max_interval_ms {
            return Err(LayoutError::InvalidIntervalRange {
                min: self.min_interval_ms,
                max: self.max_interval_ms,
            });
        }

        let mut board_name = String::new();
        board_name
            .push_str(&self.board_name)
            .map_err(|()| LayoutError::TextTooLong)?;
        let mut sensor_name = String::new();
        sensor_name
            .push_str(&self.sensor_name)
            .map_err(|()| LayoutError::TextTooLong)?;

        let mut channels = Vec::new();
        for desc in self.channels {
            // Capacity checked above.
            let _ = channels.push(desc);
        }

        Ok(BoardLayout {
            board: self.board,
            board_name,
            sensor_name,
            channels,
            pins: self.pins,
            min_interval_ms: self.min_interval_ms,
            max_interval_ms: self.max_interval_ms,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Measurement record
// ───────────────────────────────────────────────────────────────

/// One sampling instant.  Created by the sensor driver, stamped with a
/// sequence number by the loop, then read (never written) by every sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementRecord {
    /// Milliseconds since boot at acquisition.
    pub timestamp_ms: u32,
    channels: [f32; MAX_CHANNELS],
    /// Board-specific bytes (CAPDAC codes, SpO2/HR summaries).
    pub metadata: [u8; MAX_METADATA],
    /// Per-boot measurement counter assigned after a successful read.
    pub sequence: u32,
    channel_count: u8,
    /// See [`status`].
    pub status: u8,
}

impl MeasurementRecord {
    pub fn new(timestamp_ms: u32, channel_count: usize) -> Result<Self, LayoutError> {
        if channel_count > MAX_CHANNELS {
            return Err(LayoutError::TooManyChannels {
                requested: channel_count,
                capacity: MAX_CHANNELS,
            });
        }
        Ok(Self {
            timestamp_ms,
            channels: [0.0; MAX_CHANNELS],
            metadata: [0; MAX_METADATA],
            sequence: 0,
            channel_count: channel_count as u8,
            status: 0,
        })
    }

    /// Record shaped for `layout`.
    pub fn for_layout(timestamp_ms: u32, layout: &BoardLayout) -> Self {
        Self {
            timestamp_ms,
            channels: [0.0; MAX_CHANNELS],
            metadata: [0; MAX_METADATA],
            sequence: 0,
            channel_count: layout.channel_count() as u8,
            status: 0,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count as usize
    }

    /// Store a value; indices past `channel_count` are ignored.
    pub fn set_channel(&mut self, index: usize, value: f32) {
        if index < self.channel_count() {
            self.channels[index] = value;
        }
    }

    /// Flag channel `index` as failed and zero its slot.
    pub fn mark_failed(&mut self, index: usize) {
        if index < self.channel_count() {
            self.channels[index] = 0.0;
            self.status |= status::channel_fail(index);
        }
    }

    pub fn channel_failed(&self, index: usize) -> bool {
        self.status & status::channel_fail(index) != 0
    }

    /// Validity-aware accessor: `None` for failed or absent channels.
    pub fn channel(&self, index: usize) -> Option<f32> {
        if index >= self.channel_count() || self.channel_failed(index) {
            None
        } else {
            Some(self.channels[index])
        }
    }

    /// Raw stored values, including failed slots.
    pub fn raw_channels(&self) -> &[f32] {
        &self.channels[..self.channel_count()]
    }
}

// ───────────────────────────────────────────────────────────────
// Sinks
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Console,
    ShortRangeRadio,
    NetworkDashboard,
    FileLog,
    MessageBroker,
}

impl SinkKind {
    pub const COUNT: usize = 5;

    /// Fan-out order.
    pub const ALL: [SinkKind; Self::COUNT] = [
        Self::Console,
        Self::ShortRangeRadio,
        Self::NetworkDashboard,
        Self::FileLog,
        Self::MessageBroker,
    ];

    pub const fn index(self) -> usize {
        match self {
            Self::Console => 0,
            Self::ShortRangeRadio => 1,
            Self::NetworkDashboard => 2,
            Self::FileLog => 3,
            Self::MessageBroker => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Console => "Console",
            Self::ShortRangeRadio => "Radio",
            Self::NetworkDashboard => "Dashboard",
            Self::FileLog => "FileLog",
            Self::MessageBroker => "Broker",
        }
    }
}

/// Current or last artifact of a file sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInfo {
    /// Name of the open artifact, if one is open.
    pub current: Option<String<MAX_NAME_LEN>>,
    /// Artifacts opened since boot.
    pub count: u32,
}

// ───────────────────────────────────────────────────────────────
// Loop state
// ───────────────────────────────────────────────────────────────

/// Mutable scheduler-loop state.  Owned by the platform, touched only from
/// the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemState {
    pub last_sample_ms: u32,
    pub last_status_ms: u32,
    pub active: bool,
    pub measurement_count: u32,
}
