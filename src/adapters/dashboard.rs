//! Network dashboard sink: JSON frames broadcast to every connected
//! listener of a WebSocket-style transport.
//!
//! ```text
//!   listener connects ──▶ {"type":"init","board":"CAP",...}   (to that listener)
//!   each record       ──▶ {"ts":..,"cnt":..,"ch":[..],"flags":..} (to all)
//!   listener text     ──▶ CommandInbox
//! ```
//!
//! A failed channel serializes as `null`.  Values are rounded to four
//! decimals before serialization.

use log::{info, warn};
use serde::Serialize;

use crate::app::inbox::{CommandInbox, CommandLine};
use crate::app::model::{BoardId, BoardLayout, MAX_CHANNELS, MeasurementRecord, SinkKind};
use crate::app::ports::SinkAdapter;
use crate::error::{DeliveryError, StorageError, TransportError};

use super::credentials::{CredentialStore, NetworkCredentials};

/// Transport session handle (the HTTP server's socket descriptor on the device).
pub type ListenerId = i32;

/// Bound on transport events handled per pump.
const MAX_EVENTS_PER_PUMP: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Connected(ListenerId),
    Disconnected(ListenerId),
    /// A text frame, already trimmed to command-line capacity.
    Text(ListenerId, CommandLine),
}

pub trait BroadcastTransport {
    fn listener_count(&self) -> usize;

    /// Next pending connect/disconnect/text event, if any.
    fn poll_event(&mut self) -> Option<ListenerEvent>;

    fn send_to(&mut self, listener: ListenerId, text: &str) -> Result<(), TransportError>;

    fn broadcast(&mut self, text: &str) -> Result<(), TransportError>;
}

#[derive(Serialize)]
struct DataFrame<'a> {
    ts: u32,
    cnt: u32,
    ch: &'a [Option<f32>],
    flags: u8,
}

#[derive(Serialize)]
struct InitFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    board: &'static str,
    #[serde(rename = "boardName")]
    board_name: &'a str,
    channels: usize,
    #[serde(rename = "sampleRates")]
    sample_rates: &'static [u32],
    #[serde(rename = "sampleInterval")]
    sample_interval: u32,
}

/// Interval presets (ms) offered by the dashboard for each board.
pub fn sample_rates(board: BoardId) -> &'static [u32] {
    match board {
        BoardId::Capacitance => &[50, 100, 200, 500],
        BoardId::PulseOx => &[8, 10, 12, 16, 20],
        BoardId::Unknown | BoardId::Custom => &[100],
    }
}

fn round4(v: f32) -> f32 {
    (v * 10_000.0).round() / 10_000.0
}

pub fn format_frame(record: &MeasurementRecord, layout: &BoardLayout) -> Result<String, TransportError> {
    let n = layout.channel_count().min(MAX_CHANNELS);
    let mut ch = [None; MAX_CHANNELS];
    for (i, slot) in ch.iter_mut().enumerate().take(n) {
        *slot = layout.reading(record, i).map(round4);
    }
    serde_json::to_string(&DataFrame {
        ts: record.timestamp_ms,
        cnt: record.sequence,
        ch: &ch[..n],
        flags: record.status,
    })
    .map_err(|_| TransportError::Encode)
}

pub fn format_init(layout: &BoardLayout) -> Result<String, TransportError> {
    serde_json::to_string(&InitFrame {
        kind: "init",
        board: layout.board().short_name(),
        board_name: layout.board_name(),
        channels: layout.channel_count(),
        sample_rates: sample_rates(layout.board()),
        sample_interval: layout.min_interval_ms(),
    })
    .map_err(|_| TransportError::Encode)
}

pub struct DashboardSink<T: BroadcastTransport, C: CredentialStore> {
    transport: T,
    credentials: C,
    init_message: String,
}

impl<T: BroadcastTransport, C: CredentialStore> DashboardSink<T, C> {
    pub fn new(transport: T, credentials: C, layout: &BoardLayout) -> Result<Self, TransportError> {
        Ok(Self {
            transport,
            credentials,
            init_message: format_init(layout)?,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: BroadcastTransport, C: CredentialStore> SinkAdapter for DashboardSink<T, C> {
    fn kind(&self) -> SinkKind {
        SinkKind::NetworkDashboard
    }

    fn deliver(
        &mut self,
        record: &MeasurementRecord,
        layout: &BoardLayout,
    ) -> Result<(), DeliveryError> {
        if self.transport.listener_count() == 0 {
            return Ok(());
        }
        let frame = format_frame(record, layout)?;
        self.transport.broadcast(&frame)?;
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.transport.listener_count() > 0
    }

    fn pump(&mut self, _now_ms: u32, inbox: &CommandInbox) {
        for _ in 0..MAX_EVENTS_PER_PUMP {
            let Some(event) = self.transport.poll_event() else {
                break;
            };
            match event {
                ListenerEvent::Connected(id) => {
                    info!("Dashboard: listener #{} connected", id);
                    if let Err(e) = self.transport.send_to(id, &self.init_message) {
                        warn!("Dashboard: init to #{} failed: {}", id, e);
                    }
                }
                ListenerEvent::Disconnected(id) => {
                    info!("Dashboard: listener #{} disconnected", id);
                }
                ListenerEvent::Text(id, line) => {
                    // Only the verb: set_wifi lines carry a password.
                    let verb = line.split_whitespace().next().unwrap_or("");
                    info!("Dashboard: command from #{}: {}", id, verb);
                    if let Err(e) = inbox.submit(&line) {
                        warn!("Dashboard: command dropped: {}", e);
                    }
                }
            }
        }
    }

    fn forget_credentials(&mut self) -> Result<(), StorageError> {
        self.credentials.clear()
    }

    fn store_credentials(&mut self, ssid: &str, password: &str) -> Result<(), StorageError> {
        let creds = NetworkCredentials::new(ssid, password).ok_or(StorageError::InvalidValue)?;
        self.credentials.save(&creds)?;
        info!("Dashboard: credentials stored for '{}'", creds.ssid);
        Ok(())
    }
}
