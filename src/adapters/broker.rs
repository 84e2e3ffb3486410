//! Message broker sink (MQTT).
//!
//! Topics under `<base>`:
//!
//! | topic              | payload                                    | retain |
//! |--------------------|--------------------------------------------|--------|
//! | `<base>/<label>`   | value with 2 decimals, `NaN` if failed     | config |
//! | `<base>/data`      | consolidated JSON, failed values `null`    | config |
//! | `<base>/timestamp` | uptime seconds                             | config |
//! | `<base>/status`    | `online` / `offline`                       | always |
//!
//! Deliveries while disconnected are silently dropped.  Reconnects happen
//! from `pump` at most once per `reconnect_interval_ms`, optionally also
//! gated on a minimum number of dropped samples.

use core::fmt::Write as _;

use log::{debug, info, warn};
use serde::Serialize;

use crate::app::inbox::CommandInbox;
use crate::app::model::{BoardLayout, MeasurementRecord, SinkKind};
use crate::app::ports::SinkAdapter;
use crate::config::BrokerConfig;
use crate::error::{DeliveryError, SinkInitError, TransportError};
use crate::scheduler::has_elapsed;

use super::utils::push_reading;

pub const STATUS_ONLINE: &str = "online";
pub const STATUS_OFFLINE: &str = "offline";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QoS {
    /// Levels above 2 clamp to `ExactlyOnce`.
    pub const fn from_level(level: u8) -> Self {
        match level {
            0 => Self::AtMostOnce,
            1 => Self::AtLeastOnce,
            _ => Self::ExactlyOnce,
        }
    }
}

/// A publish-only MQTT session.
pub trait BrokerClient {
    fn is_connected(&self) -> bool;

    /// Start (or retry) a session.  `Ok` means the session is up.
    fn connect(&mut self) -> Result<(), TransportError>;

    fn disconnect(&mut self);

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), TransportError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DataMessage<'a> {
    timestamp: u32,
    board_type: &'static str,
    sample_count: u32,
    channels: Vec<ChannelValue<'a>>,
}

#[derive(Serialize)]
struct ChannelValue<'a> {
    name: &'a str,
    value: Option<f32>,
    unit: &'a str,
}

pub fn format_data(record: &MeasurementRecord, layout: &BoardLayout) -> Result<String, TransportError> {
    let channels = layout
        .channels()
        .iter()
        .enumerate()
        .map(|(i, ch)| ChannelValue {
            name: &ch.label,
            value: layout.reading(record, i).map(|v| (v * 100.0).round() / 100.0),
            unit: &ch.unit,
        })
        .collect();
    serde_json::to_string(&DataMessage {
        timestamp: record.timestamp_ms,
        board_type: layout.board().short_name(),
        sample_count: record.sequence,
        channels,
    })
    .map_err(|_| TransportError::Encode)
}

pub struct BrokerSink<C: BrokerClient> {
    client: C,
    config: BrokerConfig,
    qos: QoS,
    announced: bool,
    last_attempt_ms: Option<u32>,
    dropped_since_attempt: u32,
}

impl<C: BrokerClient> BrokerSink<C> {
    /// Fails only when no broker is configured; an unreachable broker is
    /// retried from `pump`.
    pub fn new(client: C, config: &BrokerConfig) -> Result<Self, SinkInitError> {
        if config.host.is_empty() {
            return Err(SinkInitError::new(SinkKind::MessageBroker, "no broker host configured"));
        }
        let mut sink = Self {
            client,
            config: config.clone(),
            qos: QoS::from_level(config.qos),
            announced: false,
            last_attempt_ms: None,
            dropped_since_attempt: 0,
        };
        info!("Broker: connecting to {}:{} as {}", config.host, config.port, config.client_id);
        match sink.client.connect() {
            Ok(()) => sink.announce_online(),
            Err(e) => warn!("Broker: initial connect failed ({}), will retry", e),
        }
        Ok(sink)
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    fn topic(&self, leaf: &str) -> String {
        format!("{}/{}", self.config.base_topic, leaf)
    }

    fn publish(&mut self, leaf: &str, payload: &str, retain: bool) -> Result<(), TransportError> {
        let topic = self.topic(leaf);
        self.client.publish(&topic, payload.as_bytes(), self.qos, retain)
    }

    fn announce_online(&mut self) {
        self.announced = true;
        self.dropped_since_attempt = 0;
        match self.publish("status", STATUS_ONLINE, true) {
            Ok(()) => info!("Broker: connected"),
            Err(e) => warn!("Broker: status publish failed: {}", e),
        }
    }

    fn reconnect_due(&self, now_ms: u32) -> bool {
        let time_ok = self
            .last_attempt_ms
            .is_none_or(|last| has_elapsed(now_ms, last, self.config.reconnect_interval_ms));
        time_ok && self.dropped_since_attempt >= self.config.min_samples_between_attempts
    }

    /// Publish `offline` and end the session.
    pub fn disconnect(&mut self) {
        if self.client.is_connected() {
            if let Err(e) = self.publish("status", STATUS_OFFLINE, true) {
                debug!("Broker: offline publish failed: {}", e);
            }
            self.client.disconnect();
            info!("Broker: disconnected");
        }
        self.announced = false;
    }
}

impl<C: BrokerClient> SinkAdapter for BrokerSink<C> {
    fn kind(&self) -> SinkKind {
        SinkKind::MessageBroker
    }

    fn deliver(
        &mut self,
        record: &MeasurementRecord,
        layout: &BoardLayout,
    ) -> Result<(), DeliveryError> {
        if !self.client.is_connected() {
            self.dropped_since_attempt = self.dropped_since_attempt.saturating_add(1);
            return Ok(());
        }
        let retain = self.config.retain;
        // Every topic is attempted; the first failure is reported.
        let mut first_error = None;

        let mut value = String::new();
        for (i, ch) in layout.channels().iter().enumerate() {
            value.clear();
            push_reading(&mut value, layout.reading(record, i), 2);
            if let Err(e) = self.publish(&ch.label, &value, retain) {
                debug!("Broker: publish {} failed: {}", ch.label, e);
                first_error.get_or_insert(e);
            }
        }

        let data = format_data(record, layout).and_then(|json| self.publish("data", &json, retain));
        if let Err(e) = data {
            debug!("Broker: publish data failed: {}", e);
            first_error.get_or_insert(e);
        }

        value.clear();
        let _ = write!(value, "{}", record.timestamp_ms / 1000);
        if let Err(e) = self.publish("timestamp", &value, retain) {
            debug!("Broker: publish timestamp failed: {}", e);
            first_error.get_or_insert(e);
        }

        first_error.map_or(Ok(()), |e| Err(e.into()))
    }

    fn is_live(&self) -> bool {
        self.client.is_connected()
    }

    fn pump(&mut self, now_ms: u32, _inbox: &CommandInbox) {
        if self.client.is_connected() {
            if !self.announced {
                self.announce_online();
            }
            return;
        }
        if self.announced {
            warn!("Broker: connection lost");
            self.announced = false;
        }
        if !self.reconnect_due(now_ms) {
            return;
        }
        self.last_attempt_ms = Some(now_ms);
        self.dropped_since_attempt = 0;
        match self.client.connect() {
            Ok(()) => self.announce_online(),
            Err(e) => debug!("Broker: reconnect failed: {}", e),
        }
    }
}

impl<C: BrokerClient> Drop for BrokerSink<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
