//! ESP-IDF MQTT client behind [`BrokerClient`].
//!
//! The session state is tracked from the client's event callback.  The
//! IDF client reconnects on its own; `connect` only (re)creates the
//! client when none exists and reports whether the session is up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use esp_idf_svc::mqtt::client::{
    EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS as EspQoS,
};
use log::{info, warn};

use crate::adapters::broker::{BrokerClient, QoS, STATUS_OFFLINE};
use crate::config::BrokerConfig;
use crate::error::TransportError;

fn esp_qos(qos: QoS) -> EspQoS {
    match qos {
        QoS::AtMostOnce => EspQoS::AtMostOnce,
        QoS::AtLeastOnce => EspQoS::AtLeastOnce,
        QoS::ExactlyOnce => EspQoS::ExactlyOnce,
    }
}

pub struct EspBrokerClient {
    url: String,
    client_id: String,
    status_topic: String,
    qos: QoS,
    client: Option<EspMqttClient<'static>>,
    connected: Arc<AtomicBool>,
}

impl EspBrokerClient {
    pub fn new(config: &BrokerConfig) -> Self {
        Self {
            url: format!("mqtt://{}:{}", config.host, config.port),
            client_id: config.client_id.as_str().to_owned(),
            status_topic: format!("{}/status", config.base_topic),
            qos: QoS::from_level(config.qos),
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    fn create(&mut self) -> Result<(), TransportError> {
        let conf = MqttClientConfiguration {
            client_id: Some(&self.client_id),
            lwt: Some(LwtConfiguration {
                topic: &self.status_topic,
                payload: STATUS_OFFLINE.as_bytes(),
                qos: esp_qos(self.qos),
                retain: true,
            }),
            ..Default::default()
        };
        let flag = self.connected.clone();
        let client = EspMqttClient::new_cb(&self.url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => flag.store(true, Ordering::Relaxed),
            EventPayload::Disconnected => flag.store(false, Ordering::Relaxed),
            EventPayload::Error(e) => warn!("Broker: client error {:?}", e),
            _ => {}
        })
        .map_err(|e| {
            warn!("Broker: client creation failed: {}", e);
            TransportError::NotConnected
        })?;
        info!("Broker: client started for {}", self.url);
        self.client = Some(client);
        Ok(())
    }
}

impl BrokerClient for EspBrokerClient {
    fn is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::Relaxed)
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        if self.client.is_none() {
            self.create()?;
        }
        if self.is_connected() {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    fn disconnect(&mut self) {
        self.client = None;
        self.connected.store(false, Ordering::Relaxed);
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), TransportError> {
        let client = self.client.as_mut().ok_or(TransportError::NotConnected)?;
        client
            .enqueue(topic, esp_qos(qos), retain, payload)
            .map(|_| ())
            .map_err(|_| TransportError::SendFailed)
    }
}
