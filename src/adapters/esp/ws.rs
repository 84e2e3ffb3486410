//! WebSocket dashboard server on the IDF HTTP server.
//!
//! The WS handler runs on the HTTP server task.  It records connect,
//! disconnect and text events in shared state and keeps a detached sender
//! per session; the platform loop drains events and broadcasts through
//! [`BroadcastTransport`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use esp_idf_svc::http::server::ws::EspHttpWsDetachedSender;
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::sys::EspError;
use esp_idf_svc::ws::FrameType;
use log::{info, warn};

use crate::adapters::dashboard::{BroadcastTransport, ListenerEvent, ListenerId};
use crate::app::inbox::{CommandLine, MAX_COMMAND_LEN};
use crate::error::TransportError;

/// Bound on events waiting for the platform loop.
const MAX_PENDING_EVENTS: usize = 16;

#[derive(Default)]
struct Shared {
    listeners: Vec<(ListenerId, EspHttpWsDetachedSender)>,
    events: VecDeque<ListenerEvent>,
}

impl Shared {
    fn push(&mut self, event: ListenerEvent) {
        if self.events.len() >= MAX_PENDING_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

pub struct WsDashboard {
    _server: EspHttpServer<'static>,
    shared: Arc<Mutex<Shared>>,
}

impl WsDashboard {
    pub fn start(port: u16) -> Result<Self, EspError> {
        let mut server = EspHttpServer::new(&Configuration {
            http_port: port,
            ..Default::default()
        })?;
        let shared = Arc::new(Mutex::new(Shared::default()));
        let state = shared.clone();

        server.ws_handler("/", move |ws| {
            let session = ws.session();
            if ws.is_new() {
                let sender = ws.create_detached_sender()?;
                if let Ok(mut s) = state.lock() {
                    s.listeners.push((session, sender));
                    s.push(ListenerEvent::Connected(session));
                }
                return Ok::<(), EspError>(());
            }
            if ws.is_closed() {
                if let Ok(mut s) = state.lock() {
                    s.listeners.retain(|(id, _)| *id != session);
                    s.push(ListenerEvent::Disconnected(session));
                }
                return Ok(());
            }

            let (frame, len) = ws.recv(&mut [])?;
            let mut buf = [0u8; MAX_COMMAND_LEN + 1];
            if len > buf.len() {
                warn!("Dashboard: frame of {} bytes from #{} dropped", len, session);
                let mut sink = vec![0u8; len];
                ws.recv(&mut sink)?;
                return Ok(());
            }
            ws.recv(&mut buf[..len])?;
            if !matches!(frame, FrameType::Text(_)) {
                return Ok(());
            }
            let text = core::str::from_utf8(&buf[..len]).unwrap_or("");
            let mut line = CommandLine::new();
            if line.push_str(text.trim_end_matches('\0').trim()).is_ok() && !line.is_empty() {
                if let Ok(mut s) = state.lock() {
                    s.push(ListenerEvent::Text(session, line));
                }
            }
            Ok(())
        })?;

        info!("Dashboard: WebSocket server on port {}", port);
        Ok(Self {
            _server: server,
            shared,
        })
    }
}

impl BroadcastTransport for WsDashboard {
    fn listener_count(&self) -> usize {
        self.shared.lock().map_or(0, |s| s.listeners.len())
    }

    fn poll_event(&mut self) -> Option<ListenerEvent> {
        self.shared.lock().ok()?.events.pop_front()
    }

    fn send_to(&mut self, listener: ListenerId, text: &str) -> Result<(), TransportError> {
        let mut s = self.shared.lock().map_err(|_| TransportError::SendFailed)?;
        let (_, sender) = s
            .listeners
            .iter_mut()
            .find(|(id, _)| *id == listener)
            .ok_or(TransportError::NotConnected)?;
        sender
            .send(FrameType::Text(false), text.as_bytes())
            .map_err(|_| TransportError::SendFailed)
    }

    fn broadcast(&mut self, text: &str) -> Result<(), TransportError> {
        let mut s = self.shared.lock().map_err(|_| TransportError::SendFailed)?;
        let before = s.listeners.len();
        s.listeners
            .retain_mut(|(_, sender)| sender.send(FrameType::Text(false), text.as_bytes()).is_ok());
        if s.listeners.len() < before {
            warn!("Dashboard: dropped {} stale listener(s)", before - s.listeners.len());
        }
        if s.listeners.is_empty() {
            return Err(TransportError::NotConnected);
        }
        Ok(())
    }
}
