//! Short-range radio sink: compact binary notifications.
//!
//! Payload: one little-endian `i16` per layout channel, in channel order,
//! so a 4-channel board sends 8 bytes.  Values are truncated toward zero
//! and saturate at the `i16` range; a failed or inactive channel is sent
//! as `0`.  With no subscribed peer a delivery is a silent no-op.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use heapless::Vec;

use crate::app::model::{BoardLayout, MAX_CHANNELS, MeasurementRecord, SinkKind};
use crate::app::ports::SinkAdapter;
use crate::error::{DeliveryError, TransportError};

pub const MAX_PAYLOAD: usize = MAX_CHANNELS * 2;

/// Notification characteristic of a GATT-style link.
pub trait NotifyTransport {
    /// A peer is connected and has enabled notifications.
    fn has_subscriber(&self) -> bool;

    fn notify(&mut self, payload: &[u8]) -> Result<(), TransportError>;
}

pub fn encode_payload(record: &MeasurementRecord, layout: &BoardLayout) -> Vec<u8, MAX_PAYLOAD> {
    let mut out = Vec::new();
    for i in 0..layout.channel_count().min(MAX_CHANNELS) {
        // `as` truncates toward zero, saturates, and maps NaN to 0.
        let v = layout.reading(record, i).map_or(0, |v| v as i16);
        let _ = out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Connection state of one registered GATT application.
///
/// The radio stack fills this in from its event callbacks while the
/// transport reads it from the acquisition task, so every field is atomic.
/// Handles are stored as `value + 1`; 0 means "not assigned yet".
#[derive(Debug, Default)]
pub struct RadioLink {
    interface: AtomicU32,
    service: AtomicU32,
    data: AtomicU32,
    cccd: AtomicU32,
    conn: AtomicU32,
    subscribed: AtomicBool,
}

fn load_handle(slot: &AtomicU32) -> Option<u16> {
    match slot.load(Ordering::Acquire) {
        0 => None,
        v => u16::try_from(v - 1).ok(),
    }
}

fn store_handle(slot: &AtomicU32, value: u16) {
    slot.store(u32::from(value) + 1, Ordering::Release);
}

impl RadioLink {
    pub fn interface(&self) -> Option<u16> {
        load_handle(&self.interface)
    }

    pub fn service_handle(&self) -> Option<u16> {
        load_handle(&self.service)
    }

    pub fn set_service_handle(&self, handle: u16) {
        store_handle(&self.service, handle);
    }

    pub fn data_handle(&self) -> Option<u16> {
        load_handle(&self.data)
    }

    pub fn set_data_handle(&self, handle: u16) {
        store_handle(&self.data, handle);
    }

    pub fn set_cccd_handle(&self, handle: u16) {
        store_handle(&self.cccd, handle);
    }

    pub fn connected(&self, conn_id: u16) {
        store_handle(&self.conn, conn_id);
    }

    /// Drops the peer and its subscription.
    pub fn disconnected(&self) {
        self.conn.store(0, Ordering::Release);
        self.subscribed.store(false, Ordering::Release);
    }

    pub fn conn_id(&self) -> Option<u16> {
        load_handle(&self.conn)
    }

    /// Applies a peer write. Returns the new subscription state when the
    /// write targeted the CCCD, `None` for any other attribute.
    pub fn descriptor_written(&self, handle: u16, value: &[u8]) -> Option<bool> {
        if load_handle(&self.cccd) != Some(handle) {
            return None;
        }
        let on = value.first().is_some_and(|v| v & 0x01 != 0);
        self.subscribed.store(on, Ordering::Release);
        Some(on)
    }

    pub fn has_subscriber(&self) -> bool {
        self.conn_id().is_some() && self.subscribed.load(Ordering::Acquire)
    }
}

struct Binding {
    app_id: u16,
    link: Arc<RadioLink>,
}

/// Routes stack callbacks to the [`RadioLink`] of the application they
/// belong to.
///
/// A link is registered under its application id before the stack is
/// asked to register that application; the registration event then binds
/// the stack-assigned interface to it, and every later event is routed by
/// interface.
pub struct LinkRegistry<const N: usize> {
    bindings: Mutex<Vec<Binding, N>>,
}

impl<const N: usize> LinkRegistry<N> {
    pub const fn new() -> Self {
        Self {
            bindings: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, app_id: u16, link: Arc<RadioLink>) -> Result<(), TransportError> {
        let mut bindings = self.bindings.lock().map_err(|_| TransportError::SendFailed)?;
        bindings.retain(|b| b.app_id != app_id);
        bindings
            .push(Binding { app_id, link })
            .map_err(|_| TransportError::SendFailed)
    }

    /// Records the interface the stack assigned to `app_id`.
    pub fn bind(&self, app_id: u16, interface: u16) -> Option<Arc<RadioLink>> {
        let bindings = self.bindings.lock().ok()?;
        let binding = bindings.iter().find(|b| b.app_id == app_id)?;
        store_handle(&binding.link.interface, interface);
        Some(Arc::clone(&binding.link))
    }

    pub fn lookup(&self, interface: u16) -> Option<Arc<RadioLink>> {
        let bindings = self.bindings.lock().ok()?;
        bindings
            .iter()
            .find(|b| b.link.interface() == Some(interface))
            .map(|b| Arc::clone(&b.link))
    }

    pub fn unregister(&self, app_id: u16) {
        if let Ok(mut bindings) = self.bindings.lock() {
            bindings.retain(|b| b.app_id != app_id);
        }
    }
}

impl<const N: usize> Default for LinkRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RadioSink<T: NotifyTransport> {
    transport: T,
}

impl<T: NotifyTransport> RadioSink<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T: NotifyTransport> SinkAdapter for RadioSink<T> {
    fn kind(&self) -> SinkKind {
        SinkKind::ShortRangeRadio
    }

    fn deliver(
        &mut self,
        record: &MeasurementRecord,
        layout: &BoardLayout,
    ) -> Result<(), DeliveryError> {
        if !self.transport.has_subscriber() {
            return Ok(());
        }
        self.transport.notify(&encode_payload(record, layout))?;
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.transport.has_subscriber()
    }
}
