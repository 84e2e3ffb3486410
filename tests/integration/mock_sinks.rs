//! Mock drivers, transports and sinks for integration tests.
//!
//! Every mock keeps its observable state behind an `Rc<RefCell<..>>` so a
//! test can hand the mock to the platform (boxed) and still inspect it.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use sensything::adapters::credentials::{CredentialStore, NetworkCredentials};
use sensything::adapters::dashboard::{BroadcastTransport, ListenerEvent, ListenerId};
use sensything::adapters::file_log::ArtifactStore;
use sensything::adapters::radio::NotifyTransport;
use sensything::app::model::{BoardId, BoardLayout, ChannelDescriptor, MeasurementRecord, SinkKind};
use sensything::app::ports::{SensorDriver, SinkAdapter};
use sensything::error::{
    DeliveryError, HardwareError, IoError, ReadError, StorageError, TransportError,
};

pub fn four_channel_layout() -> BoardLayout {
    let mut b = BoardLayout::builder(BoardId::Custom, "Test Board", "Mock AFE")
        .interval_range(20, 10_000);
    for i in 0..4 {
        b = b.channel(ChannelDescriptor::new(&format!("ch{i}"), "V", -10.0, 10.0).unwrap());
    }
    b.build().unwrap()
}

// ── ScriptedDriver ────────────────────────────────────────────

/// Produces `values` on every read; `None` entries are failed channels.
/// With `fail_every = Some(n)`, every n-th read fails outright.
pub struct ScriptedDriver {
    layout: BoardLayout,
    values: Vec<Option<f32>>,
    fail_every: Option<u32>,
    pub reads: Rc<RefCell<u32>>,
}

#[allow(dead_code)]
impl ScriptedDriver {
    pub fn new(values: &[Option<f32>]) -> Self {
        Self {
            layout: four_channel_layout(),
            values: values.to_vec(),
            fail_every: None,
            reads: Rc::new(RefCell::new(0)),
        }
    }

    pub fn failing_every(mut self, n: u32) -> Self {
        self.fail_every = Some(n);
        self
    }
}

impl SensorDriver for ScriptedDriver {
    fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    fn init(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }

    fn read(&mut self, now_ms: u32) -> Result<MeasurementRecord, ReadError> {
        let n = {
            let mut reads = self.reads.borrow_mut();
            *reads += 1;
            *reads
        };
        if self.fail_every.is_some_and(|every| n % every == 0) {
            return Err(ReadError::Hardware(HardwareError::Timeout));
        }
        let mut rec = MeasurementRecord::for_layout(now_ms, &self.layout);
        for (i, v) in self.values.iter().enumerate() {
            match v {
                Some(v) => rec.set_channel(i, *v),
                None => rec.mark_failed(i),
            }
        }
        Ok(rec)
    }
}

// ── Recorder ──────────────────────────────────────────────────

/// Shared log of `(sink, sequence)` deliveries across several recorders.
pub type DeliveryLog = Rc<RefCell<Vec<(SinkKind, u32)>>>;

/// A sink that records what it receives, optionally failing every call.
pub struct Recorder {
    kind: SinkKind,
    log: DeliveryLog,
    fail: bool,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new(kind: SinkKind, log: &DeliveryLog) -> Self {
        Self {
            kind,
            log: Rc::clone(log),
            fail: false,
        }
    }

    pub fn failing(kind: SinkKind, log: &DeliveryLog) -> Self {
        Self {
            fail: true,
            ..Self::new(kind, log)
        }
    }
}

impl SinkAdapter for Recorder {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    fn deliver(
        &mut self,
        record: &MeasurementRecord,
        _layout: &BoardLayout,
    ) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(TransportError::SendFailed.into());
        }
        self.log.borrow_mut().push((self.kind, record.sequence));
        Ok(())
    }

    fn is_live(&self) -> bool {
        !self.fail
    }
}

// ── Transports ────────────────────────────────────────────────

#[derive(Default)]
pub struct LinkState {
    pub subscribed: bool,
    pub sent: Vec<Vec<u8>>,
}

#[derive(Clone, Default)]
pub struct SharedNotifier(pub Rc<RefCell<LinkState>>);

impl NotifyTransport for SharedNotifier {
    fn has_subscriber(&self) -> bool {
        self.0.borrow().subscribed
    }

    fn notify(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.0.borrow_mut().sent.push(payload.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct WsState {
    pub listeners: Vec<ListenerId>,
    pub events: VecDeque<ListenerEvent>,
    /// `(Some(id), text)` for direct sends, `(None, text)` for broadcasts.
    pub sent: Vec<(Option<ListenerId>, String)>,
}

#[allow(dead_code)]
impl WsState {
    pub fn connect(&mut self, id: ListenerId) {
        self.listeners.push(id);
        self.events.push_back(ListenerEvent::Connected(id));
    }

    pub fn text(&mut self, id: ListenerId, line: &str) {
        let mut l = heapless::String::new();
        l.push_str(line).unwrap();
        self.events.push_back(ListenerEvent::Text(id, l));
    }
}

#[derive(Clone, Default)]
pub struct SharedBroadcast(pub Rc<RefCell<WsState>>);

impl BroadcastTransport for SharedBroadcast {
    fn listener_count(&self) -> usize {
        self.0.borrow().listeners.len()
    }

    fn poll_event(&mut self) -> Option<ListenerEvent> {
        self.0.borrow_mut().events.pop_front()
    }

    fn send_to(&mut self, listener: ListenerId, text: &str) -> Result<(), TransportError> {
        self.0.borrow_mut().sent.push((Some(listener), text.to_owned()));
        Ok(())
    }

    fn broadcast(&mut self, text: &str) -> Result<(), TransportError> {
        self.0.borrow_mut().sent.push((None, text.to_owned()));
        Ok(())
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryCredentials(pub Rc<RefCell<Option<NetworkCredentials>>>);

impl CredentialStore for MemoryCredentials {
    fn load(&self) -> Result<NetworkCredentials, StorageError> {
        self.0.borrow().clone().ok_or(StorageError::NotFound)
    }

    fn save(&mut self, creds: &NetworkCredentials) -> Result<(), StorageError> {
        *self.0.borrow_mut() = Some(creds.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        *self.0.borrow_mut() = None;
        Ok(())
    }
}

#[derive(Default)]
pub struct MediumState {
    pub files: BTreeMap<String, String>,
    pub ejected: bool,
}

#[derive(Clone, Default)]
pub struct MemoryMedium(pub Rc<RefCell<MediumState>>);

impl ArtifactStore for MemoryMedium {
    fn is_available(&self) -> bool {
        !self.0.borrow().ejected
    }

    fn append(&mut self, name: &str, data: &[u8]) -> Result<(), IoError> {
        let mut state = self.0.borrow_mut();
        if state.ejected {
            return Err(IoError::NotMounted);
        }
        state
            .files
            .entry(name.to_owned())
            .or_default()
            .push_str(std::str::from_utf8(data).map_err(|_| IoError::WriteFailed)?);
        Ok(())
    }
}
