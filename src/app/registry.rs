//! Sink registry: lifecycle and fan-out for the five output sinks.
//!
//! ```text
//!   record ──▶ Console ──▶ Radio ──▶ Dashboard ──▶ FileLog ──▶ Broker
//!               (each: skipped unless initialized AND enabled)
//!                                                     │
//!                                      rotation timer ┘
//! ```
//!
//! Each slot is independent: one sink's failure is logged and absorbed,
//! never seen by the next.  Slots are created empty; `init_sink` fills a
//! slot once and later calls are no-ops.

use log::{info, warn};

use crate::app::inbox::CommandInbox;
use crate::app::model::{ArtifactInfo, BoardLayout, MeasurementRecord, SinkKind};
use crate::app::ports::SinkAdapter;
use crate::error::{IoError, NotInitialized, SinkInitError, SinkOpError};
use crate::scheduler::has_elapsed;

/// Snapshot of one slot for status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkStatus {
    pub kind: SinkKind,
    pub initialized: bool,
    pub enabled: bool,
    pub live: bool,
}

/// Outcome of one fan-out pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
struct SinkSlot {
    adapter: Option<Box<dyn SinkAdapter>>,
    enabled: bool,
    live: bool,
}

pub struct SinkRegistry {
    slots: [SinkSlot; SinkKind::COUNT],
    rotation_interval_ms: u32,
    last_rotation_ms: u32,
}

impl SinkRegistry {
    pub fn new(rotation_interval_ms: u32) -> Self {
        Self {
            slots: Default::default(),
            rotation_interval_ms,
            last_rotation_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring up the sink of `kind` using `factory`.
    ///
    /// The factory runs only if the slot is empty, so repeated calls keep
    /// the first adapter.  A failed factory leaves the slot empty and
    /// disabled.
    pub fn init_sink<F>(
        &mut self,
        kind: SinkKind,
        layout: &BoardLayout,
        factory: F,
    ) -> Result<(), SinkInitError>
    where
        F: FnOnce(&BoardLayout) -> Result<Box<dyn SinkAdapter>, SinkInitError>,
    {
        let slot = &mut self.slots[kind.index()];
        if slot.adapter.is_some() {
            return Ok(());
        }

        let adapter = match factory(layout) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!("SinkRegistry: {}", e);
                return Err(e);
            }
        };
        if adapter.kind() != kind {
            warn!(
                "SinkRegistry: factory for {} produced {}",
                kind.name(),
                adapter.kind().name()
            );
            return Err(SinkInitError::new(kind, "adapter kind mismatch"));
        }

        slot.live = adapter.is_live();
        slot.adapter = Some(adapter);
        info!("SinkRegistry: {} initialized", kind.name());
        Ok(())
    }

    pub fn is_initialized(&self, kind: SinkKind) -> bool {
        self.slots[kind.index()].adapter.is_some()
    }

    pub fn is_enabled(&self, kind: SinkKind) -> bool {
        self.slots[kind.index()].enabled
    }

    /// Liveness as of the last delivery or pump.
    pub fn is_live(&self, kind: SinkKind) -> bool {
        self.slots[kind.index()].live
    }

    /// Enable or disable fan-out to `kind`.
    ///
    /// Enabling an uninitialized sink fails; disabling one is a no-op.
    /// Disabling flushes any buffered output.
    pub fn set_enabled(&mut self, kind: SinkKind, enabled: bool) -> Result<(), NotInitialized> {
        let slot = &mut self.slots[kind.index()];
        let Some(adapter) = slot.adapter.as_mut() else {
            return if enabled { Err(NotInitialized(kind)) } else { Ok(()) };
        };
        if slot.enabled == enabled {
            return Ok(());
        }
        if !enabled {
            if let Err(e) = adapter.flush() {
                warn!("SinkRegistry: {} flush on disable failed: {}", kind.name(), e);
            }
        }
        slot.enabled = enabled;
        info!(
            "SinkRegistry: {} {}",
            kind.name(),
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    pub fn status(&self, kind: SinkKind) -> SinkStatus {
        let slot = &self.slots[kind.index()];
        SinkStatus {
            kind,
            initialized: slot.adapter.is_some(),
            enabled: slot.enabled,
            live: slot.live,
        }
    }

    pub fn statuses(&self) -> [SinkStatus; SinkKind::COUNT] {
        SinkKind::ALL.map(|kind| self.status(kind))
    }

    // ── Data path ─────────────────────────────────────────────

    /// Run every initialized sink's background I/O.
    pub fn pump(&mut self, now_ms: u32, inbox: &CommandInbox) {
        for slot in &mut self.slots {
            if let Some(adapter) = slot.adapter.as_mut() {
                adapter.pump(now_ms, inbox);
                slot.live = adapter.is_live();
            }
        }
    }

    /// Fan `record` out to every enabled sink in fixed order, then apply
    /// the automatic file rotation policy.
    pub fn distribute(
        &mut self,
        record: &MeasurementRecord,
        layout: &BoardLayout,
        now_ms: u32,
    ) -> FanOut {
        let mut outcome = FanOut::default();
        for kind in SinkKind::ALL {
            let slot = &mut self.slots[kind.index()];
            if !slot.enabled {
                continue;
            }
            let Some(adapter) = slot.adapter.as_mut() else {
                continue;
            };
            match adapter.deliver(record, layout) {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    outcome.failed += 1;
                    warn!("SinkRegistry: {} delivery failed: {}", kind.name(), e);
                }
            }
            slot.live = adapter.is_live();
        }

        if self.is_enabled(SinkKind::FileLog)
            && has_elapsed(now_ms, self.last_rotation_ms, self.rotation_interval_ms)
        {
            info!("SinkRegistry: rotation interval elapsed");
            if let Err(e) = self.rotate_log(now_ms) {
                warn!("SinkRegistry: automatic rotation failed: {}", e);
            }
        }
        outcome
    }

    // ── On-demand primitives ──────────────────────────────────

    /// Close the current file artifact and restart the rotation timer.
    /// Shared by the hourly policy and the `rotate_file` command.
    pub fn rotate_log(&mut self, now_ms: u32) -> Result<(), SinkOpError> {
        let slot = &mut self.slots[SinkKind::FileLog.index()];
        let adapter = slot
            .adapter
            .as_mut()
            .ok_or(SinkOpError::NotInitialized(SinkKind::FileLog))?;
        self.last_rotation_ms = now_ms;
        let result = adapter.rotate();
        slot.live = adapter.is_live();
        result.map_err(SinkOpError::Io)
    }

    pub fn flush(&mut self, kind: SinkKind) -> Result<(), SinkOpError> {
        let adapter = self.slots[kind.index()]
            .adapter
            .as_mut()
            .ok_or(SinkOpError::NotInitialized(kind))?;
        adapter.flush().map_err(SinkOpError::Io)
    }

    fn dashboard_mut(&mut self) -> Result<&mut dyn SinkAdapter, SinkOpError> {
        match self.slots[SinkKind::NetworkDashboard.index()].adapter.as_deref_mut() {
            Some(adapter) => Ok(adapter),
            None => Err(SinkOpError::NotInitialized(SinkKind::NetworkDashboard)),
        }
    }

    /// Erase persisted network credentials through the dashboard sink.
    pub fn forget_credentials(&mut self) -> Result<(), SinkOpError> {
        self.dashboard_mut()?
            .forget_credentials()
            .map_err(SinkOpError::Storage)
    }

    /// Persist network credentials through the dashboard sink.
    pub fn store_credentials(&mut self, ssid: &str, password: &str) -> Result<(), SinkOpError> {
        self.dashboard_mut()?
            .store_credentials(ssid, password)
            .map_err(SinkOpError::Storage)
    }

    pub fn artifact(&self) -> Option<ArtifactInfo> {
        self.slots[SinkKind::FileLog.index()]
            .adapter
            .as_ref()
            .and_then(|a| a.artifact())
    }

    pub fn last_rotation_ms(&self) -> u32 {
        self.last_rotation_ms
    }

    /// Flush every initialized sink (shutdown path).
    pub fn flush_all(&mut self) {
        for kind in SinkKind::ALL {
            match self.flush(kind) {
                Ok(()) | Err(SinkOpError::NotInitialized(_) | SinkOpError::Io(IoError::Unsupported)) => {}
                Err(e) => warn!("SinkRegistry: {} flush failed: {}", kind.name(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::model::{BoardId, ChannelDescriptor};
    use crate::error::DeliveryError;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Trace {
        delivered: Vec<(SinkKind, u32)>,
        flushes: usize,
        rotations: usize,
    }

    struct Probe {
        kind: SinkKind,
        fail: bool,
        trace: Rc<RefCell<Trace>>,
    }

    impl SinkAdapter for Probe {
        fn kind(&self) -> SinkKind {
            self.kind
        }
        fn deliver(
            &mut self,
            record: &MeasurementRecord,
            _layout: &BoardLayout,
        ) -> Result<(), DeliveryError> {
            self.trace
                .borrow_mut()
                .delivered
                .push((self.kind, record.sequence));
            if self.fail {
                Err(DeliveryError::Io(IoError::WriteFailed))
            } else {
                Ok(())
            }
        }
        fn is_live(&self) -> bool {
            !self.fail
        }
        fn flush(&mut self) -> Result<(), IoError> {
            self.trace.borrow_mut().flushes += 1;
            Ok(())
        }
        fn rotate(&mut self) -> Result<(), IoError> {
            self.trace.borrow_mut().rotations += 1;
            Ok(())
        }
    }

    fn layout() -> BoardLayout {
        BoardLayout::builder(BoardId::Custom, "Test", "Mock")
            .channel(ChannelDescriptor::new("a", "", 0.0, 1.0).unwrap())
            .build()
            .unwrap()
    }

    fn probe(
        kind: SinkKind,
        fail: bool,
        trace: &Rc<RefCell<Trace>>,
    ) -> impl FnOnce(&BoardLayout) -> Result<Box<dyn SinkAdapter>, SinkInitError> {
        let trace = Rc::clone(trace);
        move |_: &BoardLayout| Ok(Box::new(Probe { kind, fail, trace }) as Box<dyn SinkAdapter>)
    }

    #[test]
    fn enabling_uninitialized_sink_fails() {
        let mut reg = SinkRegistry::new(3_600_000);
        assert_eq!(
            reg.set_enabled(SinkKind::FileLog, true),
            Err(NotInitialized(SinkKind::FileLog))
        );
        assert!(reg.set_enabled(SinkKind::FileLog, false).is_ok());
    }

    #[test]
    fn second_init_does_not_run_factory() {
        let trace = Rc::new(RefCell::new(Trace::default()));
        let layout = layout();
        let mut reg = SinkRegistry::new(3_600_000);
        reg.init_sink(SinkKind::Console, &layout, probe(SinkKind::Console, false, &trace))
            .unwrap();
        let mut ran = false;
        reg.init_sink(SinkKind::Console, &layout, |_| {
            ran = true;
            Err(SinkInitError::new(SinkKind::Console, "unreachable"))
        })
        .unwrap();
        assert!(!ran);
    }

    #[test]
    fn failed_init_leaves_slot_empty() {
        let layout = layout();
        let mut reg = SinkRegistry::new(3_600_000);
        let err = reg.init_sink(SinkKind::FileLog, &layout, |_| {
            Err(SinkInitError::new(SinkKind::FileLog, "no medium"))
        });
        assert!(err.is_err());
        assert!(!reg.is_initialized(SinkKind::FileLog));
        assert!(reg.set_enabled(SinkKind::FileLog, true).is_err());
    }

    #[test]
    fn mismatched_factory_kind_is_rejected() {
        let trace = Rc::new(RefCell::new(Trace::default()));
        let layout = layout();
        let mut reg = SinkRegistry::new(3_600_000);
        let err = reg.init_sink(SinkKind::FileLog, &layout, probe(SinkKind::Console, false, &trace));
        assert!(err.is_err());
        assert!(!reg.is_initialized(SinkKind::FileLog));
    }

    #[test]
    fn fan_out_follows_fixed_order_and_isolates_failures() {
        let trace = Rc::new(RefCell::new(Trace::default()));
        let layout = layout();
        let mut reg = SinkRegistry::new(3_600_000);
        // Register in reverse to show order comes from the kind, not init order.
        for kind in SinkKind::ALL.iter().rev() {
            let fail = *kind == SinkKind::NetworkDashboard;
            reg.init_sink(*kind, &layout, probe(*kind, fail, &trace)).unwrap();
            reg.set_enabled(*kind, true).unwrap();
        }

        let mut rec = MeasurementRecord::for_layout(0, &layout);
        rec.sequence = 7;
        let out = reg.distribute(&rec, &layout, 10);

        assert_eq!(out, FanOut { delivered: 4, failed: 1 });
        let seen: Vec<SinkKind> = trace.borrow().delivered.iter().map(|(k, _)| *k).collect();
        assert_eq!(seen, SinkKind::ALL.to_vec());
        assert!(trace.borrow().delivered.iter().all(|(_, seq)| *seq == 7));
        assert!(!reg.is_live(SinkKind::NetworkDashboard));
    }

    #[test]
    fn disabled_sinks_are_skipped() {
        let trace = Rc::new(RefCell::new(Trace::default()));
        let layout = layout();
        let mut reg = SinkRegistry::new(3_600_000);
        reg.init_sink(SinkKind::Console, &layout, probe(SinkKind::Console, false, &trace))
            .unwrap();
        let rec = MeasurementRecord::for_layout(0, &layout);
        let out = reg.distribute(&rec, &layout, 0);
        assert_eq!(out.delivered, 0);
        assert!(trace.borrow().delivered.is_empty());
    }

    #[test]
    fn disabling_flushes_once() {
        let trace = Rc::new(RefCell::new(Trace::default()));
        let layout = layout();
        let mut reg = SinkRegistry::new(3_600_000);
        reg.init_sink(SinkKind::FileLog, &layout, probe(SinkKind::FileLog, false, &trace))
            .unwrap();
        reg.set_enabled(SinkKind::FileLog, true).unwrap();
        reg.set_enabled(SinkKind::FileLog, true).unwrap();
        reg.set_enabled(SinkKind::FileLog, false).unwrap();
        reg.set_enabled(SinkKind::FileLog, false).unwrap();
        assert_eq!(trace.borrow().flushes, 1);
    }

    #[test]
    fn rotation_fires_when_interval_elapses() {
        let trace = Rc::new(RefCell::new(Trace::default()));
        let layout = layout();
        let mut reg = SinkRegistry::new(1_000);
        reg.init_sink(SinkKind::FileLog, &layout, probe(SinkKind::FileLog, false, &trace))
            .unwrap();
        reg.set_enabled(SinkKind::FileLog, true).unwrap();
        let rec = MeasurementRecord::for_layout(0, &layout);

        reg.distribute(&rec, &layout, 999);
        assert_eq!(trace.borrow().rotations, 0);
        reg.distribute(&rec, &layout, 1_000);
        assert_eq!(trace.borrow().rotations, 1);
        assert_eq!(reg.last_rotation_ms(), 1_000);
        reg.distribute(&rec, &layout, 1_500);
        assert_eq!(trace.borrow().rotations, 1);
    }

    #[test]
    fn manual_rotation_resets_timer() {
        let trace = Rc::new(RefCell::new(Trace::default()));
        let layout = layout();
        let mut reg = SinkRegistry::new(1_000);
        reg.init_sink(SinkKind::FileLog, &layout, probe(SinkKind::FileLog, false, &trace))
            .unwrap();
        reg.set_enabled(SinkKind::FileLog, true).unwrap();
        reg.rotate_log(900).unwrap();
        let rec = MeasurementRecord::for_layout(0, &layout);
        reg.distribute(&rec, &layout, 1_200);
        assert_eq!(trace.borrow().rotations, 1);
    }

    #[test]
    fn rotate_without_file_sink_fails() {
        let mut reg = SinkRegistry::new(1_000);
        assert_eq!(
            reg.rotate_log(0),
            Err(SinkOpError::NotInitialized(SinkKind::FileLog))
        );
    }

    #[test]
    fn forget_credentials_needs_dashboard() {
        let mut reg = SinkRegistry::new(1_000);
        assert_eq!(
            reg.forget_credentials(),
            Err(SinkOpError::NotInitialized(SinkKind::NetworkDashboard))
        );
        assert_eq!(
            reg.store_credentials("lab", "hunter22"),
            Err(SinkOpError::NotInitialized(SinkKind::NetworkDashboard))
        );
    }
}
