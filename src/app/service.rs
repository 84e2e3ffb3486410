//! Platform service: the hexagonal core.
//!
//! [`Platform`] owns the sensor driver, the sink registry, the sampling
//! scheduler and the loop state.  A single cooperative `poll` drives
//! everything; the caller supplies the clock and a reply sink, so the
//! whole loop runs unchanged on the device and in host tests.
//!
//! ```text
//!  CommandInbox ──▶ ┌───────────────────────────┐
//!                   │         Platform          │ ──▶ SinkRegistry ──▶ sinks
//!  SensorDriver ◀──▶│ Scheduler · State · Cmds  │
//!                   └───────────────────────────┘
//! ```
//!
//! One `poll` pass, in order:
//! 1. take at most one queued command line and execute it
//! 2. pump every initialized sink's background I/O
//! 3. if sampling is active and due: read, number, fan out
//! 4. emit the periodic status log line

use std::sync::Arc;

use log::{info, warn};

use crate::config::PlatformConfig;
use crate::error::{CommandError, HardwareError, NotInitialized, SinkInitError};
use crate::scheduler::{SampleScheduler, has_elapsed};

use super::inbox::CommandInbox;
use super::interpreter::{self, CommandContext};
use super::model::{BoardLayout, MeasurementRecord, SinkKind, SystemState};
use super::ports::{ReplySink, SensorDriver, SinkAdapter};
use super::registry::{FanOut, SinkRegistry};
use super::report::StatusReport;

/// Outcome of one sampling attempt inside `poll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Sampling inactive or not yet due.
    Idle,
    /// A record was produced and fanned out.
    Distributed(FanOut),
    /// The driver failed; the cycle was skipped.
    ReadFailed,
}

// ───────────────────────────────────────────────────────────────
// Platform
// ───────────────────────────────────────────────────────────────

pub struct Platform {
    driver: Box<dyn SensorDriver>,
    layout: BoardLayout,
    state: SystemState,
    scheduler: SampleScheduler,
    registry: SinkRegistry,
    inbox: Arc<CommandInbox>,
    current: Option<MeasurementRecord>,
    sensor_ready: bool,
    status_interval_ms: u32,
}

impl Platform {
    /// Build the platform around `driver`.
    ///
    /// Sampling starts inactive; call [`init_sensor`](Self::init_sensor)
    /// and [`start`](Self::start) (or send `start_all`).
    pub fn new(driver: Box<dyn SensorDriver>, config: &PlatformConfig) -> Self {
        let layout = driver.layout().clone();
        let scheduler = SampleScheduler::new(&layout, config.default_interval_ms);
        info!(
            "Platform: {} ({}), {} channels, interval {} ms",
            layout.board_name(),
            layout.sensor_name(),
            layout.channel_count(),
            scheduler.interval_ms()
        );
        Self {
            driver,
            layout,
            state: SystemState::default(),
            scheduler,
            registry: SinkRegistry::new(config.file_log.rotation_interval_ms),
            inbox: Arc::new(CommandInbox::new()),
            current: None,
            sensor_ready: false,
            status_interval_ms: config.status_interval_ms,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Probe the sensor front-end.  On failure the platform keeps running
    /// (commands, sinks) but never samples.
    pub fn init_sensor(&mut self) -> Result<(), HardwareError> {
        match self.driver.init() {
            Ok(()) => {
                self.sensor_ready = true;
                info!("Platform: sensor {} ready", self.layout.sensor_name());
                Ok(())
            }
            Err(e) => {
                self.sensor_ready = false;
                warn!("Platform: sensor init failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn init_sink<F>(&mut self, kind: SinkKind, factory: F) -> Result<(), SinkInitError>
    where
        F: FnOnce(&BoardLayout) -> Result<Box<dyn SinkAdapter>, SinkInitError>,
    {
        self.registry.init_sink(kind, &self.layout, factory)
    }

    pub fn set_sink_enabled(&mut self, kind: SinkKind, enabled: bool) -> Result<(), NotInitialized> {
        self.registry.set_enabled(kind, enabled)
    }

    /// Start sampling.
    pub fn start(&mut self) {
        self.state.active = true;
        info!("Platform: sampling started");
    }

    pub fn stop(&mut self) {
        self.state.active = false;
        info!("Platform: sampling stopped");
    }

    /// Flush buffered sink output (shutdown path).
    pub fn shutdown(&mut self) {
        self.state.active = false;
        self.registry.flush_all();
    }

    // ── Main loop ─────────────────────────────────────────────

    /// One cooperative pass of the acquisition loop.
    pub fn poll(&mut self, now_ms: u32, replies: &mut impl ReplySink) -> SampleOutcome {
        if let Some(line) = self.inbox.take() {
            self.handle_line(&line, now_ms, replies);
        }

        self.registry.pump(now_ms, &self.inbox);

        let outcome = self.sample(now_ms);

        if has_elapsed(now_ms, self.state.last_status_ms, self.status_interval_ms) {
            self.state.last_status_ms = now_ms;
            self.log_status(now_ms);
        }
        outcome
    }

    /// Sample if active and due.  The due-time is advanced before the
    /// read so a failing sensor is retried one interval later, not
    /// hammered.
    fn sample(&mut self, now_ms: u32) -> SampleOutcome {
        if !self.state.active
            || !self.sensor_ready
            || !self.scheduler.is_due(now_ms, self.state.last_sample_ms)
        {
            return SampleOutcome::Idle;
        }
        self.state.last_sample_ms = now_ms;

        let mut record = match self.driver.read(now_ms) {
            Ok(record) => record,
            Err(e) => {
                warn!("Platform: read failed, cycle skipped: {}", e);
                return SampleOutcome::ReadFailed;
            }
        };

        self.state.measurement_count = self.state.measurement_count.wrapping_add(1);
        record.sequence = self.state.measurement_count;
        self.current = Some(record);

        SampleOutcome::Distributed(self.registry.distribute(&record, &self.layout, now_ms))
    }

    fn log_status(&self, now_ms: u32) {
        info!("{}", self.status_line(now_ms));
    }

    /// One-line diagnostic snapshot for the periodic status log.
    pub fn status_line(&self, now_ms: u32) -> String {
        format!(
            "Status: uptime={}s count={} rate={:.2}Hz interval={}ms active={}",
            now_ms / 1000,
            self.state.measurement_count,
            self.scheduler.rate_hz(),
            self.scheduler.interval_ms(),
            self.state.active
        )
    }

    // ── Commands ──────────────────────────────────────────────

    /// Execute one command line immediately and send the reply (or the
    /// error text) to `replies`.
    pub fn handle_line(&mut self, line: &str, now_ms: u32, replies: &mut impl ReplySink) {
        match self.execute_line(line, now_ms) {
            None => {}
            Some(Ok(text)) => {
                for l in text.lines() {
                    replies.reply(l);
                }
            }
            Some(Err(e)) => {
                warn!("Platform: command rejected: {}", e);
                replies.reply(&e.to_string());
                if matches!(e, CommandError::Unknown(_)) {
                    replies.reply("Type 'help' for available commands");
                }
            }
        }
    }

    /// Execute one command line and return the outcome.
    pub fn execute_line(&mut self, line: &str, now_ms: u32) -> Option<Result<String, CommandError>> {
        let mut cx = CommandContext {
            layout: &self.layout,
            state: &mut self.state,
            scheduler: &mut self.scheduler,
            registry: &mut self.registry,
            last_record: self.current.as_ref(),
            now_ms,
        };
        interpreter::interpret(line, &mut cx)
    }

    // ── Accessors ─────────────────────────────────────────────

    /// Handle for command producers.
    pub fn inbox(&self) -> Arc<CommandInbox> {
        Arc::clone(&self.inbox)
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn state(&self) -> &SystemState {
        &self.state
    }

    pub fn scheduler(&self) -> &SampleScheduler {
        &self.scheduler
    }

    pub fn registry(&self) -> &SinkRegistry {
        &self.registry
    }

    pub fn current_record(&self) -> Option<&MeasurementRecord> {
        self.current.as_ref()
    }

    pub fn status_report(&self, now_ms: u32) -> StatusReport {
        StatusReport::collect(
            &self.layout,
            &self.state,
            &self.scheduler,
            &self.registry,
            self.current.as_ref(),
            now_ms,
        )
    }
}
