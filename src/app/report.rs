//! Human-readable status and help reports.

use core::fmt;

use crate::app::commands::HELP;
use crate::app::model::{ArtifactInfo, BoardLayout, MeasurementRecord, SinkKind, SystemState};
use crate::app::registry::{SinkRegistry, SinkStatus};
use crate::scheduler::SampleScheduler;

pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Point-in-time view of the platform for the `status` command.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub board_name: String,
    pub board_code: u8,
    pub sensor_name: String,
    pub channel_count: usize,
    pub measurement_count: u32,
    pub interval_ms: u32,
    pub rate_hz: f32,
    pub active: bool,
    pub uptime_s: u32,
    pub sinks: [SinkStatus; SinkKind::COUNT],
    pub artifact: Option<ArtifactInfo>,
    pub last_record: Option<MeasurementRecord>,
}

impl StatusReport {
    pub fn collect(
        layout: &BoardLayout,
        state: &SystemState,
        scheduler: &SampleScheduler,
        registry: &SinkRegistry,
        last_record: Option<&MeasurementRecord>,
        now_ms: u32,
    ) -> Self {
        Self {
            board_name: layout.board_name().to_owned(),
            board_code: layout.board().code(),
            sensor_name: layout.sensor_name().to_owned(),
            channel_count: layout.channel_count(),
            measurement_count: state.measurement_count,
            interval_ms: scheduler.interval_ms(),
            rate_hz: scheduler.rate_hz(),
            active: state.active,
            uptime_s: now_ms / 1000,
            sinks: registry.statuses(),
            artifact: registry.artifact(),
            last_record: last_record.copied(),
        }
    }
}

fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "no" }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Sensything Status ===")?;
        writeln!(f, "Firmware: {}", FIRMWARE_VERSION)?;
        writeln!(f, "Board: {} (type {})", self.board_name, self.board_code)?;
        writeln!(f, "Sensor: {}", self.sensor_name)?;
        writeln!(f, "Channels: {}", self.channel_count)?;
        writeln!(
            f,
            "Sample interval: {} ms ({:.2} Hz)",
            self.interval_ms, self.rate_hz
        )?;
        writeln!(f, "Measurements: {}", self.measurement_count)?;
        writeln!(f, "Active: {}", yes_no(self.active))?;
        writeln!(f, "Uptime: {} s", self.uptime_s)?;
        for s in &self.sinks {
            if s.initialized {
                writeln!(
                    f,
                    "{}: enabled={} live={}",
                    s.kind.name(),
                    yes_no(s.enabled),
                    yes_no(s.live)
                )?;
            } else {
                writeln!(f, "{}: not initialized", s.kind.name())?;
            }
        }
        if let Some(artifact) = &self.artifact {
            match &artifact.current {
                Some(name) => writeln!(f, "Log file: {} (#{})", name, artifact.count)?,
                None => writeln!(f, "Log file: none open ({} so far)", artifact.count)?,
            }
        }
        if let Some(rec) = &self.last_record {
            write!(f, "Last record: #{} flags=0x{:02X}", rec.sequence, rec.status)?;
        } else {
            write!(f, "Last record: none")?;
        }
        Ok(())
    }
}

/// The `help` reply.
pub struct HelpReport;

impl fmt::Display for HelpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Available commands:")?;
        for (verb, what) in HELP {
            write!(f, "\n  {:<26} {}", verb, what)?;
        }
        Ok(())
    }
}
