//! Command interpreter.
//!
//! Applies a parsed [`Command`] to the platform's state, scheduler and
//! sink registry.  Every outcome is a reply line (or block); a rejected
//! command never changes state.

use log::info;

use crate::app::commands::Command;
use crate::app::model::{BoardLayout, MeasurementRecord, SinkKind, SystemState};
use crate::app::registry::SinkRegistry;
use crate::app::report::{HelpReport, StatusReport};
use crate::error::{CommandError, SinkOpError};
use crate::scheduler::SampleScheduler;

/// Everything a command may read or change, borrowed from the platform
/// for the duration of one command.
pub struct CommandContext<'a> {
    pub layout: &'a BoardLayout,
    pub state: &'a mut SystemState,
    pub scheduler: &'a mut SampleScheduler,
    pub registry: &'a mut SinkRegistry,
    pub last_record: Option<&'a MeasurementRecord>,
    pub now_ms: u32,
}

/// Parse and execute one line.  `None` for blank input.
pub fn interpret(line: &str, cx: &mut CommandContext<'_>) -> Option<Result<String, CommandError>> {
    match Command::parse(line) {
        Ok(None) => None,
        Ok(Some(cmd)) => Some(execute(cmd, cx)),
        Err(e) => Some(Err(e)),
    }
}

pub fn execute(cmd: Command, cx: &mut CommandContext<'_>) -> Result<String, CommandError> {
    match &cmd {
        Command::SetNetwork { ssid, .. } => info!("Command: SetNetwork {{ ssid: {:?} }}", ssid),
        _ => info!("Command: {:?}", cmd),
    }
    match cmd {
        Command::StartAll => Ok(start_all(cx)),
        Command::StopAll => {
            for kind in SinkKind::ALL {
                // Disabling never fails, initialized or not.
                let _ = cx.registry.set_enabled(kind, false);
            }
            cx.state.active = false;
            Ok("All outputs stopped".to_owned())
        }
        Command::Status => Ok(StatusReport::collect(
            cx.layout,
            cx.state,
            cx.scheduler,
            cx.registry,
            cx.last_record,
            cx.now_ms,
        )
        .to_string()),
        Command::Help => Ok(HelpReport.to_string()),
        Command::ResetCount => {
            cx.state.measurement_count = 0;
            Ok("Measurement count reset".to_owned())
        }
        Command::ToggleFileLog => {
            let enable = !cx.registry.is_enabled(SinkKind::FileLog);
            cx.registry
                .set_enabled(SinkKind::FileLog, enable)
                .map_err(SinkOpError::from)?;
            Ok(format!(
                "File logging {}",
                if enable { "enabled" } else { "disabled" }
            ))
        }
        Command::RotateFile => {
            if !cx.registry.is_initialized(SinkKind::FileLog) {
                return Err(SinkOpError::NotInitialized(SinkKind::FileLog).into());
            }
            if !cx.registry.is_enabled(SinkKind::FileLog) {
                return Err(CommandError::SinkDisabled(SinkKind::FileLog));
            }
            cx.registry.rotate_log(cx.now_ms)?;
            Ok("Log file rotated; next record opens a new file".to_owned())
        }
        Command::SetRate(ms) => {
            let hz = cx.scheduler.set_interval(ms)?;
            Ok(format!("Sample interval set to {} ms ({:.2} Hz)", ms, hz))
        }
        Command::ForgetNetwork => {
            cx.registry.forget_credentials()?;
            Ok("Network credentials cleared; restart to re-provision".to_owned())
        }
        Command::SetNetwork { ssid, password } => {
            cx.registry.store_credentials(&ssid, &password)?;
            Ok(format!("Network credentials saved for '{}'; restart to connect", ssid))
        }
    }
}

fn start_all(cx: &mut CommandContext<'_>) -> String {
    let mut started = Vec::new();
    let mut skipped = Vec::new();
    for kind in SinkKind::ALL {
        match cx.registry.set_enabled(kind, true) {
            Ok(()) => started.push(kind.name()),
            Err(_) => skipped.push(kind.name()),
        }
    }
    cx.state.active = true;

    let mut reply = format!("Started: {}", list_or_none(&started));
    if !skipped.is_empty() {
        reply.push_str(&format!("\nSkipped (not initialized): {}", skipped.join(", ")));
    }
    reply
}

fn list_or_none(names: &[&str]) -> String {
    if names.is_empty() {
        "none".to_owned()
    } else {
        names.join(", ")
    }
}
