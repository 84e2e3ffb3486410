//! Commands arriving from every producer, executed by the platform.

use std::thread;

use sensything::adapters::credentials::NetworkCredentials;
use sensything::adapters::dashboard::DashboardSink;
use sensything::app::model::SinkKind;
use sensything::app::ports::SinkAdapter;
use sensything::app::service::{Platform, SampleOutcome};
use sensything::config::PlatformConfig;
use sensything::error::{CommandError, SinkOpError};

use crate::mock_sinks::{MemoryCredentials, ScriptedDriver, SharedBroadcast};

fn platform() -> Platform {
    let driver = ScriptedDriver::new(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
    let mut p = Platform::new(Box::new(driver), &PlatformConfig::default());
    p.init_sensor().unwrap();
    p
}

fn attach_dashboard(p: &mut Platform, ws: &SharedBroadcast, creds: &MemoryCredentials) {
    let (ws, creds) = (ws.clone(), creds.clone());
    p.init_sink(SinkKind::NetworkDashboard, move |layout| {
        let sink = DashboardSink::new(ws, creds, layout).unwrap();
        Ok(Box::new(sink) as Box<dyn SinkAdapter>)
    })
    .unwrap();
}

// ── Producers ─────────────────────────────────────────────────

#[test]
fn dashboard_text_is_queued_then_executed() {
    let mut p = platform();
    let ws = SharedBroadcast::default();
    attach_dashboard(&mut p, &ws, &MemoryCredentials::default());
    ws.0.borrow_mut().text(3, "set_rate 50");

    let mut replies: Vec<String> = Vec::new();
    p.poll(0, &mut replies);
    assert_eq!(p.inbox().pending(), 1);
    assert_eq!(p.scheduler().interval_ms(), 100);

    p.poll(1, &mut replies);
    assert_eq!(p.inbox().pending(), 0);
    assert_eq!(p.scheduler().interval_ms(), 50);
    assert!(replies[0].starts_with("Sample interval set to 50 ms"));
}

#[test]
fn commands_from_another_thread_reach_the_loop() {
    let mut p = platform();
    let inbox = p.inbox();
    thread::spawn(move || {
        inbox.submit("start_all").unwrap();
    })
    .join()
    .unwrap();

    let mut replies: Vec<String> = Vec::new();
    p.poll(0, &mut replies);
    assert!(p.state().active);
    assert!(replies[0].starts_with("Started: none"));
}

#[test]
fn one_command_per_pass() {
    let mut p = platform();
    let inbox = p.inbox();
    inbox.submit("start_all").unwrap();
    inbox.submit("stop_all").unwrap();

    let mut replies: Vec<String> = Vec::new();
    p.poll(0, &mut replies);
    assert!(p.state().active);
    p.poll(1, &mut replies);
    assert!(!p.state().active);
    assert_eq!(replies.last().map(String::as_str), Some("All outputs stopped"));
}

// ── Replies ───────────────────────────────────────────────────

#[test]
fn unknown_command_suggests_help() {
    let mut p = platform();
    let mut replies: Vec<String> = Vec::new();
    p.handle_line("bogus now", 0, &mut replies);
    assert_eq!(
        replies,
        vec![
            "Unknown command: bogus".to_owned(),
            "Type 'help' for available commands".to_owned(),
        ]
    );
}

#[test]
fn blank_line_is_ignored() {
    let mut p = platform();
    assert!(p.execute_line("   ", 0).is_none());
}

#[test]
fn out_of_range_rate_keeps_interval() {
    let mut p = platform();
    assert!(matches!(
        p.execute_line("set_rate 5", 0),
        Some(Err(CommandError::OutOfRange(_)))
    ));
    assert_eq!(p.scheduler().interval_ms(), 100);
}

#[test]
fn reset_count_restarts_sequence() {
    let mut p = platform();
    p.start();
    for now in [100, 200, 300] {
        p.poll(now, &mut Vec::<String>::new());
    }
    assert_eq!(p.state().measurement_count, 3);

    assert_eq!(
        p.execute_line("reset_count", 300),
        Some(Ok("Measurement count reset".to_owned()))
    );
    p.poll(400, &mut Vec::<String>::new());
    assert_eq!(p.current_record().map(|r| r.sequence), Some(1));
}

#[test]
fn stop_all_halts_sampling() {
    let mut p = platform();
    p.execute_line("start_all", 0);
    p.execute_line("stop_all", 0);
    assert_eq!(p.poll(1_000, &mut Vec::<String>::new()), SampleOutcome::Idle);
}

// ── Credentials ───────────────────────────────────────────────

#[test]
fn forget_wifi_clears_stored_credentials() {
    let mut p = platform();
    let creds = MemoryCredentials::default();
    *creds.0.borrow_mut() = NetworkCredentials::new("lab", "hunter22");
    attach_dashboard(&mut p, &SharedBroadcast::default(), &creds);

    assert!(matches!(p.execute_line("clear_wifi", 0), Some(Ok(_))));
    assert!(creds.0.borrow().is_none());
}

#[test]
fn set_wifi_from_dashboard_provisions_the_store() {
    let mut p = platform();
    let creds = MemoryCredentials::default();
    let ws = SharedBroadcast::default();
    attach_dashboard(&mut p, &ws, &creds);
    ws.0.borrow_mut().text(1, "set_wifi lab hunter22");

    let mut replies: Vec<String> = Vec::new();
    p.poll(0, &mut replies);
    p.poll(1, &mut replies);
    assert_eq!(
        replies,
        vec!["Network credentials saved for 'lab'; restart to connect".to_owned()]
    );
    assert_eq!(*creds.0.borrow(), NetworkCredentials::new("lab", "hunter22"));

    assert!(matches!(
        p.execute_line("set_wifi lab two words", 2),
        Some(Err(CommandError::Usage(_)))
    ));
    assert_eq!(*creds.0.borrow(), NetworkCredentials::new("lab", "hunter22"));
}

#[test]
fn forget_wifi_without_dashboard_is_rejected() {
    let mut p = platform();
    assert!(matches!(
        p.execute_line("forget_wifi", 0),
        Some(Err(CommandError::Sink(SinkOpError::NotInitialized(
            SinkKind::NetworkDashboard
        ))))
    ));
}

#[test]
fn status_and_help_reply_line_by_line() {
    let mut p = platform();
    let mut replies: Vec<String> = Vec::new();
    p.handle_line("status", 0, &mut replies);
    assert_eq!(replies[0], "=== Sensything Status ===");
    assert!(replies.iter().any(|l| l == "Measurements: 0"));
    assert!(replies.iter().any(|l| l == "FileLog: not initialized"));

    replies.clear();
    p.handle_line("HELP", 0, &mut replies);
    assert_eq!(replies[0], "Available commands:");
    assert!(replies.iter().any(|l| l.trim_start().starts_with("forget_wifi")));
}
