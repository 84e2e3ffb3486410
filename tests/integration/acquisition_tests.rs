//! Sampling and fan-out through the full platform.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use sensything::adapters::dashboard::DashboardSink;
use sensything::adapters::radio::RadioSink;
use sensything::app::model::SinkKind;
use sensything::app::ports::SinkAdapter;
use sensything::app::registry::FanOut;
use sensything::app::service::{Platform, SampleOutcome};
use sensything::config::PlatformConfig;

use crate::mock_sinks::{
    DeliveryLog, MemoryCredentials, Recorder, ScriptedDriver, SharedBroadcast, SharedNotifier,
};

const VALUES: [Option<f32>; 4] = [Some(1.2345), Some(-3.0), None, Some(0.0)];

fn platform(driver: ScriptedDriver) -> Platform {
    let mut p = Platform::new(Box::new(driver), &PlatformConfig::default());
    p.init_sensor().unwrap();
    p
}

fn add_recorder(p: &mut Platform, sink: Recorder) {
    let kind = sink.kind();
    p.init_sink(kind, move |_| Ok(Box::new(sink) as Box<dyn SinkAdapter>))
        .unwrap();
}

// ── One record, every wire format ─────────────────────────────

#[test]
fn record_reaches_radio_and_dashboard() {
    let mut p = platform(ScriptedDriver::new(&VALUES));

    let link = SharedNotifier::default();
    link.0.borrow_mut().subscribed = true;
    let ws = SharedBroadcast::default();
    ws.0.borrow_mut().connect(1);

    let radio = link.clone();
    p.init_sink(SinkKind::ShortRangeRadio, move |_| {
        Ok(Box::new(RadioSink::new(radio)) as Box<dyn SinkAdapter>)
    })
    .unwrap();
    let dash = ws.clone();
    p.init_sink(SinkKind::NetworkDashboard, move |layout| {
        let sink = DashboardSink::new(dash, MemoryCredentials::default(), layout).unwrap();
        Ok(Box::new(sink) as Box<dyn SinkAdapter>)
    })
    .unwrap();

    let mut replies: Vec<String> = Vec::new();
    p.handle_line("start_all", 0, &mut replies);
    assert!(replies[0].starts_with("Started: Radio, Dashboard"));

    let outcome = p.poll(500, &mut replies);
    assert_eq!(
        outcome,
        SampleOutcome::Distributed(FanOut {
            delivered: 2,
            failed: 0
        })
    );

    assert_eq!(
        link.0.borrow().sent,
        vec![vec![0x01, 0x00, 0xFD, 0xFF, 0x00, 0x00, 0x00, 0x00]]
    );

    let sent = &ws.0.borrow().sent;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, Some(1));
    assert!(sent[0].1.starts_with(r#"{"type":"init","board":"CUSTOM""#));
    assert_eq!(
        sent[1],
        (
            None,
            r#"{"ts":500,"cnt":1,"ch":[1.2345,-3.0,null,0.0],"flags":4}"#.to_owned()
        )
    );
}

#[test]
fn idle_transports_receive_nothing() {
    let mut p = platform(ScriptedDriver::new(&VALUES));
    let link = SharedNotifier::default();
    let ws = SharedBroadcast::default();

    let radio = link.clone();
    p.init_sink(SinkKind::ShortRangeRadio, move |_| {
        Ok(Box::new(RadioSink::new(radio)) as Box<dyn SinkAdapter>)
    })
    .unwrap();
    let dash = ws.clone();
    p.init_sink(SinkKind::NetworkDashboard, move |layout| {
        let sink = DashboardSink::new(dash, MemoryCredentials::default(), layout).unwrap();
        Ok(Box::new(sink) as Box<dyn SinkAdapter>)
    })
    .unwrap();

    let mut replies: Vec<String> = Vec::new();
    p.handle_line("start_all", 0, &mut replies);
    p.poll(100, &mut replies);

    assert!(link.0.borrow().sent.is_empty());
    assert!(ws.0.borrow().sent.is_empty());
    assert_eq!(p.state().measurement_count, 1);
}

// ── Fan-out ───────────────────────────────────────────────────

#[test]
fn fan_out_runs_in_fixed_order() {
    let mut p = platform(ScriptedDriver::new(&VALUES));
    let log: DeliveryLog = Rc::new(RefCell::new(Vec::new()));
    // Registration order must not matter.
    for kind in [
        SinkKind::MessageBroker,
        SinkKind::FileLog,
        SinkKind::Console,
        SinkKind::NetworkDashboard,
        SinkKind::ShortRangeRadio,
    ] {
        add_recorder(&mut p, Recorder::new(kind, &log));
    }
    p.start();
    for kind in SinkKind::ALL {
        p.set_sink_enabled(kind, true).unwrap();
    }

    p.poll(100, &mut Vec::<String>::new());

    let kinds: Vec<SinkKind> = log.borrow().iter().map(|(k, _)| *k).collect();
    assert_eq!(kinds, SinkKind::ALL.to_vec());
}

#[test]
fn failing_sink_does_not_block_the_others() {
    let mut p = platform(ScriptedDriver::new(&VALUES));
    let log: DeliveryLog = Rc::new(RefCell::new(Vec::new()));
    add_recorder(&mut p, Recorder::new(SinkKind::Console, &log));
    add_recorder(&mut p, Recorder::failing(SinkKind::ShortRangeRadio, &log));
    add_recorder(&mut p, Recorder::new(SinkKind::NetworkDashboard, &log));
    add_recorder(&mut p, Recorder::new(SinkKind::FileLog, &log));
    add_recorder(&mut p, Recorder::new(SinkKind::MessageBroker, &log));
    p.handle_line("start_all", 0, &mut Vec::<String>::new());

    let outcome = p.poll(100, &mut Vec::<String>::new());
    assert_eq!(
        outcome,
        SampleOutcome::Distributed(FanOut {
            delivered: 4,
            failed: 1
        })
    );
    assert_eq!(
        *log.borrow(),
        vec![
            (SinkKind::Console, 1),
            (SinkKind::NetworkDashboard, 1),
            (SinkKind::FileLog, 1),
            (SinkKind::MessageBroker, 1),
        ]
    );
    assert!(!p.registry().is_live(SinkKind::ShortRangeRadio));
    assert!(p.registry().is_enabled(SinkKind::ShortRangeRadio));
}

#[test]
fn disabled_sink_is_skipped() {
    let mut p = platform(ScriptedDriver::new(&VALUES));
    let log: DeliveryLog = Rc::new(RefCell::new(Vec::new()));
    add_recorder(&mut p, Recorder::new(SinkKind::Console, &log));
    add_recorder(&mut p, Recorder::new(SinkKind::FileLog, &log));
    p.handle_line("start_all", 0, &mut Vec::<String>::new());
    p.set_sink_enabled(SinkKind::FileLog, false).unwrap();

    p.poll(100, &mut Vec::<String>::new());
    assert_eq!(*log.borrow(), vec![(SinkKind::Console, 1)]);
}

// ── Long runs ─────────────────────────────────────────────────

#[test]
fn failed_reads_skip_cycles_without_gaps_in_sequence() {
    let driver = ScriptedDriver::new(&VALUES).failing_every(10);
    let reads = Rc::clone(&driver.reads);
    let mut p = platform(driver);
    let log: DeliveryLog = Rc::new(RefCell::new(Vec::new()));
    add_recorder(&mut p, Recorder::new(SinkKind::Console, &log));
    p.handle_line("start_all", 0, &mut Vec::<String>::new());

    let mut failures = 0;
    for tick in 1..=1000u32 {
        if p.poll(tick * 100, &mut Vec::<String>::new()) == SampleOutcome::ReadFailed {
            failures += 1;
        }
    }

    assert_eq!(*reads.borrow(), 1000);
    assert_eq!(failures, 100);
    assert_eq!(p.state().measurement_count, 900);

    let sequences: Vec<u32> = log.borrow().iter().map(|(_, s)| *s).collect();
    let unique: HashSet<u32> = sequences.iter().copied().collect();
    assert_eq!(unique.len(), 900);
    assert_eq!(sequences, (1..=900).collect::<Vec<_>>());
}

#[test]
fn sampling_honours_interval_between_polls() {
    let driver = ScriptedDriver::new(&VALUES);
    let reads = Rc::clone(&driver.reads);
    let mut p = platform(driver);
    p.start();

    for now in 0..=1000u32 {
        p.poll(now, &mut Vec::<String>::new());
    }
    // Due at 100, 200, ..., 1000.
    assert_eq!(*reads.borrow(), 10);
}

#[test]
fn sampling_survives_clock_wrap() {
    let driver = ScriptedDriver::new(&VALUES);
    let reads = Rc::clone(&driver.reads);
    let mut p = platform(driver);
    p.start();

    let start = u32::MAX - 250;
    for step in 0..=5u32 {
        p.poll(start.wrapping_add(step * 100), &mut Vec::<String>::new());
    }
    assert_eq!(*reads.borrow(), 6);
}

#[test]
fn inactive_platform_never_samples() {
    let driver = ScriptedDriver::new(&VALUES);
    let reads = Rc::clone(&driver.reads);
    let mut p = platform(driver);

    assert_eq!(p.poll(1_000, &mut Vec::<String>::new()), SampleOutcome::Idle);
    assert_eq!(*reads.borrow(), 0);
    assert!(p.current_record().is_none());
}
