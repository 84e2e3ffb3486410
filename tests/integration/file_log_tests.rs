//! File log sink driven through the command surface and the scheduler.

use sensything::adapters::file_log::FileLogSink;
use sensything::app::model::SinkKind;
use sensything::app::ports::SinkAdapter;
use sensything::app::service::{Platform, SampleOutcome};
use sensything::config::PlatformConfig;
use sensything::error::{CommandError, SinkOpError};

use crate::mock_sinks::{MemoryMedium, ScriptedDriver};

fn platform(config: &PlatformConfig) -> Platform {
    let driver = ScriptedDriver::new(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
    let mut p = Platform::new(Box::new(driver), config);
    p.init_sensor().unwrap();
    p
}

fn attach_file_log(p: &mut Platform, medium: &MemoryMedium, config: &PlatformConfig) {
    let store = medium.clone();
    let cfg = config.file_log.clone();
    p.init_sink(SinkKind::FileLog, move |_| {
        Ok(Box::new(FileLogSink::open(store, &cfg)?) as Box<dyn SinkAdapter>)
    })
    .unwrap();
}

fn artifact_count(p: &Platform) -> u32 {
    p.registry().artifact().map_or(0, |a| a.count)
}

fn quiet() -> Vec<String> {
    Vec::new()
}

#[test]
fn rotate_requires_initialized_file_log() {
    let mut p = platform(&PlatformConfig::default());
    let result = p.execute_line("rotate_file", 0);
    assert!(matches!(
        result,
        Some(Err(CommandError::Sink(SinkOpError::NotInitialized(
            SinkKind::FileLog
        ))))
    ));
}

#[test]
fn rotate_requires_enabled_file_log() {
    let config = PlatformConfig::default();
    let mut p = platform(&config);
    attach_file_log(&mut p, &MemoryMedium::default(), &config);
    assert!(matches!(
        p.execute_line("rotate_file", 0),
        Some(Err(CommandError::SinkDisabled(SinkKind::FileLog)))
    ));
}

#[test]
fn toggle_then_rotate_opens_one_new_artifact() {
    let config = PlatformConfig::default();
    let medium = MemoryMedium::default();
    let mut p = platform(&config);
    attach_file_log(&mut p, &medium, &config);
    p.start();

    assert_eq!(
        p.execute_line("toggle_sd", 0),
        Some(Ok("File logging enabled".to_owned()))
    );

    p.poll(100, &mut quiet());
    let info = p.registry().artifact().unwrap();
    assert_eq!(info.count, 1);
    assert_eq!(info.current.as_deref(), Some("sensything_1.csv"));

    assert!(matches!(p.execute_line("rotate_file", 150), Some(Ok(_))));
    // Nothing is opened until the next record arrives.
    assert_eq!(artifact_count(&p), 1);
    assert!(p.registry().artifact().unwrap().current.is_none());

    p.poll(200, &mut quiet());
    assert_eq!(artifact_count(&p), 2);
    p.poll(300, &mut quiet());
    assert_eq!(artifact_count(&p), 2);

    let files = &medium.0.borrow().files;
    let first = &files["sensything_1.csv"];
    assert!(first.starts_with("timestamp,count,ch0,ch1,ch2,ch3"));
    assert_eq!(first.lines().count(), 2, "header plus the flushed record");
    assert!(files.contains_key("sensything_2.csv"));
}

#[test]
fn rotation_interval_closes_artifact() {
    let mut config = PlatformConfig::default();
    config.file_log.rotation_interval_ms = 1_000;
    let medium = MemoryMedium::default();
    let mut p = platform(&config);
    attach_file_log(&mut p, &medium, &config);
    p.handle_line("start_all", 0, &mut quiet());

    for now in (100..=1_000).step_by(100) {
        p.poll(now, &mut quiet());
    }
    assert_eq!(artifact_count(&p), 1);
    assert_eq!(p.registry().last_rotation_ms(), 1_000);

    p.poll(1_100, &mut quiet());
    assert_eq!(artifact_count(&p), 2);

    let files = &medium.0.borrow().files;
    assert_eq!(files["sensything_1.csv"].lines().count(), 11);
}

#[test]
fn ejected_medium_fails_delivery_until_reinserted() {
    let config = PlatformConfig::default();
    let medium = MemoryMedium::default();
    let mut p = platform(&config);
    attach_file_log(&mut p, &medium, &config);
    p.handle_line("start_all", 0, &mut quiet());

    p.poll(100, &mut quiet());
    assert!(p.registry().is_live(SinkKind::FileLog));

    medium.0.borrow_mut().ejected = true;
    let outcome = p.poll(200, &mut quiet());
    assert!(matches!(outcome, SampleOutcome::Distributed(f) if f.failed == 1));
    assert!(!p.registry().is_live(SinkKind::FileLog));

    medium.0.borrow_mut().ejected = false;
    let outcome = p.poll(300, &mut quiet());
    assert!(matches!(outcome, SampleOutcome::Distributed(f) if f.delivered == 1));
    assert!(p.registry().is_live(SinkKind::FileLog));
}

#[test]
fn shutdown_flushes_buffered_lines() {
    let config = PlatformConfig::default();
    let medium = MemoryMedium::default();
    let mut p = platform(&config);
    attach_file_log(&mut p, &medium, &config);
    p.handle_line("start_all", 0, &mut quiet());

    for now in [100, 200, 300] {
        p.poll(now, &mut quiet());
    }
    assert_eq!(medium.0.borrow().files["sensything_1.csv"].lines().count(), 1);

    p.shutdown();
    assert_eq!(medium.0.borrow().files["sensything_1.csv"].lines().count(), 4);
}
