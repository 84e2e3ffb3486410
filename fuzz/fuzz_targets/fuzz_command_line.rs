//! Fuzz target: command lines from untrusted producers.
//!
//! Feeds arbitrary bytes through the inbox and the command interpreter of
//! a live platform.  Must never panic, whatever the line does to sampling
//! or sink state.
#![no_main]

use libfuzzer_sys::fuzz_target;
use sensything::app::commands::Command;
use sensything::app::service::Platform;
use sensything::config::PlatformConfig;
use sensything::error::{HardwareError, ReadError};
use sensything::sensors::pulse_ox::{PpgFrontEnd, PpgSample, PulseOxBoard};

struct Flat;

impl PpgFrontEnd for Flat {
    fn init(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }

    fn sample(&mut self) -> Result<PpgSample, ReadError> {
        Ok(PpgSample {
            ir: 1_000,
            red: 900,
            spo2: 97.5,
            heart_rate: 64,
            overflow: false,
        })
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(board) = PulseOxBoard::new(Flat) else {
        return;
    };
    let mut platform = Platform::new(Box::new(board), &PlatformConfig::default());
    let _ = platform.init_sensor();
    let inbox = platform.inbox();
    let mut replies: Vec<String> = Vec::new();

    for (tick, line) in text.lines().enumerate() {
        let _ = Command::parse(line);
        let _ = inbox.submit(line);
        platform.poll(tick as u32 * 10, &mut replies);
    }
});
