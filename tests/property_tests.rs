//! Property tests for the scheduler arithmetic, the command parser and
//! the record formatters.
//!
//! Runs on host (x86_64) only; proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;
use sensything::adapters::{dashboard, file_log, radio};
use sensything::app::commands::Command;
use sensything::app::inbox::{COMMAND_QUEUE_DEPTH, CommandInbox, InboxError, MAX_COMMAND_LEN};
use sensything::app::model::{MAX_CHANNELS, MeasurementRecord};
use sensything::error::CommandError;
use sensything::scheduler::{SampleScheduler, has_elapsed};
use sensything::sensors::{capacitance, pulse_ox};

// ── Scheduler ─────────────────────────────────────────────────

proptest! {
    /// Elapsed time is measured modulo 2^32, so a timer armed just before
    /// the counter wraps fires exactly `period` ticks later.
    #[test]
    fn elapsed_is_wrap_invariant(since in any::<u32>(), period in 1u32..=3_600_000, extra in 0u32..1_000) {
        let due = since.wrapping_add(period);
        prop_assert!(has_elapsed(due, since, period));
        prop_assert!(has_elapsed(due.wrapping_add(extra), since, period));
        prop_assert!(!has_elapsed(due.wrapping_sub(1), since, period));
    }

    #[test]
    fn set_interval_accepts_exactly_the_range(
        min in 1u32..1_000,
        span in 0u32..10_000,
        requested in 0u32..20_000,
    ) {
        let max = min + span;
        let mut s = SampleScheduler::with_bounds(min, max, min);
        let result = s.set_interval(requested);

        if (min..=max).contains(&requested) {
            prop_assert!(result.is_ok());
            prop_assert_eq!(s.interval_ms(), requested);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(s.interval_ms(), min, "rejected rate must not change the interval");
        }
    }
}

// ── Command parsing ───────────────────────────────────────────

proptest! {
    /// The parser is total: any printable line parses or yields an error,
    /// never panics, and whitespace-only input is ignored.
    #[test]
    fn parse_never_panics(line in "[ -~]{0,80}") {
        let result = Command::parse(&line);
        if line.trim().is_empty() {
            prop_assert_eq!(result, Ok(None));
        }
    }

    #[test]
    fn set_rate_parses_any_u32(ms in any::<u32>(), pad in " {0,3}") {
        let line = format!("{pad}SET_RATE {ms}{pad}");
        prop_assert_eq!(Command::parse(&line), Ok(Some(Command::SetRate(ms))));
    }

    #[test]
    fn non_numeric_rate_is_invalid(arg in "[a-z]{1,10}") {
        let line = format!("set_rate {arg}");
        prop_assert!(matches!(Command::parse(&line), Err(CommandError::InvalidArgument(_))));
    }
}

// ── Inbox ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn inbox_is_bounded(lines in proptest::collection::vec("[a-z_ ]{0,80}", 0..32)) {
        let inbox = CommandInbox::new();
        for line in &lines {
            match inbox.submit(line) {
                Ok(()) => prop_assert!(line.trim().len() <= MAX_COMMAND_LEN),
                Err(InboxError::TooLong) => prop_assert!(line.trim().len() > MAX_COMMAND_LEN),
                Err(InboxError::Full) => prop_assert_eq!(inbox.pending(), COMMAND_QUEUE_DEPTH),
            }
            prop_assert!(inbox.pending() <= COMMAND_QUEUE_DEPTH);
        }
    }
}

// ── Record formatters ─────────────────────────────────────────

fn arb_value() -> impl Strategy<Value = Option<f32>> {
    prop_oneof![
        4 => any::<f32>().prop_map(Some),
        1 => Just(None),
    ]
}

proptest! {
    /// Every CSV line has as many fields as the header, whatever the values.
    #[test]
    fn csv_line_matches_header_width(
        values in proptest::collection::vec(arb_value(), 4),
        ts in any::<u32>(),
        seq in any::<u32>(),
    ) {
        let layout = capacitance::layout().unwrap();
        let mut rec = MeasurementRecord::for_layout(ts, &layout);
        rec.sequence = seq;
        for (i, v) in values.iter().enumerate() {
            match v {
                Some(v) => rec.set_channel(i, *v),
                None => rec.mark_failed(i),
            }
        }
        let header = file_log::format_header(&layout);
        let line = file_log::format_line(&rec, &layout);
        prop_assert_eq!(header.split(',').count(), line.split(',').count());
    }

    /// Radio payloads are two bytes per channel and dashboard frames are
    /// always valid JSON, even for non-finite readings.
    #[test]
    fn wire_formats_hold_for_any_reading(values in proptest::collection::vec(arb_value(), 4)) {
        let layout = pulse_ox::layout().unwrap();
        let mut rec = MeasurementRecord::for_layout(1, &layout);
        for (i, v) in values.iter().enumerate() {
            match v {
                Some(v) => rec.set_channel(i, *v),
                None => rec.mark_failed(i),
            }
        }

        let payload = radio::encode_payload(&rec, &layout);
        prop_assert_eq!(payload.len(), 2 * layout.channel_count().min(MAX_CHANNELS));

        let frame = dashboard::format_frame(&rec, &layout).unwrap();
        prop_assert!(serde_json::from_str::<serde_json::Value>(&frame).is_ok());
    }
}
