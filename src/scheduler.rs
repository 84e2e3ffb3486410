//! Sampling scheduler.
//!
//! Pure timing decisions for the acquisition loop.  Time is a `u32`
//! millisecond counter that wraps roughly every 49.7 days; every check
//! uses wrapping subtraction so a sample falls due correctly across the
//! wrap.
//!
//! ```text
//!   now ─┐
//!        ├─▶ now.wrapping_sub(last) >= interval ─▶ due
//!   last ┘
//! ```
//!
//! The interval is bounded by the board's declared range; `set_interval`
//! refuses anything outside it and leaves the current value in place.

use crate::app::model::BoardLayout;
use crate::error::OutOfRange;
use log::info;

/// `true` once `period_ms` or more has passed since `since_ms`.
///
/// Shared by the sample, status and rotation timers.
pub fn has_elapsed(now_ms: u32, since_ms: u32, period_ms: u32) -> bool {
    now_ms.wrapping_sub(since_ms) >= period_ms
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleScheduler {
    interval_ms: u32,
    min_interval_ms: u32,
    max_interval_ms: u32,
}

impl SampleScheduler {
    /// Scheduler bounded by `layout`, starting at `default_interval_ms`
    /// clamped into the board's range.
    pub fn new(layout: &BoardLayout, default_interval_ms: u32) -> Self {
        Self::with_bounds(
            layout.min_interval_ms(),
            layout.max_interval_ms(),
            default_interval_ms,
        )
    }

    pub fn with_bounds(min_interval_ms: u32, max_interval_ms: u32, interval_ms: u32) -> Self {
        let min = min_interval_ms.max(1);
        let max = max_interval_ms.max(min);
        Self {
            interval_ms: interval_ms.clamp(min, max),
            min_interval_ms: min,
            max_interval_ms: max,
        }
    }

    /// Whether a sample is due at `now_ms` given the last sample time.
    pub fn is_due(&self, now_ms: u32, last_sample_ms: u32) -> bool {
        has_elapsed(now_ms, last_sample_ms, self.interval_ms)
    }

    /// Change the interval; returns the resulting rate in Hz.
    pub fn set_interval(&mut self, interval_ms: u32) -> Result<f32, OutOfRange> {
        if !(self.min_interval_ms..=self.max_interval_ms).contains(&interval_ms) {
            return Err(OutOfRange {
                requested: interval_ms,
                min: self.min_interval_ms,
                max: self.max_interval_ms,
            });
        }
        self.interval_ms = interval_ms;
        let hz = self.rate_hz();
        info!("Scheduler: interval set to {} ms ({:.2} Hz)", interval_ms, hz);
        Ok(hz)
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn rate_hz(&self) -> f32 {
        1000.0 / self.interval_ms as f32
    }

    pub fn bounds(&self) -> (u32, u32) {
        (self.min_interval_ms, self.max_interval_ms)
    }
}
