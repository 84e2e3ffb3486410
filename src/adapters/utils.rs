//! Shared helpers for the sink adapters.
//!
//! Text sinks (console, file log, broker) render readings through
//! [`push_reading`] so every one of them prints the same invalid token
//! for a failed channel.

use core::fmt::Write;

use crate::app::model::{BoardId, BoardLayout};

/// Token text sinks print for a failed or inactive channel.
pub(super) const INVALID_TOKEN: &str = "NaN";

/// Append a reading with `decimals` places, or [`INVALID_TOKEN`].
pub(super) fn push_reading(out: &mut String, reading: Option<f32>, decimals: usize) {
    match reading {
        Some(v) => {
            let _ = write!(out, "{:.*}", decimals, v);
        }
        None => out.push_str(INVALID_TOKEN),
    }
}

/// Boards whose metadata bytes carry a per-channel CAPDAC code worth a
/// CSV column of its own.
pub(super) fn has_capdac_columns(layout: &BoardLayout) -> bool {
    layout.board() == BoardId::Capacitance
}

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
///
/// Used to validate stored network credentials.
pub(super) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}
