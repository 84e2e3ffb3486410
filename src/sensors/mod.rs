//! Sensor boards: concrete [`SensorDriver`](crate::app::ports::SensorDriver)
//! implementations.
//!
//! Each board pairs an immutable [`BoardLayout`](crate::app::model::BoardLayout)
//! with a front-end trait, so the board logic (status bits, metadata,
//! channel mapping) is testable with a scripted front-end while the real
//! chip driver sits behind the same trait.
//!
//! | Board        | Front-end trait          | Chip driver          |
//! |--------------|--------------------------|----------------------|
//! | Capacitance  | [`CapacitanceFrontEnd`]  | [`fdc1004::Fdc1004`] |
//! | PulseOx      | [`PpgFrontEnd`]          | AFE4400 (external)   |

pub mod capacitance;
pub mod fdc1004;
pub mod pulse_ox;

pub use capacitance::{CapReading, CapacitanceBoard, CapacitanceFrontEnd};
pub use pulse_ox::{PpgFrontEnd, PpgSample, PulseOxBoard};
