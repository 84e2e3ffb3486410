//! Application core: acquisition loop and sink fan-out, zero direct I/O.
//!
//! This module contains the platform's rules: the board/record model, the
//! sink registry, the command vocabulary and the cooperative scheduler
//! loop.  All interaction with hardware and transports happens through
//! **port traits** defined in [`ports`] and beside each sink adapter,
//! keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod inbox;
pub mod interpreter;
pub mod model;
pub mod ports;
pub mod registry;
pub mod report;
pub mod service;
