//! Sensything firmware library.
//!
//! Exposes the acquisition core, sink adapters and board drivers for
//! integration testing.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod pins;
pub mod scheduler;
pub mod sensors;
