//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives a [`Platform`] end to end
//! against mock drivers and transports.  All tests run on the host with
//! no real hardware required.
//!
//! [`Platform`]: sensything::app::service::Platform

mod acquisition_tests;
mod command_flow_tests;
mod file_log_tests;
mod mock_sinks;
