//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives an [`IoService`] end to end
//! against the mock expander bus.  All tests run on the host with no real
//! hardware required.
//!
//! [`IoService`]: stateio::app::service::IoService

#![cfg(not(target_os = "espidf"))]

mod command_tests;
mod input_tests;
mod mock_hw;
mod persistence_tests;
