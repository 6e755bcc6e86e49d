//! Application core: pure domain logic, zero I/O.
//!
//! Protocol handling for the config and command topics, event dispatch and
//! the service that ties the channel controllers together.  All interaction
//! with hardware happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod adopt;
pub mod command_handler;
pub mod commands;
pub mod config_handler;
pub mod dispatch;
pub mod events;
pub mod ports;
pub mod service;
