//! Peripheral drivers.

pub mod pcf8575;
