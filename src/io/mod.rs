//! Channel model: addressing, presence, actuation and classification.

pub mod input;
pub mod mapper;
pub mod output;
pub mod registry;
pub mod taxonomy;
