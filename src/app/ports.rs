//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ IoService (domain)
//! ```
//!
//! Driven adapters (I2C expanders, MQTT, NVS) implement these traits.  The
//! [`IoService`](super::service::IoService) consumes them via generics, so
//! the domain core never touches hardware directly.

use crate::error::BusError;
use crate::io::registry::Bus;

use super::commands::ConfigPayload;
use super::events::IoEvent;

// ───────────────────────────────────────────────────────────────
// Expander port (driven adapter: domain ↔ I2C expanders)
// ───────────────────────────────────────────────────────────────

/// Word-level access to the PCF8575 expanders on both buses.
///
/// Bit *n* of a word is pin *n* of the chip.  Implementations must not
/// retry; a failed transaction is reported once and the caller decides.
pub trait ExpanderPort {
    /// Does a chip acknowledge `address` on `bus`?
    fn probe(&mut self, bus: Bus, address: u8) -> bool;

    /// Read all 16 pin levels.
    fn read_word(&mut self, bus: Bus, address: u8) -> Result<u16, BusError>;

    /// Drive all 16 pins.
    fn write_word(&mut self, bus: Bus, address: u8, word: u16) -> Result<(), BusError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → dispatcher)
// ───────────────────────────────────────────────────────────────

/// The domain hands every classified [`IoEvent`] to exactly one sink.
pub trait EventSink {
    fn emit(&mut self, event: &IoEvent);
}

// ───────────────────────────────────────────────────────────────
// Publish port (dispatcher → message bus)
// ───────────────────────────────────────────────────────────────

/// Publish-with-acknowledgement primitive.  `false` means the payload was
/// not accepted; the caller logs it and moves on.
pub trait StatusPublisher {
    /// Publish an event payload on the status topic.
    fn publish_status(&mut self, payload: &str) -> bool;

    /// Publish the device adoption description.
    fn publish_adopt(&mut self, payload: &str) -> bool;

    /// Publish one diagnostic line on the log topic.
    fn publish_log(&mut self, line: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the effective channel configuration.
pub trait ConfigPort {
    /// Load the last saved configuration.
    /// Returns [`ConfigError::NotFound`] on first boot.
    fn load(&self) -> Result<ConfigPayload, ConfigError>;

    fn save(&self, config: &ConfigPayload) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
