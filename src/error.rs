//! Unified error types for the StateIO firmware.
//!
//! One `Error` enum per failure category the controller distinguishes.
//! None of them is fatal: the offending request is dropped, a diagnostic is
//! logged, and the loop carries on.  All variants are `Copy` so they can be
//! returned from the hot polling path without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A logical channel index did not resolve to a present chip and pin.
    Address(AddressError),
    /// A request was well-addressed but semantically invalid.
    Validation(ValidationError),
    /// An expander transaction failed on the I2C bus.
    Bus(BusError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(e) => write!(f, "address: {e}"),
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::Bus(e) => write!(f, "bus: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Addressing errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressError {
    /// The request carried no `index` field.
    MissingIndex,
    /// Index is zero or negative (indices are 1-based).
    NotPositive,
    /// Index exceeds `present chips × pins per chip`.
    OutOfRange { index: i64, max: u16 },
    /// Index falls on a chip slot that did not answer discovery.
    AbsentChip { chip: u8 },
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIndex => write!(f, "missing index"),
            Self::NotPositive => write!(f, "invalid index (must be >= 1)"),
            Self::OutOfRange { index, max } => {
                write!(f, "invalid index {index} (max {max})")
            }
            Self::AbsentChip { chip } => write!(f, "no expander present in slot {chip}"),
        }
    }
}

impl From<AddressError> for Error {
    fn from(e: AddressError) -> Self {
        Self::Address(e)
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    InvalidOutputType,
    InvalidInputType,
    /// Interlock partner resolves to a different chip.
    CrossChipInterlock,
    /// Command `type` disagrees with the configured channel type.
    TypeMismatch,
    /// Command string is not `query`, `on` or `off`.
    InvalidCommand,
    /// Interlocked partner is energised; the channel may not switch on.
    InterlockEngaged,
    /// `outputsPerMcp` outside `1..=16`.
    InvalidPinsPerChip,
    /// The payload (or one of its entries) is not valid JSON of the expected shape.
    MalformedPayload,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOutputType => write!(f, "invalid output type"),
            Self::InvalidInputType => write!(f, "invalid input type"),
            Self::CrossChipInterlock => write!(f, "lock must be with pin on same expander"),
            Self::TypeMismatch => write!(f, "command type doesn't match configured type"),
            Self::InvalidCommand => write!(f, "invalid command"),
            Self::InterlockEngaged => write!(f, "interlocked output is on"),
            Self::InvalidPinsPerChip => write!(f, "outputsPerMcp must be 1-16"),
            Self::MalformedPayload => write!(f, "malformed payload"),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The chip did not acknowledge its address.
    Nack,
    /// Any other I2C failure (arbitration loss, bus fault, timeout).
    Other,
    /// The addressed slot has no driver (never discovered).
    NoDevice,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nack => write!(f, "no acknowledge"),
            Self::Other => write!(f, "I2C transaction failed"),
            Self::NoDevice => write!(f, "no device in slot"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
