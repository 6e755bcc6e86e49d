//! Channel index mapper.
//!
//! Pure arithmetic between a 1-based logical channel number and a
//! `(chip slot, pin)` coordinate:
//!
//! ```text
//!   chip = (index - 1) / divisor        index = chip * divisor + pin + 1
//!   pin  = (index - 1) % divisor
//! ```
//!
//! Outputs divide by the configurable pins-per-chip; inputs always divide by
//! [`PINS_PER_CHIP`].  The valid range is bounded by the number of chips that
//! answered discovery, never by a configured maximum.

use crate::error::AddressError;
use crate::io::registry::PresenceMask;

/// Every PCF8575 exposes 16 I/O pins.
pub const PINS_PER_CHIP: u8 = 16;

/// Up to 8 expanders share one I2C bus.
pub const MAX_CHIPS: usize = 8;

/// Physical coordinate of a channel: chip slot on its bus plus pin on that chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChipPin {
    pub chip: u8,
    pub pin: u8,
}

impl ChipPin {
    pub const fn new(chip: u8, pin: u8) -> Self {
        Self { chip, pin }
    }
}

/// Highest valid logical index for `presence` chips of `divisor` pins each.
pub fn max_index(presence: PresenceMask, divisor: u8) -> u16 {
    presence.count() as u16 * divisor as u16
}

/// Resolve a logical index to its chip slot and pin.
///
/// Fails when the index is not positive, exceeds the discovered capacity, or
/// lands on a slot that did not answer discovery.
pub fn resolve(index: i64, divisor: u8, presence: PresenceMask) -> Result<ChipPin, AddressError> {
    if index <= 0 {
        return Err(AddressError::NotPositive);
    }
    let max = max_index(presence, divisor);
    if index > max as i64 {
        return Err(AddressError::OutOfRange { index, max });
    }

    // max > 0 here, so divisor > 0.
    let zero_based = (index - 1) as u16;
    let chip = (zero_based / divisor as u16) as u8;
    let pin = (zero_based % divisor as u16) as u8;

    if !presence.is_present(chip as usize) {
        return Err(AddressError::AbsentChip { chip });
    }
    Ok(ChipPin { chip, pin })
}

/// Whether any logical index can land on `chip`.
///
/// The address space spans `count` chips, so a present chip sitting past a
/// gap in the probe order (slot >= count) has no channel numbers at all.
/// Such a chip is left idle: never scanned, never reported.
pub fn is_addressable(presence: PresenceMask, chip: usize) -> bool {
    presence.is_present(chip) && chip < presence.count() as usize
}

/// Inverse of [`resolve`].  `None` when the pin lies beyond `divisor`, i.e.
/// the channel has no logical number under the current layout.
pub fn to_index(at: ChipPin, divisor: u8) -> Option<u16> {
    if at.pin >= divisor {
        return None;
    }
    Some(at.chip as u16 * divisor as u16 + at.pin as u16 + 1)
}
