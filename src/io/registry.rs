//! Expander bus registry.
//!
//! Records which of the eight candidate PCF8575 addresses answered on a bus
//! at boot.  Every other component consults the registry before touching a
//! chip; an absent slot is never read, written or addressed.
//!
//! Bit *n* of the presence mask corresponds to position *n* of
//! [`CHIP_ADDRESSES`], not to the address value itself.

use log::{info, warn};

use crate::app::ports::ExpanderPort;
use crate::io::mapper::{self, MAX_CHIPS};

/// Probe order.  The board straps its expanders in this sequence, so slot 0
/// (channels 1..16) is the chip at 0x24.
pub const CHIP_ADDRESSES: [u8; MAX_CHIPS] = [0x24, 0x25, 0x21, 0x22, 0x26, 0x27, 0x20, 0x23];

/// Which of the two independent I2C buses a chip lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bus {
    /// Relay drivers.
    Output,
    /// Contact inputs.
    Input,
}

impl Bus {
    pub fn name(self) -> &'static str {
        match self {
            Self::Output => "output",
            Self::Input => "input",
        }
    }
}

/// One bit per chip slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresenceMask(u8);

impl PresenceMask {
    pub const EMPTY: Self = Self(0);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn set(&mut self, slot: usize) {
        if slot < MAX_CHIPS {
            self.0 |= 1 << slot;
        }
    }

    pub fn is_present(self, slot: usize) -> bool {
        slot < MAX_CHIPS && self.0 & (1 << slot) != 0
    }

    /// Number of chips that answered.
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Present slot positions in ascending order.
    pub fn slots(self) -> impl Iterator<Item = usize> {
        (0..MAX_CHIPS).filter(move |&slot| self.is_present(slot))
    }
}

/// Presence record for one bus.
pub struct BusRegistry {
    bus: Bus,
    mask: PresenceMask,
    discovered: bool,
}

impl BusRegistry {
    pub fn new(bus: Bus) -> Self {
        Self {
            bus,
            mask: PresenceMask::EMPTY,
            discovered: false,
        }
    }

    /// Probe every candidate address once and latch the result.
    ///
    /// Discovery happens at boot only; later calls keep the first result.
    pub fn discover(&mut self, hw: &mut impl ExpanderPort) -> PresenceMask {
        if self.discovered {
            warn!("registry: {} bus already scanned, keeping {:08b}", self.bus.name(), self.mask.bits());
            return self.mask;
        }

        info!("registry: scanning {} bus...", self.bus.name());
        for (slot, &address) in CHIP_ADDRESSES.iter().enumerate() {
            if hw.probe(self.bus, address) {
                self.mask.set(slot);
                info!(" - 0x{:02X}... PCF8575", address);
            } else {
                info!(" - 0x{:02X}... empty", address);
            }
        }
        for slot in self.mask.slots().filter(|&slot| !mapper::is_addressable(self.mask, slot)) {
            warn!(
                "registry: 0x{:02X} on {} bus sits past a gap and has no channels",
                CHIP_ADDRESSES[slot],
                self.bus.name()
            );
        }
        self.discovered = true;
        self.mask
    }

    pub fn presence(&self) -> PresenceMask {
        self.mask
    }

    pub fn is_present(&self, slot: usize) -> bool {
        self.mask.is_present(slot)
    }

    /// I2C address for a slot position.
    pub fn address(slot: usize) -> Option<u8> {
        CHIP_ADDRESSES.get(slot).copied()
    }

    /// Test and replay helper: mark slots present without probing hardware.
    pub fn with_presence(bus: Bus, mask: PresenceMask) -> Self {
        Self {
            bus,
            mask,
            discovered: true,
        }
    }
}
