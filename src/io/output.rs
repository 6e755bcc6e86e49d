//! Output channel controller.
//!
//! Owns every relay channel on the output bus: its configured type, its
//! auto-revert delay, its interlock partner and its current level.  It is the
//! only code that writes the output expanders.
//!
//! ## Safety contract
//!
//! - A channel whose interlock partner is energised is never switched on;
//!   the command is rejected, not queued.
//! - A channel index only ever resolves to a present chip.
//! - Timer channels revert to off `timer_secs` after switching on, through
//!   the same path as an explicit `off` command.
//!
//! ## Timing
//!
//! [`OutputController::process`] compares deadlines against the caller's
//! monotonic clock.  Call it at least ten times per second so the revert
//! error stays within a tenth of the shortest (one second) timer.

use log::{debug, info, warn};

use crate::app::events::OutputEvent;
use crate::app::ports::ExpanderPort;
use crate::config::DeviceConfig;
use crate::error::{AddressError, BusError, Error, ValidationError};
use crate::io::mapper::{self, ChipPin, MAX_CHIPS, PINS_PER_CHIP};
use crate::io::registry::{Bus, BusRegistry, PresenceMask};
use crate::io::taxonomy::{Level, OutputType};

/// Upper bound on events one `process` call can produce.
pub const MAX_OUTPUT_CHANNELS: usize = MAX_CHIPS * PINS_PER_CHIP as usize;

/// Per-channel configuration and state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputChannel {
    pub kind: OutputType,
    pub timer_secs: u32,
    /// Partner pin on the same chip; equal to the channel's own pin when unlocked.
    pub interlock: u8,
    level: Level,
    revert_at_ms: Option<u64>,
}

impl OutputChannel {
    fn new(pin: u8, timer_secs: u32) -> Self {
        Self {
            kind: OutputType::Relay,
            timer_secs,
            interlock: pin,
            level: Level::Off,
            revert_at_ms: None,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Monotonic deadline of a pending auto-revert.
    pub fn revert_at_ms(&self) -> Option<u64> {
        self.revert_at_ms
    }
}

/// One output expander.
struct OutputBank {
    /// Logical on/off bits, one per pin.
    latch: u16,
    channels: [OutputChannel; PINS_PER_CHIP as usize],
}

impl OutputBank {
    fn new(timer_secs: u32) -> Self {
        Self {
            latch: 0,
            channels: core::array::from_fn(|pin| OutputChannel::new(pin as u8, timer_secs)),
        }
    }
}

pub struct OutputController {
    registry: BusRegistry,
    pins_per_chip: u8,
    default_timer_secs: u32,
    active_low: bool,
    banks: [OutputBank; MAX_CHIPS],
}

impl OutputController {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            registry: BusRegistry::new(Bus::Output),
            pins_per_chip: PINS_PER_CHIP,
            default_timer_secs: config.default_timer_secs,
            active_low: config.output_active_low,
            banks: core::array::from_fn(|_| OutputBank::new(config.default_timer_secs)),
        }
    }

    // ── Discovery ─────────────────────────────────────────────

    /// Scan the output bus and de-energise every pin of every chip found.
    pub fn discover(&mut self, hw: &mut impl ExpanderPort) -> PresenceMask {
        let presence = self.registry.discover(hw);
        for slot in presence.slots() {
            self.banks[slot] = OutputBank::new(self.default_timer_secs);
            if let Err(e) = self.write_latch(slot, hw) {
                warn!("outputs: could not clear slot {}: {}", slot, e);
            }
        }
        info!(
            "outputs: {} expander(s), {} channels",
            presence.count(),
            self.max_index()
        );
        presence
    }

    /// Adopt an already-known presence mask (replay, tests).
    pub fn with_presence(config: &DeviceConfig, presence: PresenceMask) -> Self {
        let mut ctrl = Self::new(config);
        ctrl.registry = BusRegistry::with_presence(Bus::Output, presence);
        ctrl
    }

    // ── Addressing ────────────────────────────────────────────

    pub fn presence(&self) -> PresenceMask {
        self.registry.presence()
    }

    pub fn pins_per_chip(&self) -> u8 {
        self.pins_per_chip
    }

    /// Re-dimension the output address space.  Every logical index changes
    /// meaning immediately.
    pub fn set_pins_per_chip(&mut self, pins: u8) -> Result<(), ValidationError> {
        if !(1..=PINS_PER_CHIP).contains(&pins) {
            return Err(ValidationError::InvalidPinsPerChip);
        }
        if pins != self.pins_per_chip {
            info!("outputs: {} pins per expander (was {})", pins, self.pins_per_chip);
        }
        self.pins_per_chip = pins;
        Ok(())
    }

    pub fn max_index(&self) -> u16 {
        mapper::max_index(self.presence(), self.pins_per_chip)
    }

    pub fn resolve(&self, index: i64) -> Result<ChipPin, AddressError> {
        mapper::resolve(index, self.pins_per_chip, self.presence())
    }

    pub fn index_of(&self, at: ChipPin) -> Option<u16> {
        if !mapper::is_addressable(self.presence(), at.chip as usize) {
            return None;
        }
        mapper::to_index(at, self.pins_per_chip)
    }

    // ── Configuration ─────────────────────────────────────────

    pub fn channel(&self, at: ChipPin) -> Option<&OutputChannel> {
        if !self.registry.is_present(at.chip as usize) {
            return None;
        }
        self.banks[at.chip as usize].channels.get(at.pin as usize)
    }

    fn channel_mut(&mut self, at: ChipPin) -> Result<&mut OutputChannel, AddressError> {
        if !self.registry.is_present(at.chip as usize) {
            return Err(AddressError::AbsentChip { chip: at.chip });
        }
        self.banks[at.chip as usize]
            .channels
            .get_mut(at.pin as usize)
            .ok_or(AddressError::OutOfRange {
                index: at.pin as i64,
                max: PINS_PER_CHIP as u16,
            })
    }

    pub fn set_type(&mut self, at: ChipPin, kind: OutputType) -> Result<(), AddressError> {
        self.channel_mut(at)?.kind = kind;
        Ok(())
    }

    /// Apply one type to every addressable channel of every present chip.
    pub fn set_default_type(&mut self, kind: OutputType) {
        let pins = self.pins_per_chip as usize;
        for slot in self.presence().slots() {
            for ch in self.banks[slot].channels.iter_mut().take(pins) {
                ch.kind = kind;
            }
        }
    }

    /// `None` restores the default delay rather than zero.
    pub fn set_timer(&mut self, at: ChipPin, secs: Option<u32>) -> Result<(), AddressError> {
        let default = self.default_timer_secs;
        self.channel_mut(at)?.timer_secs = secs.unwrap_or(default);
        Ok(())
    }

    /// Lock `at` against `partner`.  `partner == at` unlocks.
    ///
    /// The partner's own lock is left alone; one-way locks are allowed.
    pub fn set_interlock(&mut self, at: ChipPin, partner: ChipPin) -> Result<(), Error> {
        if partner.chip != at.chip {
            return Err(ValidationError::CrossChipInterlock.into());
        }
        if partner.pin >= PINS_PER_CHIP {
            return Err(AddressError::OutOfRange {
                index: partner.pin as i64,
                max: PINS_PER_CHIP as u16,
            }
            .into());
        }
        self.channel_mut(at)?.interlock = partner.pin;
        Ok(())
    }

    // ── Actuation ─────────────────────────────────────────────

    /// Level as last written.
    pub fn level(&self, at: ChipPin) -> Level {
        self.channel(at).map_or(Level::Off, OutputChannel::level)
    }

    /// Level as read back from the chip; falls back to the latch when the
    /// read fails.
    pub fn read_level(&self, at: ChipPin, hw: &mut impl ExpanderPort) -> Level {
        let Some(address) = BusRegistry::address(at.chip as usize) else {
            return Level::Off;
        };
        match hw.read_word(Bus::Output, address) {
            Ok(word) => {
                let high = word & (1 << at.pin) != 0;
                if high != self.active_low { Level::On } else { Level::Off }
            }
            Err(e) => {
                warn!("outputs: read-back of 0x{:02X} failed ({}), using latch", address, e);
                self.level(at)
            }
        }
    }

    /// Request a level change on one channel.
    ///
    /// Returns the event to publish, or `None` when the channel has no
    /// logical index under the current pins-per-chip.
    pub fn handle_command(
        &mut self,
        at: ChipPin,
        level: Level,
        now_ms: u64,
        hw: &mut impl ExpanderPort,
    ) -> Result<Option<OutputEvent>, Error> {
        let ch = self.channel(at).ok_or(AddressError::AbsentChip { chip: at.chip })?;

        if level.is_on() && ch.interlock != at.pin {
            let partner = self.banks[at.chip as usize].channels[ch.interlock as usize];
            if partner.level.is_on() {
                warn!(
                    "outputs: {}/{} blocked, interlocked pin {} is on",
                    at.chip, at.pin, ch.interlock
                );
                return Err(ValidationError::InterlockEngaged.into());
            }
        }

        self.drive(at, level, now_ms, hw)
    }

    /// Advance pending auto-reverts.  Each expired Timer channel is switched
    /// off as if an `off` command had arrived.
    pub fn process(
        &mut self,
        now_ms: u64,
        hw: &mut impl ExpanderPort,
    ) -> heapless::Vec<OutputEvent, MAX_OUTPUT_CHANNELS> {
        let mut events = heapless::Vec::new();
        let presence = self.presence();

        for slot in presence.slots().filter(|&slot| mapper::is_addressable(presence, slot)) {
            for pin in 0..PINS_PER_CHIP {
                let ch = &mut self.banks[slot].channels[pin as usize];
                let Some(deadline) = ch.revert_at_ms else {
                    continue;
                };
                if ch.kind != OutputType::Timer {
                    debug!("outputs: {}/{} no longer a timer, dropping revert", slot, pin);
                    ch.revert_at_ms = None;
                    continue;
                }
                if now_ms < deadline {
                    continue;
                }

                let at = ChipPin::new(slot as u8, pin);
                match self.drive(at, Level::Off, now_ms, hw) {
                    Ok(Some(event)) => {
                        let _ = events.push(event);
                    }
                    Ok(None) => {
                        warn!("outputs: {}/{} reverted outside the channel range", slot, pin);
                    }
                    // Deadline stays armed; retried next tick.
                    Err(e) => warn!("outputs: revert of {}/{} failed: {}", slot, pin, e),
                }
            }
        }
        events
    }

    // ── Internal ──────────────────────────────────────────────

    fn drive(
        &mut self,
        at: ChipPin,
        level: Level,
        now_ms: u64,
        hw: &mut impl ExpanderPort,
    ) -> Result<Option<OutputEvent>, Error> {
        let slot = at.chip as usize;
        let mask = 1u16 << at.pin;
        let previous = self.banks[slot].latch;

        self.banks[slot].latch = if level.is_on() {
            previous | mask
        } else {
            previous & !mask
        };
        if let Err(e) = self.write_latch(slot, hw) {
            self.banks[slot].latch = previous;
            return Err(e.into());
        }

        let ch = &mut self.banks[slot].channels[at.pin as usize];
        ch.level = level;
        ch.revert_at_ms = if level.is_on() && ch.kind == OutputType::Timer {
            Some(now_ms.saturating_add(ch.timer_secs as u64 * 1000))
        } else {
            None
        };
        let kind = ch.kind;

        Ok(self.index_of(at).map(|index| OutputEvent { index, kind, level }))
    }

    fn write_latch(&self, slot: usize, hw: &mut impl ExpanderPort) -> Result<(), BusError> {
        let address = BusRegistry::address(slot).ok_or(BusError::NoDevice)?;
        let latch = self.banks[slot].latch;
        let word = if self.active_low { !latch } else { latch };
        hw.write_word(Bus::Output, address, word)
    }
}
