//! Input classifier.
//!
//! Turns successive 16-bit snapshots of each input expander into debounced
//! per-pin state changes, then into [`InputEvent`]s.
//!
//! ## Pipeline (per pin, per snapshot)
//!
//! 1. XOR with the pin's invert bit.
//! 2. Debounce: a new level must hold for `debounce_ms` before it is stable.
//! 3. On a stable edge, the configured type decides what (if anything) to
//!    report.  `button` pins also run a gesture machine that reports `hold`
//!    and multi-click counts from timing alone.
//! 4. Disabled pins are tracked but never reported.
//!
//! The first snapshot of each chip only seeds the stable levels; nothing is
//! reported for pins that were already active at boot.

use log::{info, warn};

use crate::app::events::InputEvent;
use crate::app::ports::ExpanderPort;
use crate::config::DeviceConfig;
use crate::error::AddressError;
use crate::io::mapper::{self, ChipPin, MAX_CHIPS, PINS_PER_CHIP};
use crate::io::registry::{Bus, BusRegistry, PresenceMask};
use crate::io::taxonomy::{self, InputState, InputType};

pub const MAX_INPUT_CHANNELS: usize = MAX_CHIPS * PINS_PER_CHIP as usize;

/// Written to every input chip at discovery so all pins float high.
const ALL_INPUTS: u16 = 0xFFFF;

/// Button gesture tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Idle,
    Pressed { since_ms: u64, clicks: u8, held: bool },
    Released { at_ms: u64, clicks: u8 },
}

/// Configuration view of one input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputChannel {
    pub kind: InputType,
    pub invert: bool,
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    debounce_ms: u64,
    hold_ms: u64,
    multi_click_ms: u64,
}

struct InputBank {
    kinds: [InputType; PINS_PER_CHIP as usize],
    invert: u16,
    disabled: u16,
    seeded: bool,
    /// Debounced levels, after inversion.
    stable: u16,
    /// Last observed levels, after inversion.
    candidate: u16,
    changed_at_ms: [u64; PINS_PER_CHIP as usize],
    gestures: [Gesture; PINS_PER_CHIP as usize],
}

impl InputBank {
    fn new() -> Self {
        Self {
            kinds: [InputType::default(); PINS_PER_CHIP as usize],
            invert: 0,
            disabled: 0,
            seeded: false,
            stable: 0,
            candidate: 0,
            changed_at_ms: [0; PINS_PER_CHIP as usize],
            gestures: [Gesture::Idle; PINS_PER_CHIP as usize],
        }
    }

    fn process(
        &mut self,
        raw: u16,
        now_ms: u64,
        timing: Timing,
    ) -> heapless::Vec<(u8, InputState), { PINS_PER_CHIP as usize }> {
        let mut out = heapless::Vec::new();
        let word = raw ^ self.invert;

        if !self.seeded {
            self.stable = word;
            self.candidate = word;
            self.changed_at_ms = [now_ms; PINS_PER_CHIP as usize];
            self.seeded = true;
            return out;
        }

        for pin in 0..PINS_PER_CHIP {
            let mask = 1u16 << pin;
            let p = pin as usize;

            if (word ^ self.candidate) & mask != 0 {
                self.candidate ^= mask;
                self.changed_at_ms[p] = now_ms;
            }

            let mut edge = None;
            if (self.candidate ^ self.stable) & mask != 0
                && now_ms.saturating_sub(self.changed_at_ms[p]) >= timing.debounce_ms
            {
                self.stable ^= mask;
                edge = Some(self.stable & mask != 0);
            }

            let state = match self.kinds[p] {
                InputType::Button => self.button(p, edge, now_ms, timing),
                InputType::Press | InputType::Toggle => match edge {
                    Some(false) => Some(InputState::Low),
                    _ => None,
                },
                _ => edge.map(|high| if high { InputState::High } else { InputState::Low }),
            };

            if self.disabled & mask != 0 {
                continue;
            }
            if let Some(state) = state {
                let _ = out.push((pin, state));
            }
        }
        out
    }

    fn button(&mut self, p: usize, edge: Option<bool>, now_ms: u64, t: Timing) -> Option<InputState> {
        let g = &mut self.gestures[p];
        match (*g, edge) {
            // Pressed.
            (Gesture::Idle, Some(false)) => {
                *g = Gesture::Pressed { since_ms: now_ms, clicks: 0, held: false };
                None
            }
            (Gesture::Released { at_ms, clicks }, Some(false)) => {
                let clicks = if now_ms.saturating_sub(at_ms) <= t.multi_click_ms { clicks } else { 0 };
                *g = Gesture::Pressed { since_ms: now_ms, clicks, held: false };
                None
            }
            // Released.
            (Gesture::Pressed { held: true, .. }, Some(true)) => {
                *g = Gesture::Idle;
                None
            }
            (Gesture::Pressed { clicks, .. }, Some(true)) => {
                *g = Gesture::Released { at_ms: now_ms, clicks: clicks.saturating_add(1) };
                None
            }
            // Timeouts.
            (Gesture::Pressed { since_ms, clicks, held: false }, None)
                if now_ms.saturating_sub(since_ms) >= t.hold_ms =>
            {
                *g = Gesture::Pressed { since_ms, clicks, held: true };
                Some(InputState::Hold)
            }
            (Gesture::Released { at_ms, clicks }, None)
                if now_ms.saturating_sub(at_ms) > t.multi_click_ms =>
            {
                *g = Gesture::Idle;
                Some(InputState::Clicks(clicks))
            }
            _ => None,
        }
    }
}

pub struct InputController {
    registry: BusRegistry,
    timing: Timing,
    banks: [InputBank; MAX_CHIPS],
}

impl InputController {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            registry: BusRegistry::new(Bus::Input),
            timing: Timing {
                debounce_ms: config.debounce_ms as u64,
                hold_ms: config.hold_ms as u64,
                multi_click_ms: config.multi_click_ms as u64,
            },
            banks: core::array::from_fn(|_| InputBank::new()),
        }
    }

    pub fn with_presence(config: &DeviceConfig, presence: PresenceMask) -> Self {
        let mut ctrl = Self::new(config);
        ctrl.registry = BusRegistry::with_presence(Bus::Input, presence);
        ctrl
    }

    /// Scan the input bus and release every pin of every chip found.
    pub fn discover(&mut self, hw: &mut impl ExpanderPort) -> PresenceMask {
        let presence = self.registry.discover(hw);
        for slot in presence.slots() {
            self.banks[slot] = InputBank::new();
            let Some(address) = BusRegistry::address(slot) else {
                continue;
            };
            if let Err(e) = hw.write_word(Bus::Input, address, ALL_INPUTS) {
                warn!("inputs: could not release 0x{:02X}: {}", address, e);
            }
        }
        info!(
            "inputs: {} expander(s), {} channels",
            presence.count(),
            self.max_index()
        );
        presence
    }

    pub fn presence(&self) -> PresenceMask {
        self.registry.presence()
    }

    pub fn max_index(&self) -> u16 {
        mapper::max_index(self.presence(), PINS_PER_CHIP)
    }

    pub fn resolve(&self, index: i64) -> Result<ChipPin, AddressError> {
        mapper::resolve(index, PINS_PER_CHIP, self.presence())
    }

    // ── Configuration ─────────────────────────────────────────

    pub fn channel(&self, at: ChipPin) -> Option<InputChannel> {
        if !self.registry.is_present(at.chip as usize) || at.pin >= PINS_PER_CHIP {
            return None;
        }
        let bank = &self.banks[at.chip as usize];
        let mask = 1u16 << at.pin;
        Some(InputChannel {
            kind: bank.kinds[at.pin as usize],
            invert: bank.invert & mask != 0,
            disabled: bank.disabled & mask != 0,
        })
    }

    fn bank_mut(&mut self, at: ChipPin) -> Result<&mut InputBank, AddressError> {
        if !self.registry.is_present(at.chip as usize) {
            return Err(AddressError::AbsentChip { chip: at.chip });
        }
        if at.pin >= PINS_PER_CHIP {
            return Err(AddressError::OutOfRange {
                index: at.pin as i64,
                max: PINS_PER_CHIP as u16,
            });
        }
        Ok(&mut self.banks[at.chip as usize])
    }

    pub fn set_type(&mut self, at: ChipPin, kind: InputType) -> Result<(), AddressError> {
        let bank = self.bank_mut(at)?;
        let p = at.pin as usize;
        if bank.kinds[p] != kind {
            bank.kinds[p] = kind;
            bank.gestures[p] = Gesture::Idle;
        }
        Ok(())
    }

    pub fn set_default_type(&mut self, kind: InputType) {
        for slot in self.presence().slots() {
            let bank = &mut self.banks[slot];
            bank.kinds = [kind; PINS_PER_CHIP as usize];
            bank.gestures = [Gesture::Idle; PINS_PER_CHIP as usize];
        }
    }

    /// Flipping inversion also flips the tracked levels, so the change itself
    /// is not reported as an edge.
    pub fn set_invert(&mut self, at: ChipPin, invert: bool) -> Result<(), AddressError> {
        let bank = self.bank_mut(at)?;
        let mask = 1u16 << at.pin;
        if (bank.invert & mask != 0) != invert {
            bank.invert ^= mask;
            bank.stable ^= mask;
            bank.candidate ^= mask;
        }
        Ok(())
    }

    pub fn set_disabled(&mut self, at: ChipPin, disabled: bool) -> Result<(), AddressError> {
        let bank = self.bank_mut(at)?;
        let mask = 1u16 << at.pin;
        if disabled {
            bank.disabled |= mask;
        } else {
            bank.disabled &= !mask;
        }
        bank.gestures[at.pin as usize] = Gesture::Idle;
        Ok(())
    }

    // ── Scanning ──────────────────────────────────────────────

    /// Feed one snapshot of a chip's pins.  Exposed for replay and tests;
    /// [`poll`](Self::poll) reads the hardware and calls this.
    pub fn process_word(
        &mut self,
        slot: usize,
        word: u16,
        now_ms: u64,
    ) -> heapless::Vec<InputEvent, { PINS_PER_CHIP as usize }> {
        let mut events = heapless::Vec::new();
        if !mapper::is_addressable(self.presence(), slot) {
            return events;
        }

        let bank = &mut self.banks[slot];
        for (pin, state) in bank.process(word, now_ms, self.timing) {
            let kind = bank.kinds[pin as usize];
            let Some(index) = mapper::to_index(ChipPin::new(slot as u8, pin), PINS_PER_CHIP) else {
                continue;
            };
            let (port, channel) = taxonomy::port_channel(index);
            let _ = events.push(InputEvent {
                port,
                channel,
                index,
                kind,
                state,
            });
        }
        events
    }

    /// Read every addressable input chip once.  A failed read skips that
    /// chip for this tick.
    pub fn poll(
        &mut self,
        now_ms: u64,
        hw: &mut impl ExpanderPort,
    ) -> heapless::Vec<InputEvent, MAX_INPUT_CHANNELS> {
        let mut events = heapless::Vec::new();
        let presence = self.presence();
        for slot in presence.slots().filter(|&slot| mapper::is_addressable(presence, slot)) {
            let Some(address) = BusRegistry::address(slot) else {
                continue;
            };
            match hw.read_word(Bus::Input, address) {
                Ok(word) => {
                    for event in self.process_word(slot, word, now_ms) {
                        let _ = events.push(event);
                    }
                }
                Err(e) => warn!("inputs: read of 0x{:02X} failed: {}", address, e),
            }
        }
        events
    }
}
