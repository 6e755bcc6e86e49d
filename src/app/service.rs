//! Application service: the hexagonal core.
//!
//! [`IoService`] owns both channel controllers and the config dirty-flag.
//! It exposes a hardware-agnostic API; all I/O flows through port traits
//! injected at call sites, so the whole service runs against mocks.
//!
//! ```text
//!  ExpanderPort ◀─▶ ┌──────────────────────────┐ ──▶ EventSink
//!                   │        IoService          │
//!    ConfigPort ◀─▶ │  outputs · inputs · conf  │
//!                   └──────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::DeviceConfig;
use crate::io::input::InputController;
use crate::io::mapper::{ChipPin, PINS_PER_CHIP};
use crate::io::output::OutputController;
use crate::io::registry::PresenceMask;
use crate::io::taxonomy::{InputType, OutputType};

use super::adopt::Capacity;
use super::command_handler;
use super::commands::{CommandPayload, ConfigPayload, InputEntry, OutputEntry};
use super::config_handler::{self, ApplyReport};
use super::ports::{ConfigError, ConfigPort, EventSink, ExpanderPort};

// ───────────────────────────────────────────────────────────────
// IoService
// ───────────────────────────────────────────────────────────────

pub struct IoService {
    config: DeviceConfig,
    outputs: OutputController,
    inputs: InputController,
    config_dirty: bool,
    dirty_since_ms: u64,
}

impl IoService {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            outputs: OutputController::new(&config),
            inputs: InputController::new(&config),
            config,
            config_dirty: false,
            dirty_since_ms: 0,
        }
    }

    /// Build around already-known presence masks, skipping discovery.
    pub fn with_presence(config: DeviceConfig, outputs: PresenceMask, inputs: PresenceMask) -> Self {
        Self {
            outputs: OutputController::with_presence(&config, outputs),
            inputs: InputController::with_presence(&config, inputs),
            config,
            config_dirty: false,
            dirty_since_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Scan both buses.  Returns `(outputs, inputs)` presence.
    pub fn discover(&mut self, hw: &mut impl ExpanderPort) -> (PresenceMask, PresenceMask) {
        let out = self.outputs.discover(hw);
        let inp = self.inputs.discover(hw);
        info!(
            "IoService: {} output / {} input expander(s)",
            out.count(),
            inp.count()
        );
        (out, inp)
    }

    /// Replay the last saved configuration.  Call after [`discover`](Self::discover).
    pub fn restore(&mut self, storage: &impl ConfigPort) -> Option<ApplyReport> {
        match storage.load() {
            Ok(saved) => {
                let report = config_handler::apply_config(&saved, &mut self.outputs, &mut self.inputs);
                info!("IoService: restored config ({} applied, {} skipped)", report.applied, report.skipped);
                Some(report)
            }
            Err(ConfigError::NotFound) => {
                info!("IoService: no saved config, using defaults");
                None
            }
            Err(e) => {
                warn!("IoService: saved config unusable: {}", e);
                None
            }
        }
    }

    // ── Inbound payloads ──────────────────────────────────────

    /// Apply a raw config-topic payload.
    pub fn apply_config(&mut self, bytes: &[u8], now_ms: u64) -> ApplyReport {
        let payload = match ConfigPayload::from_slice(bytes) {
            Ok(p) => p,
            Err(e) => {
                warn!("config: payload dropped: {}", e);
                return ApplyReport { applied: 0, skipped: 1 };
            }
        };
        let report = config_handler::apply_config(&payload, &mut self.outputs, &mut self.inputs);
        if report.applied > 0 {
            self.mark_config_dirty(now_ms);
        }
        report
    }

    /// Apply a raw command-topic payload.  Every resulting event goes to `sink`.
    /// Returns the number of accepted entries.
    pub fn handle_command(
        &mut self,
        bytes: &[u8],
        now_ms: u64,
        hw: &mut impl ExpanderPort,
        sink: &mut impl EventSink,
    ) -> usize {
        let payload = match CommandPayload::from_slice(bytes) {
            Ok(p) => p,
            Err(e) => {
                warn!("command: payload dropped: {}", e);
                return 0;
            }
        };

        let mut accepted = 0;
        for raw in &payload.outputs {
            match command_handler::handle_output_command(raw, now_ms, &mut self.outputs, hw) {
                Ok(event) => {
                    accepted += 1;
                    if let Some(event) = event {
                        sink.emit(&event.into());
                    }
                }
                Err(e) => warn!("command: rejected: {}", e),
            }
        }
        accepted
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Advance output timers, then scan every input chip once.
    pub fn poll(&mut self, now_ms: u64, hw: &mut impl ExpanderPort, sink: &mut impl EventSink) {
        for event in self.outputs.process(now_ms, hw) {
            sink.emit(&event.into());
        }
        for event in self.inputs.poll(now_ms, hw) {
            sink.emit(&event.into());
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn outputs(&self) -> &OutputController {
        &self.outputs
    }

    pub fn inputs(&self) -> &InputController {
        &self.inputs
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn capacity(&self) -> Capacity {
        Capacity {
            max_output_index: self.outputs.max_index(),
            max_input_index: self.inputs.max_index(),
        }
    }

    /// Render the live channel configuration as a config payload.  Only
    /// channels that differ from power-on defaults are listed.
    pub fn effective_config(&self) -> ConfigPayload {
        let mut payload = ConfigPayload::default();
        let pins = self.outputs.pins_per_chip();
        if pins != PINS_PER_CHIP {
            payload.outputs_per_mcp = Some(pins as i64);
        }

        for slot in self.outputs.presence().slots() {
            for pin in 0..pins {
                let at = ChipPin::new(slot as u8, pin);
                let (Some(ch), Some(index)) = (self.outputs.channel(at), self.outputs.index_of(at)) else {
                    continue;
                };
                let mut entry = OutputEntry {
                    index: Some(index as i64),
                    ..OutputEntry::default()
                };
                if ch.kind != OutputType::default() {
                    entry.kind = Some(ch.kind.as_str().into());
                }
                if ch.timer_secs != self.config.default_timer_secs {
                    entry.timer_seconds = Some(Some(ch.timer_secs));
                }
                if ch.interlock != pin {
                    let partner = self.outputs.index_of(ChipPin::new(at.chip, ch.interlock));
                    entry.interlock_index = partner.map(|i| Some(i as i64));
                }
                if entry != (OutputEntry { index: entry.index, ..OutputEntry::default() }) {
                    payload.outputs.push(to_value(&entry));
                }
            }
        }

        for slot in self.inputs.presence().slots() {
            for pin in 0..PINS_PER_CHIP {
                let at = ChipPin::new(slot as u8, pin);
                let Some(ch) = self.inputs.channel(at) else {
                    continue;
                };
                if ch.kind == InputType::default() && !ch.invert && !ch.disabled {
                    continue;
                }
                let entry = InputEntry {
                    index: Some((slot as i64) * PINS_PER_CHIP as i64 + pin as i64 + 1),
                    kind: (ch.kind != InputType::default()).then(|| ch.kind.as_str().into()),
                    invert: ch.invert.then_some(true),
                    disabled: ch.disabled.then_some(true),
                };
                payload.inputs.push(to_value(&entry));
            }
        }
        payload
    }

    // ── Config dirty-flag management ──────────────────────────

    pub fn mark_config_dirty(&mut self, now_ms: u64) {
        // Every change restarts the quiet period.
        self.config_dirty = true;
        self.dirty_since_ms = now_ms;
    }

    /// Persist the effective config once it has been quiet for the save delay.
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, now_ms: u64, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        if now_ms.saturating_sub(self.dirty_since_ms) < self.config.config_save_delay_ms as u64 {
            return false;
        }
        match storage.save(&self.effective_config()) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config auto-saved");
                true
            }
            Err(e) => {
                warn!("Config auto-save failed: {}", e);
                false
            }
        }
    }

    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }
}

fn to_value<T: serde::Serialize>(entry: &T) -> serde_json::Value {
    serde_json::to_value(entry).unwrap_or(serde_json::Value::Null)
}
