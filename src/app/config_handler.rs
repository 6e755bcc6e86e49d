//! Configuration protocol handler.
//!
//! Applies a [`ConfigPayload`] to the two channel controllers, in this order:
//!
//! 1. `outputsPerMcp` (every output index depends on it)
//! 2. `defaultOutputType`
//! 3. `outputs[]` overrides
//! 4. `defaultInputType`
//! 5. `inputs[]` overrides
//!
//! Each list entry is validated on its own.  An invalid entry is skipped
//! with a diagnostic and leaves its channel untouched; the rest still apply.

use log::{debug, warn};

use crate::error::{AddressError, Error, ValidationError};
use crate::io::input::InputController;
use crate::io::output::OutputController;
use crate::io::taxonomy::{InputType, OutputType};

use super::commands::{decode_entry, ConfigPayload, InputEntry, OutputEntry};

/// Outcome of one payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: u16,
    pub skipped: u16,
}

impl ApplyReport {
    fn record(&mut self, what: &str, result: Result<(), Error>) {
        match result {
            Ok(()) => self.applied += 1,
            Err(e) => {
                warn!("config: {} skipped: {}", what, e);
                self.skipped += 1;
            }
        }
    }
}

pub fn apply_config(
    payload: &ConfigPayload,
    outputs: &mut OutputController,
    inputs: &mut InputController,
) -> ApplyReport {
    let mut report = ApplyReport {
        applied: 0,
        skipped: payload.rejected,
    };

    if let Some(pins) = payload.outputs_per_mcp {
        let result = u8::try_from(pins)
            .map_err(|_| ValidationError::InvalidPinsPerChip)
            .and_then(|pins| outputs.set_pins_per_chip(pins))
            .map_err(Error::from);
        report.record("outputsPerMcp", result);
    }

    if let Some(name) = payload.default_output_type.as_deref() {
        let result = OutputType::parse(name)
            .map(|kind| outputs.set_default_type(kind))
            .ok_or(Error::from(ValidationError::InvalidOutputType));
        report.record("defaultOutputType", result);
    }

    for raw in &payload.outputs {
        report.record("output entry", apply_output_entry(raw, outputs));
    }

    if let Some(name) = payload.default_input_type.as_deref() {
        let result = InputType::parse(name)
            .map(|kind| inputs.set_default_type(kind))
            .ok_or(Error::from(ValidationError::InvalidInputType));
        report.record("defaultInputType", result);
    }

    for raw in &payload.inputs {
        report.record("input entry", apply_input_entry(raw, inputs));
    }

    debug!("config: {} applied, {} skipped", report.applied, report.skipped);
    report
}

fn apply_output_entry(raw: &serde_json::Value, outputs: &mut OutputController) -> Result<(), Error> {
    let entry: OutputEntry = decode_entry(raw)?;
    let index = entry.index.ok_or(AddressError::MissingIndex)?;
    let at = outputs.resolve(index)?;

    // Validate every field before touching the channel.
    let kind = match entry.kind.as_deref() {
        Some(name) => Some(OutputType::parse(name).ok_or(ValidationError::InvalidOutputType)?),
        None => None,
    };
    let partner = match entry.interlock_index {
        None => None,
        Some(None) => Some(at),
        Some(Some(other)) => {
            let partner = outputs.resolve(other)?;
            if partner.chip != at.chip {
                return Err(ValidationError::CrossChipInterlock.into());
            }
            Some(partner)
        }
    };

    if let Some(kind) = kind {
        outputs.set_type(at, kind)?;
    }
    if let Some(secs) = entry.timer_seconds {
        outputs.set_timer(at, secs)?;
    }
    if let Some(partner) = partner {
        outputs.set_interlock(at, partner)?;
    }
    Ok(())
}

fn apply_input_entry(raw: &serde_json::Value, inputs: &mut InputController) -> Result<(), Error> {
    let entry: InputEntry = decode_entry(raw)?;
    let index = entry.index.ok_or(AddressError::MissingIndex)?;
    let at = inputs.resolve(index)?;

    let kind = match entry.kind.as_deref() {
        Some(name) => Some(InputType::parse(name).ok_or(ValidationError::InvalidInputType)?),
        None => None,
    };

    if let Some(kind) = kind {
        inputs.set_type(at, kind)?;
    }
    if let Some(invert) = entry.invert {
        inputs.set_invert(at, invert)?;
    }
    if let Some(disabled) = entry.disabled {
        inputs.set_disabled(at, disabled)?;
    }
    Ok(())
}
