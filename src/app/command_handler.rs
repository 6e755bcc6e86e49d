//! Command protocol handler.
//!
//! One entry of `outputs[]` on the command topic addresses one channel:
//!
//! - `type`, when present, must match the channel's configured type or the
//!   whole entry is rejected.
//! - `command` absent, `null` or `"query"` reports the current level.
//! - `"on"` / `"off"` actuate through the output controller.

use log::warn;

use crate::app::ports::ExpanderPort;
use crate::error::{AddressError, Error, ValidationError};
use crate::io::output::OutputController;
use crate::io::taxonomy::{Level, OutputType};

use super::commands::{decode_entry, OutputCommand};
use super::events::OutputEvent;

/// Apply one command entry.  `Ok(None)` means the command was accepted but
/// produced no publishable event.
pub fn handle_output_command(
    raw: &serde_json::Value,
    now_ms: u64,
    outputs: &mut OutputController,
    hw: &mut impl ExpanderPort,
) -> Result<Option<OutputEvent>, Error> {
    let cmd: OutputCommand = decode_entry(raw)?;
    let index = cmd.index.ok_or(AddressError::MissingIndex)?;
    let at = outputs.resolve(index)?;
    let kind = outputs
        .channel(at)
        .map(|ch| ch.kind)
        .ok_or(AddressError::AbsentChip { chip: at.chip })?;

    if let Some(requested) = cmd.kind.as_deref() {
        if OutputType::parse(requested) != Some(kind) {
            return Err(ValidationError::TypeMismatch.into());
        }
    }

    match cmd.command.as_deref() {
        None | Some("query") => {
            let level = outputs.read_level(at, hw);
            Ok(outputs.index_of(at).map(|index| OutputEvent { index, kind, level }))
        }
        Some("on") => outputs.handle_command(at, Level::On, now_ms, hw),
        Some("off") => outputs.handle_command(at, Level::Off, now_ms, hw),
        Some(other) => {
            warn!("command: unknown command '{}'", other);
            Err(ValidationError::InvalidCommand.into())
        }
    }
}
