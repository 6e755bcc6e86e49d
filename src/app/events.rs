//! Outbound channel events.
//!
//! The controllers produce these; the [`IoService`](super::service::IoService)
//! hands them to the [`EventSink`](super::ports::EventSink).  The wire form is
//! the flat JSON object published on the status topic:
//!
//! ```text
//! output: {"index":17,"type":"timer","event":"on"}
//! input:  {"port":1,"channel":4,"index":4,"type":"switch","event":"off"}
//! ```

use serde::Serialize;

use crate::io::taxonomy::{self, InputState, InputType, Level, OutputType};

/// An output channel changed (or was queried).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputEvent {
    pub index: u16,
    pub kind: OutputType,
    pub level: Level,
}

impl OutputEvent {
    pub fn event(&self) -> &'static str {
        taxonomy::classify_output(self.kind, self.level)
    }
}

/// A classified input transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub port: u16,
    pub channel: u16,
    pub index: u16,
    pub kind: InputType,
    pub state: InputState,
}

impl InputEvent {
    pub fn event(&self) -> &'static str {
        taxonomy::classify_input(self.kind, self.state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoEvent {
    Output(OutputEvent),
    Input(InputEvent),
}

impl From<OutputEvent> for IoEvent {
    fn from(e: OutputEvent) -> Self {
        Self::Output(e)
    }
}

impl From<InputEvent> for IoEvent {
    fn from(e: InputEvent) -> Self {
        Self::Input(e)
    }
}

#[derive(Serialize)]
struct OutputWire {
    index: u16,
    #[serde(rename = "type")]
    kind: &'static str,
    event: &'static str,
}

#[derive(Serialize)]
struct InputWire {
    port: u16,
    channel: u16,
    index: u16,
    #[serde(rename = "type")]
    kind: &'static str,
    event: &'static str,
}

impl IoEvent {
    /// Render the status-topic payload.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Output(e) => serde_json::to_string(&OutputWire {
                index: e.index,
                kind: e.kind.as_str(),
                event: e.event(),
            }),
            Self::Input(e) => serde_json::to_string(&InputWire {
                port: e.port,
                channel: e.channel,
                index: e.index,
                kind: e.kind.as_str(),
                event: e.event(),
            }),
        }
    }
}
