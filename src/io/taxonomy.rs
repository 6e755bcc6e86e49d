//! Event taxonomy translator.
//!
//! Turns a raw transition plus the channel's configured type into the event
//! name published downstream.  Output events are simply `on` / `off`; input
//! events depend on the input type:
//!
//! | type     | raw state → event                                          |
//! |----------|------------------------------------------------------------|
//! | button   | hold → `hold`; clicks 1..5 → `single` … `penta`            |
//! | contact  | low → `closed`; high → `open`                              |
//! | press    | any → `press`                                              |
//! | rotary   | low → `up`; high → `down`                                  |
//! | security | high → `normal`; low → `alarm`; tamper/short/fault → same  |
//! | switch   | low → `on`; high → `off`                                   |
//! | toggle   | any → `toggle`                                             |
//!
//! Anything else renders as [`ERROR_EVENT`] and is still published.

use core::fmt;

/// Placeholder event for a `(type, state)` pair with no meaning.
pub const ERROR_EVENT: &str = "error";

/// Inputs are grouped four to a port for presentation.
pub const PINS_PER_PORT: u16 = 4;

// ───────────────────────────────────────────────────────────────
// Output side
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    #[default]
    Relay,
    Motor,
    Timer,
}

impl OutputType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "relay" => Some(Self::Relay),
            "motor" => Some(Self::Motor),
            "timer" => Some(Self::Timer),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relay => "relay",
            Self::Motor => "motor",
            Self::Timer => "timer",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical output level (polarity is applied by the output controller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Level {
    #[default]
    Off,
    On,
}

impl Level {
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

/// Output events do not depend on the output type.
pub fn classify_output(_kind: OutputType, level: Level) -> &'static str {
    match level {
        Level::On => "on",
        Level::Off => "off",
    }
}

// ───────────────────────────────────────────────────────────────
// Input side
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    Button,
    Contact,
    Press,
    Rotary,
    Security,
    #[default]
    Switch,
    Toggle,
}

impl InputType {
    pub const ALL: [Self; 7] = [
        Self::Button,
        Self::Contact,
        Self::Press,
        Self::Rotary,
        Self::Security,
        Self::Switch,
        Self::Toggle,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "button" => Some(Self::Button),
            "contact" => Some(Self::Contact),
            "press" => Some(Self::Press),
            "rotary" => Some(Self::Rotary),
            "security" => Some(Self::Security),
            "switch" => Some(Self::Switch),
            "toggle" => Some(Self::Toggle),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Contact => "contact",
            Self::Press => "press",
            Self::Rotary => "rotary",
            Self::Security => "security",
            Self::Switch => "switch",
            Self::Toggle => "toggle",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw state code reported by the input classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    /// Debounced level went low (active with pull-ups).
    Low,
    /// Debounced level went high.
    High,
    /// Button held past the hold threshold.
    Hold,
    /// Button released `n` times within the multi-click window.
    Clicks(u8),
    Tamper,
    Short,
    Fault,
}

pub fn classify_input(kind: InputType, state: InputState) -> &'static str {
    use InputState as S;
    use InputType as T;

    match (kind, state) {
        (T::Button, S::Hold) => "hold",
        (T::Button, S::Clicks(1)) => "single",
        (T::Button, S::Clicks(2)) => "double",
        (T::Button, S::Clicks(3)) => "triple",
        (T::Button, S::Clicks(4)) => "quad",
        (T::Button, S::Clicks(5)) => "penta",

        (T::Contact, S::Low) => "closed",
        (T::Contact, S::High) => "open",

        (T::Press, _) => "press",

        (T::Rotary, S::Low) => "up",
        (T::Rotary, S::High) => "down",

        (T::Security, S::High) => "normal",
        (T::Security, S::Low) => "alarm",
        (T::Security, S::Tamper) => "tamper",
        (T::Security, S::Short) => "short",
        (T::Security, S::Fault) => "fault",

        (T::Switch, S::Low) => "on",
        (T::Switch, S::High) => "off",

        (T::Toggle, _) => "toggle",

        _ => ERROR_EVENT,
    }
}

/// Presentation-only `(port, channel)` for an input index.
///
/// Fixed four-pins-per-port grouping; independent of pins-per-chip.
pub fn port_channel(index: u16) -> (u16, u16) {
    let port = (index.saturating_sub(1) / PINS_PER_PORT) + 1;
    let channel = index - (port - 1) * PINS_PER_PORT;
    (port, channel)
}
