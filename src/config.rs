//! Device configuration parameters
//!
//! Build-time tunables for the controller.  Per-channel behaviour (types,
//! timers, interlocks, inversion) is *not* here: it arrives over the config
//! topic and is owned by the channel controllers.

use serde::{Deserialize, Serialize};

/// Core device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Loop ---
    /// Delay between polling loop iterations (milliseconds)
    pub poll_interval_ms: u32,

    // --- Outputs ---
    /// Auto-revert delay applied when `timerSeconds` is reset (seconds)
    pub default_timer_secs: u32,
    /// Drive the expander pin low to energise a relay
    pub output_active_low: bool,

    // --- Inputs ---
    /// A raw level must be stable this long before it counts (milliseconds)
    pub debounce_ms: u32,
    /// Button held at least this long reports `hold` (milliseconds)
    pub hold_ms: u32,
    /// Maximum gap between clicks of one multi-click gesture (milliseconds)
    pub multi_click_ms: u32,

    // --- Persistence ---
    /// Quiet period after the last config change before it is saved (milliseconds)
    pub config_save_delay_ms: u32,

    // --- Network ---
    /// MQTT broker URL, e.g. `mqtt://192.168.1.10:1883`
    pub mqtt_broker_url: heapless::String<64>,
}

/// Auto-revert delay used when no `timerSeconds` has been configured.
pub const DEFAULT_TIMER_SECS: u32 = 60;

impl Default for DeviceConfig {
    fn default() -> Self {
        let mut mqtt_broker_url = heapless::String::new();
        let _ = mqtt_broker_url.push_str("mqtt://mqtt.local:1883");

        Self {
            // Loop
            poll_interval_ms: 5,

            // Outputs
            default_timer_secs: DEFAULT_TIMER_SECS,
            output_active_low: false,

            // Inputs
            debounce_ms: 20,
            hold_ms: 500,
            multi_click_ms: 250,

            // Persistence
            config_save_delay_ms: 5_000,

            mqtt_broker_url,
        }
    }
}
