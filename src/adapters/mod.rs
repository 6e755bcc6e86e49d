//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements      | Connects to                    |
//! |--------------|-----------------|--------------------------------|
//! | `expanders`  | ExpanderPort    | PCF8575s on two I2C buses      |
//! | `log_tee`    | log::Log        | serial logger + MQTT log topic |
//! | `mqtt`       | StatusPublisher | ESP-IDF MQTT client            |
//! | `nvs`        | ConfigPort      | NVS / in-memory store          |
//! | `time`       | n/a             | ESP32 system timer             |
//! | `device_id`  | n/a             | eFuse MAC → client id          |
//! | `wifi`       | n/a             | ESP-IDF WiFi STA               |

pub mod device_id;
pub mod expanders;
pub mod log_tee;
pub mod mqtt;
pub mod nvs;
pub mod time;
pub mod wifi;
