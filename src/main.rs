//! StateIO firmware entry point.
//!
//! Single-threaded polling loop over a hexagonal core.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  I2cExpanders     MqttPublisher   NvsConfigStore   UptimeClock │
//! │  (ExpanderPort)   (StatusPub.)    (ConfigPort)                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              IoService (pure logic)                    │    │
//! │  │  outputs · inputs · config / command handlers          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Dispatcher (EventSink → MQTT, failover to log)                │
//! │  LogTee (serial log, mirrored to the MQTT log topic)           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The MQTT connection thread only forwards broker events over a channel;
//! every channel table is touched from this thread alone.
#![deny(unused_must_use)]

use std::sync::mpsc::TryRecvError;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::AnyIOPin;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::log::EspLogger;
use log::{debug, error, info, warn, LevelFilter};

use stateio::adapters::device_id::{self, MacAddress};
use stateio::adapters::expanders::I2cExpanders;
use stateio::adapters::log_tee::{self, LogTee};
use stateio::adapters::mqtt::{InboundKind, MqttMessage, MqttPublisher};
use stateio::adapters::nvs::NvsConfigStore;
use stateio::adapters::time::UptimeClock;
use stateio::adapters::wifi;
use stateio::app::adopt;
use stateio::app::dispatch::Dispatcher;
use stateio::app::service::IoService;
use stateio::config::DeviceConfig;
use stateio::pins;

fn restart(reason: &str) -> ! {
    error!("{}, restarting", reason);
    FreeRtos::delay_ms(1_000);
    esp_idf_svc::hal::reset::restart()
}

fn adoption_payload(service: &IoService, mac: &MacAddress) -> String {
    let network = serde_json::json!({
        "network": {
            "mode": "wifi",
            "mac": device_id::mac_display(mac).as_str(),
        }
    });
    adopt::adoption(service.capacity(), Some(network)).to_string()
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    let tee: &'static LogTee<EspLogger> = Box::leak(Box::new(LogTee::new(EspLogger::new(), LevelFilter::Info)));
    log::set_logger(tee)?;
    log::set_max_level(LevelFilter::Info);
    let (log_tx, log_rx) = log_tee::channel();
    tee.attach(log_tx);

    info!("╔══════════════════════════════════════╗");
    info!("║  {} v{}             ║", adopt::FW_SHORT_NAME, adopt::FW_VERSION);
    info!("╚══════════════════════════════════════╝");

    let config = DeviceConfig::default();
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Expander buses ─────────────────────────────────────
    let i2c_conf = I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ));
    // SAFETY: pins.rs is the only owner of these GPIO numbers.
    let (out_sda, out_scl, in_sda, in_scl) = unsafe {
        (
            AnyIOPin::new(pins::OUTPUT_I2C_SDA_GPIO),
            AnyIOPin::new(pins::OUTPUT_I2C_SCL_GPIO),
            AnyIOPin::new(pins::INPUT_I2C_SDA_GPIO),
            AnyIOPin::new(pins::INPUT_I2C_SCL_GPIO),
        )
    };
    let out_i2c = I2cDriver::new(peripherals.i2c0, out_sda, out_scl, &i2c_conf)?;
    let in_i2c = I2cDriver::new(peripherals.i2c1, in_sda, in_scl, &i2c_conf)?;
    let mut hw = I2cExpanders::new(out_i2c, in_i2c);

    // ── 3. Discovery, then replay saved config ────────────────
    let mut service = IoService::new(config.clone());
    service.discover(&mut hw);

    let store = match NvsConfigStore::new() {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("NVS init failed ({}), config will not persist this session", e);
            None
        }
    };
    if let Some(store) = &store {
        service.restore(store);
    }

    // ── 4. Identity ───────────────────────────────────────────
    let mac = device_id::read_mac();
    let client_id = device_id::client_id(&mac);
    info!("Client ID: {}", client_id);
    info!("Adopt: {}", adoption_payload(&service, &mac));

    // ── 5. Network (fatal if unreachable) ─────────────────────
    let (ssid, password) = match wifi::credentials() {
        Ok(c) => c,
        Err(e) => restart(&format!("WiFi: {}", e)),
    };
    let _wifi = match wifi::connect(peripherals.modem, sysloop, Some(nvs_partition), ssid, password) {
        Ok(w) => w,
        Err(e) => restart(&format!("WiFi connect failed: {}", e)),
    };

    let (mqtt, inbound) = MqttPublisher::connect(&config.mqtt_broker_url, &client_id)?;
    let topics = mqtt.topics().clone();
    let mut dispatcher = Dispatcher::new(mqtt);
    let mut connected = false;
    let clock = UptimeClock::new();

    info!("System ready. Entering poll loop.");

    // ── 6. Poll loop ──────────────────────────────────────────
    loop {
        let now_ms = clock.now_ms();

        // At most one inbound request per pass.
        match inbound.try_recv() {
            Ok(MqttMessage::Connected) => {
                dispatcher.publisher_mut().subscribe();
                dispatcher.adopt(&adoption_payload(&service, &mac));
                connected = true;
                info!("MQTT connected");
            }
            Ok(MqttMessage::Disconnected) => {
                connected = false;
                warn!("MQTT disconnected");
            }
            Ok(MqttMessage::Received { topic, payload }) => match topics.classify(&topic) {
                Some(InboundKind::Config) => {
                    service.apply_config(&payload, now_ms);
                }
                Some(InboundKind::Command) => {
                    service.handle_command(&payload, now_ms, &mut hw, &mut dispatcher);
                }
                None => debug!("MQTT: ignoring message on {}", topic),
            },
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => restart("MQTT connection thread ended"),
        }

        service.poll(now_ms, &mut hw, &mut dispatcher);

        if connected {
            dispatcher.drain_logs(&log_rx, log_tee::QUEUE_DEPTH);
        }

        if let Some(store) = &store {
            service.auto_save_if_needed(now_ms, store);
        }

        FreeRtos::delay_ms(config.poll_interval_ms);
    }
}
