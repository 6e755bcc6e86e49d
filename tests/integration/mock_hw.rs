//! Mock expander buses and sinks for integration tests.
//!
//! Records every bus write so tests can assert on exactly what reached the
//! PCF8575s without an I2C peripheral.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use stateio::app::commands::ConfigPayload;
use stateio::app::events::IoEvent;
use stateio::app::ports::{ConfigError, ConfigPort, EventSink, ExpanderPort, StatusPublisher};
use stateio::error::BusError;
use stateio::io::registry::{Bus, CHIP_ADDRESSES};

// ── MockBus ───────────────────────────────────────────────────

pub struct MockBus {
    present: HashSet<(Bus, u8)>,
    /// Chips that answered discovery but now fail every read.
    unreadable: HashSet<(Bus, u8)>,
    /// Last word written to, or injected for, each chip.
    words: HashMap<(Bus, u8), u16>,
    pub writes: Vec<(Bus, u8, u16)>,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockBus {
    /// `outputs` / `inputs` chips answer on the first N slot addresses.
    pub fn with_chips(outputs: usize, inputs: usize) -> Self {
        let outputs: Vec<usize> = (0..outputs).collect();
        let inputs: Vec<usize> = (0..inputs).collect();
        Self::with_slots(&outputs, &inputs)
    }

    /// Chips answer only at the listed slot positions.
    pub fn with_slots(outputs: &[usize], inputs: &[usize]) -> Self {
        let mut present = HashSet::new();
        for &slot in outputs {
            present.insert((Bus::Output, CHIP_ADDRESSES[slot]));
        }
        for &slot in inputs {
            present.insert((Bus::Input, CHIP_ADDRESSES[slot]));
        }
        Self {
            present,
            unreadable: HashSet::new(),
            words: HashMap::new(),
            writes: Vec::new(),
            fail_writes: false,
        }
    }

    pub fn word(&self, bus: Bus, slot: usize) -> Option<u16> {
        self.words.get(&(bus, CHIP_ADDRESSES[slot])).copied()
    }

    /// Drive the pins an input chip will report on its next read.
    pub fn set_input(&mut self, slot: usize, word: u16) {
        self.words.insert((Bus::Input, CHIP_ADDRESSES[slot]), word);
    }

    /// Make reads of an input chip fail (`true`) or succeed again.
    pub fn set_unreadable(&mut self, slot: usize, failing: bool) {
        let key = (Bus::Input, CHIP_ADDRESSES[slot]);
        if failing {
            self.unreadable.insert(key);
        } else {
            self.unreadable.remove(&key);
        }
    }

    pub fn output_writes(&self) -> usize {
        self.writes.iter().filter(|(bus, _, _)| *bus == Bus::Output).count()
    }
}

impl ExpanderPort for MockBus {
    fn probe(&mut self, bus: Bus, address: u8) -> bool {
        self.present.contains(&(bus, address))
    }

    fn read_word(&mut self, bus: Bus, address: u8) -> Result<u16, BusError> {
        if !self.present.contains(&(bus, address)) {
            return Err(BusError::Nack);
        }
        if self.unreadable.contains(&(bus, address)) {
            return Err(BusError::Other);
        }
        Ok(self.words.get(&(bus, address)).copied().unwrap_or(0xFFFF))
    }

    fn write_word(&mut self, bus: Bus, address: u8, word: u16) -> Result<(), BusError> {
        if self.fail_writes || !self.present.contains(&(bus, address)) {
            return Err(BusError::Nack);
        }
        self.writes.push((bus, address, word));
        self.words.insert((bus, address), word);
        Ok(())
    }
}

// ── Event capture ─────────────────────────────────────────────

/// Keeps every event as its published JSON.
#[derive(Default)]
pub struct JsonSink {
    pub published: Vec<serde_json::Value>,
}

impl EventSink for JsonSink {
    fn emit(&mut self, event: &IoEvent) {
        let json = event.to_json().expect("event serializes");
        self.published.push(serde_json::from_str(&json).expect("valid JSON"));
    }
}

/// Status publisher that can be told to refuse, like a disconnected client.
#[derive(Default)]
pub struct RecordingPublisher {
    pub status: Vec<String>,
    pub adopt: Vec<String>,
    pub logs: Vec<String>,
    pub offline: bool,
}

impl StatusPublisher for RecordingPublisher {
    fn publish_status(&mut self, payload: &str) -> bool {
        if self.offline {
            return false;
        }
        self.status.push(payload.to_owned());
        true
    }

    fn publish_adopt(&mut self, payload: &str) -> bool {
        if self.offline {
            return false;
        }
        self.adopt.push(payload.to_owned());
        true
    }

    fn publish_log(&mut self, line: &str) -> bool {
        if self.offline {
            return false;
        }
        self.logs.push(line.to_owned());
        true
    }
}

// ── MemoryStore ───────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    saved: RefCell<Option<ConfigPayload>>,
    pub saves: RefCell<u32>,
}

impl ConfigPort for MemoryStore {
    fn load(&self) -> Result<ConfigPayload, ConfigError> {
        self.saved.borrow().clone().ok_or(ConfigError::NotFound)
    }

    fn save(&self, config: &ConfigPayload) -> Result<(), ConfigError> {
        *self.saves.borrow_mut() += 1;
        *self.saved.borrow_mut() = Some(config.clone());
        Ok(())
    }
}
