//! Fuzz target: `IoService::handle_command`
//!
//! Arbitrary command payloads against a rig with channels 1/2 interlocked.
//! Whatever the input, both channels are never energised together and
//! every published event renders as JSON.
//!
//! cargo fuzz run fuzz_command_handler

#![no_main]

use libfuzzer_sys::fuzz_target;
use stateio::app::events::IoEvent;
use stateio::app::ports::{EventSink, ExpanderPort};
use stateio::app::service::IoService;
use stateio::config::DeviceConfig;
use stateio::error::BusError;
use stateio::io::registry::{Bus, PresenceMask};

struct Latch(u16);

impl ExpanderPort for Latch {
    fn probe(&mut self, _bus: Bus, _address: u8) -> bool {
        true
    }
    fn read_word(&mut self, _bus: Bus, _address: u8) -> Result<u16, BusError> {
        Ok(self.0)
    }
    fn write_word(&mut self, _bus: Bus, _address: u8, word: u16) -> Result<(), BusError> {
        self.0 = word;
        Ok(())
    }
}

struct Render;

impl EventSink for Render {
    fn emit(&mut self, event: &IoEvent) {
        assert!(event.to_json().is_ok());
    }
}

fuzz_target!(|data: &[u8]| {
    let mut svc = IoService::with_presence(
        DeviceConfig::default(),
        PresenceMask::from_bits(0b0000_0001),
        PresenceMask::EMPTY,
    );
    svc.apply_config(br#"{"outputs":[{"index":1,"interlockIndex":2},{"index":2,"interlockIndex":1}]}"#, 0);

    let mut hw = Latch(0);
    svc.handle_command(data, 0, &mut hw, &mut Render);
    assert_ne!(hw.0 & 0b11, 0b11);

    svc.handle_command(br#"{"outputs":[{"index":1,"command":"on"},{"index":2,"command":"on"}]}"#, 1, &mut hw, &mut Render);
    assert_ne!(hw.0 & 0b11, 0b11);
});
