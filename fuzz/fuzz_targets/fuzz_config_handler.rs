//! Fuzz target: `IoService::apply_config`
//!
//! Feeds arbitrary bytes as a config-topic payload and checks that the
//! channel tables stay inside their invariants: pins-per-chip within 1..=16
//! and every interlock partner on the channel's own chip.
//!
//! cargo fuzz run fuzz_config_handler

#![no_main]

use libfuzzer_sys::fuzz_target;
use stateio::app::service::IoService;
use stateio::config::DeviceConfig;
use stateio::io::mapper::{ChipPin, PINS_PER_CHIP};
use stateio::io::registry::PresenceMask;

fuzz_target!(|data: &[u8]| {
    let mut svc = IoService::with_presence(
        DeviceConfig::default(),
        PresenceMask::from_bits(0b0000_0011),
        PresenceMask::from_bits(0b0000_0001),
    );

    let report = svc.apply_config(data, 0);
    assert_eq!(svc.is_config_dirty(), report.applied > 0);

    let pins = svc.outputs().pins_per_chip();
    assert!((1..=PINS_PER_CHIP).contains(&pins));
    assert!(svc.capacity().max_output_index <= 2 * PINS_PER_CHIP as u16);

    for chip in 0..2 {
        for pin in 0..PINS_PER_CHIP {
            let ch = svc.outputs().channel(ChipPin::new(chip, pin)).expect("present chip");
            assert!(ch.interlock < PINS_PER_CHIP);
        }
    }

    // The effective snapshot must replay cleanly.
    let snapshot = svc.effective_config();
    let mut replay = IoService::with_presence(
        DeviceConfig::default(),
        PresenceMask::from_bits(0b0000_0011),
        PresenceMask::from_bits(0b0000_0001),
    );
    let bytes = serde_json::to_vec(&snapshot).expect("snapshot serializes");
    assert_eq!(replay.apply_config(&bytes, 0).skipped, 0);
});
