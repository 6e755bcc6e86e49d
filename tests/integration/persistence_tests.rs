//! Config persistence across a simulated reboot, plus adoption.

use serde_json::json;

use stateio::adapters::nvs::NvsConfigStore;
use stateio::app::adopt;
use stateio::app::ports::ConfigPort;
use stateio::app::service::IoService;
use stateio::config::DeviceConfig;
use stateio::io::mapper::ChipPin;
use stateio::io::taxonomy::{InputType, OutputType};

use crate::mock_hw::{JsonSink, MemoryStore, MockBus};

fn boot(hw: &mut MockBus) -> IoService {
    let mut svc = IoService::new(DeviceConfig::default());
    svc.discover(hw);
    svc
}

#[test]
fn config_survives_reboot() {
    let store = MemoryStore::default();
    {
        let mut hw = MockBus::with_chips(2, 1);
        let mut svc = boot(&mut hw);
        svc.apply_config(
            br#"{"outputs":[{"index":17,"type":"timer","timerSeconds":5}],"inputs":[{"index":4,"type":"contact"}]}"#,
            1_000,
        );
        assert!(svc.is_config_dirty());
        svc.auto_save_if_needed(7_000, &store);
        assert_eq!(*store.saves.borrow(), 1);
    }

    let mut hw = MockBus::with_chips(2, 1);
    let mut svc = boot(&mut hw);
    let report = svc.restore(&store).expect("snapshot present");
    assert_eq!(report.skipped, 0);

    let out = svc.outputs().channel(ChipPin::new(1, 0)).unwrap();
    assert_eq!((out.kind, out.timer_secs), (OutputType::Timer, 5));
    assert_eq!(svc.inputs().channel(ChipPin::new(0, 3)).unwrap().kind, InputType::Contact);

    // The restored timer still reverts.
    let mut sink = JsonSink::default();
    svc.handle_command(br#"{"outputs":[{"index":17,"command":"on"}]}"#, 0, &mut hw, &mut sink);
    svc.poll(5_000, &mut hw, &mut sink);
    assert_eq!(sink.published[1], json!({"index":17,"type":"timer","event":"off"}));
}

#[test]
fn saved_entries_beyond_a_smaller_rig_are_skipped() {
    let store = MemoryStore::default();
    {
        let mut hw = MockBus::with_chips(2, 0);
        let mut svc = boot(&mut hw);
        svc.apply_config(br#"{"outputs":[{"index":3,"type":"motor"},{"index":20,"type":"motor"}]}"#, 0);
        svc.auto_save_if_needed(60_000, &store);
    }

    let mut hw = MockBus::with_chips(1, 0);
    let mut svc = boot(&mut hw);
    let report = svc.restore(&store).unwrap();
    assert_eq!((report.applied, report.skipped), (1, 1));
    assert_eq!(svc.outputs().channel(ChipPin::new(0, 2)).unwrap().kind, OutputType::Motor);
}

#[test]
fn empty_store_keeps_defaults() {
    let store = MemoryStore::default();
    let mut hw = MockBus::with_chips(1, 1);
    let mut svc = boot(&mut hw);
    assert!(svc.restore(&store).is_none());
    assert_eq!(svc.outputs().channel(ChipPin::new(0, 0)).unwrap().kind, OutputType::Relay);
}

#[test]
fn restore_does_not_schedule_a_save() {
    let store = MemoryStore::default();
    store
        .save(&serde_json::from_str(r#"{"defaultOutputType":"motor"}"#).unwrap())
        .unwrap();

    let mut hw = MockBus::with_chips(1, 0);
    let mut svc = boot(&mut hw);
    svc.restore(&store);
    assert!(!svc.is_config_dirty());
    assert!(!svc.auto_save_if_needed(u64::MAX, &store));
}

#[test]
fn host_nvs_store_round_trips_the_effective_config() {
    let store = NvsConfigStore::new().unwrap();
    let mut hw = MockBus::with_chips(1, 1);
    let mut svc = boot(&mut hw);
    svc.apply_config(br#"{"outputs":[{"index":5,"interlockIndex":6}]}"#, 0);
    assert!(svc.auto_save_if_needed(10_000, &store));

    let loaded = store.load().unwrap();
    assert_eq!(loaded.outputs, vec![json!({"index":5,"interlockIndex":6})]);
}

#[test]
fn adoption_advertises_discovered_capacity() {
    let mut hw = MockBus::with_chips(3, 2);
    let svc = boot(&mut hw);
    let payload = adopt::adoption(svc.capacity(), None);

    assert_eq!(payload["firmware"]["shortName"], json!(adopt::FW_SHORT_NAME));
    let config = &payload["configSchema"]["properties"];
    assert_eq!(config["outputs"]["items"]["properties"]["index"]["maximum"], json!(48));
    assert_eq!(config["inputs"]["items"]["properties"]["index"]["maximum"], json!(32));
    let command = &payload["commandSchema"]["properties"];
    assert_eq!(command["outputs"]["items"]["properties"]["index"]["maximum"], json!(48));
}
