//! Input bus scanning through `IoService::poll`.

use serde_json::json;

use stateio::app::service::IoService;
use stateio::config::DeviceConfig;

use crate::mock_hw::{JsonSink, MockBus};

const IDLE: u16 = 0xFFFF;
/// Chip pin 3 pulled low; logical input 4 on the first chip.
const PIN3_LOW: u16 = !(1 << 3);

struct Rig {
    svc: IoService,
    hw: MockBus,
    sink: JsonSink,
    now: u64,
}

impl Rig {
    fn new(inputs: usize) -> Self {
        let slots: Vec<usize> = (0..inputs).collect();
        Self::on_slots(&slots)
    }

    fn on_slots(slots: &[usize]) -> Self {
        let mut hw = MockBus::with_slots(&[], slots);
        let mut svc = IoService::new(DeviceConfig::default());
        svc.discover(&mut hw);
        let mut rig = Self {
            svc,
            hw,
            sink: JsonSink::default(),
            now: 0,
        };
        // First scan only seeds the baseline.
        rig.poll();
        rig
    }

    fn poll(&mut self) {
        self.svc.poll(self.now, &mut self.hw, &mut self.sink);
    }

    /// Present `word` on `slot` and poll until it clears debounce.
    fn settle(&mut self, slot: usize, word: u16) {
        self.hw.set_input(slot, word);
        self.now += 100;
        self.poll();
        self.now += 25;
        self.poll();
    }
}

#[test]
fn switch_reports_on_then_off() {
    let mut rig = Rig::new(1);
    rig.svc.apply_config(br#"{"inputs":[{"index":4,"type":"switch"}]}"#, 0);

    rig.settle(0, PIN3_LOW);
    rig.settle(0, IDLE);

    assert_eq!(
        rig.sink.published,
        vec![
            json!({"port":1,"channel":4,"index":4,"type":"switch","event":"on"}),
            json!({"port":1,"channel":4,"index":4,"type":"switch","event":"off"}),
        ]
    );
}

#[test]
fn pins_already_active_at_boot_are_not_reported() {
    let mut hw = MockBus::with_chips(0, 1);
    let mut svc = IoService::new(DeviceConfig::default());
    svc.discover(&mut hw);
    hw.set_input(0, PIN3_LOW);

    let mut sink = JsonSink::default();
    for now in (0..500).step_by(5) {
        svc.poll(now, &mut hw, &mut sink);
    }
    assert!(sink.published.is_empty());
}

#[test]
fn bounce_inside_debounce_window_is_ignored() {
    let mut rig = Rig::new(1);
    rig.hw.set_input(0, PIN3_LOW);
    rig.now += 5;
    rig.poll();
    rig.hw.set_input(0, IDLE);
    rig.now += 5;
    rig.poll();
    rig.now += 100;
    rig.poll();
    assert!(rig.sink.published.is_empty());
}

#[test]
fn second_chip_maps_to_later_ports() {
    let mut rig = Rig::new(2);
    rig.svc.apply_config(br#"{"inputs":[{"index":20,"type":"contact"}]}"#, 0);
    rig.settle(1, PIN3_LOW);
    assert_eq!(
        rig.sink.published,
        vec![json!({"port":5,"channel":4,"index":20,"type":"contact","event":"closed"})]
    );
}

#[test]
fn invert_and_disable_from_config() {
    let mut rig = Rig::new(1);
    rig.svc.apply_config(
        br#"{"inputs":[{"index":4,"invert":true},{"index":5,"disabled":true}]}"#,
        0,
    );

    // Pin 4 (index 5) toggles too but stays silent.
    rig.settle(0, PIN3_LOW & !(1 << 4));
    assert_eq!(rig.sink.published.len(), 1);
    assert_eq!(rig.sink.published[0]["event"], json!("off"));
}

#[test]
fn button_single_click_is_reported_after_the_window() {
    let mut rig = Rig::new(1);
    rig.svc.apply_config(br#"{"inputs":[{"index":4,"type":"button"}]}"#, 0);

    rig.settle(0, PIN3_LOW);
    rig.settle(0, IDLE);
    assert!(rig.sink.published.is_empty());

    rig.now += 300;
    rig.poll();
    assert_eq!(
        rig.sink.published,
        vec![json!({"port":1,"channel":4,"index":4,"type":"button","event":"single"})]
    );
}

#[test]
fn default_input_type_applies_to_every_pin() {
    let mut rig = Rig::new(1);
    rig.svc.apply_config(br#"{"defaultInputType":"press"}"#, 0);
    rig.settle(0, 0x0000);
    assert_eq!(rig.sink.published.len(), 16);
    assert!(rig.sink.published.iter().all(|e| e["event"] == json!("press")));
}

#[test]
fn absent_slot_is_never_read() {
    let mut rig = Rig::new(1);
    // A chip that never answered discovery is never read.
    rig.hw.set_input(3, 0x0000);
    rig.settle(0, IDLE);
    assert!(rig.sink.published.is_empty());
}

#[test]
fn failed_read_skips_that_chip_for_a_tick() {
    let mut rig = Rig::new(2);
    rig.svc.apply_config(br#"{"inputs":[{"index":4,"type":"contact"},{"index":20,"type":"contact"}]}"#, 0);

    // Chip 0 stops answering while both chips see pin 3 pulled low.
    rig.hw.set_unreadable(0, true);
    rig.hw.set_input(0, PIN3_LOW);
    rig.settle(1, PIN3_LOW);
    assert_eq!(
        rig.sink.published,
        vec![json!({"port":5,"channel":4,"index":20,"type":"contact","event":"closed"})]
    );

    // Once it reads again, its pending edge is reported.
    rig.hw.set_unreadable(0, false);
    rig.settle(0, PIN3_LOW);
    assert_eq!(rig.sink.published.len(), 2);
    assert_eq!(
        rig.sink.published[1],
        json!({"port":1,"channel":4,"index":4,"type":"contact","event":"closed"})
    );
}

#[test]
fn chip_past_a_gap_is_left_idle() {
    // Inputs answer at slots 0 and 2; slot 1 is empty.
    let mut rig = Rig::on_slots(&[0, 2]);
    assert_eq!(rig.svc.capacity().max_input_index, 32);

    rig.settle(2, 0x0000);
    assert!(rig.sink.published.is_empty());

    let report = rig.svc.apply_config(br#"{"inputs":[{"index":33,"type":"contact"}]}"#, 0);
    assert_eq!((report.applied, report.skipped), (0, 1));

    // Slot 0 keeps working and nothing ever reports past the capacity.
    rig.settle(0, PIN3_LOW);
    assert_eq!(rig.sink.published.len(), 1);
    assert!(rig.sink.published.iter().all(|e| e["index"].as_u64().unwrap() <= 32));
}
