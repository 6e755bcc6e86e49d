//! Config and command topics driven through `IoService` into the output bus.

use serde_json::json;

use stateio::app::dispatch::Dispatcher;
use stateio::app::service::IoService;
use stateio::config::DeviceConfig;
use stateio::io::mapper::ChipPin;
use stateio::io::registry::Bus;
use stateio::io::taxonomy::{Level, OutputType};

use crate::mock_hw::{JsonSink, MockBus, RecordingPublisher};

fn boot(outputs: usize, inputs: usize) -> (IoService, MockBus) {
    let mut hw = MockBus::with_chips(outputs, inputs);
    let mut svc = IoService::new(DeviceConfig::default());
    svc.discover(&mut hw);
    (svc, hw)
}

// ── Discovery ─────────────────────────────────────────────────

#[test]
fn discovery_sizes_channels_and_clears_outputs() {
    let (svc, hw) = boot(2, 1);
    let cap = svc.capacity();
    assert_eq!((cap.max_output_index, cap.max_input_index), (32, 16));
    assert_eq!(hw.word(Bus::Output, 0), Some(0x0000));
    assert_eq!(hw.word(Bus::Output, 1), Some(0x0000));
    assert_eq!(hw.word(Bus::Input, 0), Some(0xFFFF));
}

#[test]
fn no_chips_means_every_index_is_rejected() {
    let (mut svc, mut hw) = boot(0, 0);
    let mut sink = JsonSink::default();
    let n = svc.handle_command(br#"{"outputs":[{"index":1,"command":"on"}]}"#, 0, &mut hw, &mut sink);
    assert_eq!(n, 0);
    assert!(hw.writes.is_empty());
    assert!(sink.published.is_empty());
}

// ── Timer ─────────────────────────────────────────────────────

#[test]
fn timer_channel_reverts_after_its_delay() {
    let (mut svc, mut hw) = boot(2, 0);
    let mut sink = JsonSink::default();

    let report = svc.apply_config(br#"{"outputs":[{"index":17,"type":"timer","timerSeconds":5}]}"#, 0);
    assert_eq!(report.skipped, 0);

    let n = svc.handle_command(br#"{"outputs":[{"index":17,"command":"on"}]}"#, 1_000, &mut hw, &mut sink);
    assert_eq!(n, 1);
    assert_eq!(sink.published, vec![json!({"index":17,"type":"timer","event":"on"})]);
    // Index 17 is the first pin of the second output chip.
    assert_eq!(hw.word(Bus::Output, 1), Some(0x0001));

    svc.poll(5_999, &mut hw, &mut sink);
    assert_eq!(sink.published.len(), 1);

    svc.poll(6_000, &mut hw, &mut sink);
    assert_eq!(sink.published[1], json!({"index":17,"type":"timer","event":"off"}));
    assert_eq!(hw.word(Bus::Output, 1), Some(0x0000));

    svc.poll(20_000, &mut hw, &mut sink);
    assert_eq!(sink.published.len(), 2);
}

#[test]
fn repeated_on_restarts_the_timer() {
    let (mut svc, mut hw) = boot(1, 0);
    let mut sink = JsonSink::default();
    svc.apply_config(br#"{"outputs":[{"index":2,"type":"timer","timerSeconds":2}]}"#, 0);

    let on = br#"{"outputs":[{"index":2,"command":"on"}]}"#;
    svc.handle_command(on, 0, &mut hw, &mut sink);
    svc.handle_command(on, 1_500, &mut hw, &mut sink);

    svc.poll(2_000, &mut hw, &mut sink);
    assert_eq!(svc.outputs().level(ChipPin::new(0, 1)), Level::On);
    svc.poll(3_500, &mut hw, &mut sink);
    assert_eq!(svc.outputs().level(ChipPin::new(0, 1)), Level::Off);
}

#[test]
fn relay_stays_on_without_a_timer() {
    let (mut svc, mut hw) = boot(1, 0);
    let mut sink = JsonSink::default();
    svc.handle_command(br#"{"outputs":[{"index":1,"command":"on"}]}"#, 0, &mut hw, &mut sink);
    svc.poll(10 * 60 * 1000, &mut hw, &mut sink);
    assert_eq!(sink.published.len(), 1);
    assert_eq!(hw.word(Bus::Output, 0), Some(0x0001));
}

// ── Interlock ─────────────────────────────────────────────────

#[test]
fn interlocked_pair_is_never_on_together() {
    let (mut svc, mut hw) = boot(1, 0);
    let mut sink = JsonSink::default();
    svc.apply_config(
        br#"{"outputs":[{"index":5,"type":"motor","interlockIndex":6},{"index":6,"type":"motor","interlockIndex":5}]}"#,
        0,
    );

    assert_eq!(svc.handle_command(br#"{"outputs":[{"index":5,"command":"on"}]}"#, 0, &mut hw, &mut sink), 1);
    let writes = hw.output_writes();

    assert_eq!(svc.handle_command(br#"{"outputs":[{"index":6,"command":"on"}]}"#, 10, &mut hw, &mut sink), 0);
    assert_eq!(hw.output_writes(), writes);
    assert_eq!(hw.word(Bus::Output, 0), Some(1 << 4));

    svc.handle_command(br#"{"outputs":[{"index":5,"command":"off"}]}"#, 20, &mut hw, &mut sink);
    assert_eq!(svc.handle_command(br#"{"outputs":[{"index":6,"command":"on"}]}"#, 30, &mut hw, &mut sink), 1);
    assert_eq!(hw.word(Bus::Output, 0), Some(1 << 5));

    let events: Vec<_> = sink.published.iter().map(|e| e["event"].clone()).collect();
    assert_eq!(events, vec![json!("on"), json!("off"), json!("on")]);
}

#[test]
fn interlock_across_chips_is_refused() {
    let (mut svc, _hw) = boot(2, 0);
    let report = svc.apply_config(br#"{"outputs":[{"index":1,"interlockIndex":17}]}"#, 0);
    assert_eq!((report.applied, report.skipped), (0, 1));
    let ch = svc.outputs().channel(ChipPin::new(0, 0)).unwrap();
    assert_eq!(ch.interlock, 0);
}

// ── Command validation ────────────────────────────────────────

#[test]
fn type_mismatch_does_not_actuate() {
    let (mut svc, mut hw) = boot(1, 0);
    let mut sink = JsonSink::default();
    let writes = hw.output_writes();

    let n = svc.handle_command(br#"{"outputs":[{"index":3,"type":"motor","command":"on"}]}"#, 0, &mut hw, &mut sink);
    assert_eq!(n, 0);
    assert_eq!(hw.output_writes(), writes);
    assert!(sink.published.is_empty());
    assert_eq!(svc.outputs().level(ChipPin::new(0, 2)), Level::Off);
}

#[test]
fn stale_relay_command_against_a_motor_is_rejected() {
    let (mut svc, mut hw) = boot(1, 0);
    let mut sink = JsonSink::default();
    svc.apply_config(br#"{"outputs":[{"index":3,"type":"motor"}]}"#, 0);
    let writes = hw.output_writes();

    let n = svc.handle_command(br#"{"outputs":[{"index":3,"type":"relay","command":"on"}]}"#, 0, &mut hw, &mut sink);
    assert_eq!(n, 0);
    assert_eq!(hw.output_writes(), writes);
    assert!(sink.published.is_empty());
}

#[test]
fn bad_entries_do_not_block_good_ones() {
    let (mut svc, mut hw) = boot(1, 0);
    let mut sink = JsonSink::default();
    let n = svc.handle_command(
        br#"{"outputs":[
            {"index":0,"command":"on"},
            {"index":99,"command":"on"},
            {"index":2,"command":"flash"},
            {"command":"on"},
            {"index":4,"type":"relay","command":"on"}
        ]}"#,
        0,
        &mut hw,
        &mut sink,
    );
    assert_eq!(n, 1);
    assert_eq!(sink.published, vec![json!({"index":4,"type":"relay","event":"on"})]);
}

#[test]
fn query_reports_without_writing() {
    let (mut svc, mut hw) = boot(1, 0);
    let mut sink = JsonSink::default();
    svc.handle_command(br#"{"outputs":[{"index":7,"command":"on"}]}"#, 0, &mut hw, &mut sink);
    let writes = hw.output_writes();

    svc.handle_command(br#"{"outputs":[{"index":7,"command":"query"},{"index":8}]}"#, 5, &mut hw, &mut sink);
    assert_eq!(hw.output_writes(), writes);
    assert_eq!(sink.published[1], json!({"index":7,"type":"relay","event":"on"}));
    assert_eq!(sink.published[2], json!({"index":8,"type":"relay","event":"off"}));
}

#[test]
fn bus_failure_leaves_channel_off() {
    let (mut svc, mut hw) = boot(1, 0);
    let mut sink = JsonSink::default();
    hw.fail_writes = true;
    let n = svc.handle_command(br#"{"outputs":[{"index":1,"command":"on"}]}"#, 0, &mut hw, &mut sink);
    assert_eq!(n, 0);
    assert_eq!(svc.outputs().level(ChipPin::new(0, 0)), Level::Off);
    assert!(sink.published.is_empty());
}

#[test]
fn wrong_typed_config_field_spares_the_rest() {
    let (mut svc, _hw) = boot(1, 1);
    let report = svc.apply_config(
        br#"{"defaultInputType":7,"outputsPerMcp":"8","inputs":null,"outputs":[{"index":1,"type":"motor"}]}"#,
        0,
    );
    assert_eq!((report.applied, report.skipped), (1, 2));
    assert_eq!(svc.outputs().channel(ChipPin::new(0, 0)).unwrap().kind, OutputType::Motor);
    assert_eq!(svc.capacity().max_output_index, 16);
    assert!(svc.is_config_dirty());
}

#[test]
fn output_chip_past_a_gap_is_unreachable() {
    let mut hw = MockBus::with_slots(&[0, 2], &[]);
    let mut svc = IoService::new(DeviceConfig::default());
    svc.discover(&mut hw);
    let mut sink = JsonSink::default();
    assert_eq!(svc.capacity().max_output_index, 32);

    // 17..32 land on the empty slot 1; 33 is past capacity.
    for index in [17, 33] {
        let cmd = format!(r#"{{"outputs":[{{"index":{},"command":"on"}}]}}"#, index);
        assert_eq!(svc.handle_command(cmd.as_bytes(), 0, &mut hw, &mut sink), 0);
    }
    assert_eq!(hw.word(Bus::Output, 2), Some(0x0000));
    assert!(sink.published.is_empty());
}

#[test]
fn pins_per_chip_readdresses_commands() {
    let (mut svc, mut hw) = boot(2, 0);
    let mut sink = JsonSink::default();
    svc.apply_config(br#"{"outputsPerMcp":8}"#, 0);
    assert_eq!(svc.capacity().max_output_index, 16);

    svc.handle_command(br#"{"outputs":[{"index":9,"command":"on"}]}"#, 0, &mut hw, &mut sink);
    assert_eq!(hw.word(Bus::Output, 1), Some(0x0001));
    assert_eq!(sink.published[0]["index"], json!(9));
}

// ── Dispatch ──────────────────────────────────────────────────

#[test]
fn events_reach_the_status_topic() {
    let (mut svc, mut hw) = boot(1, 0);
    let mut dispatcher = Dispatcher::new(RecordingPublisher::default());
    svc.handle_command(br#"{"outputs":[{"index":1,"command":"on"}]}"#, 0, &mut hw, &mut dispatcher);

    assert_eq!(dispatcher.published(), 1);
    let payload: serde_json::Value = serde_json::from_str(&dispatcher.publisher().status[0]).unwrap();
    assert_eq!(payload, json!({"index":1,"type":"relay","event":"on"}));
}

#[test]
fn log_lines_reach_the_log_topic() {
    let (tx, rx) = std::sync::mpsc::sync_channel(4);
    tx.send("[stio] mqtt connected".to_string()).unwrap();
    let mut dispatcher = Dispatcher::new(RecordingPublisher::default());
    assert_eq!(dispatcher.drain_logs(&rx, 4), 1);
    assert_eq!(dispatcher.publisher().logs, vec!["[stio] mqtt connected"]);
}

#[test]
fn offline_log_line_fails_over() {
    let mut dispatcher = Dispatcher::new(RecordingPublisher {
        offline: true,
        ..RecordingPublisher::default()
    });
    assert!(!dispatcher.log("[stio] mqtt connected"));
    assert!(dispatcher.publisher().logs.is_empty());
}

#[test]
fn offline_publisher_does_not_block_actuation() {
    let (mut svc, mut hw) = boot(1, 0);
    let mut dispatcher = Dispatcher::new(RecordingPublisher {
        offline: true,
        ..RecordingPublisher::default()
    });
    let n = svc.handle_command(br#"{"outputs":[{"index":1,"command":"on"}]}"#, 0, &mut hw, &mut dispatcher);
    assert_eq!(n, 1);
    assert_eq!(hw.word(Bus::Output, 0), Some(0x0001));
    assert_eq!((dispatcher.published(), dispatcher.failed()), (0, 1));
}
