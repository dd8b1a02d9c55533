//! Host command bytes → shared state → main loop → fetched packet.
//!
//! Drives the [`CommandHandler`] the way the I²C target task does and steps
//! the [`Node`] loop by hand, all against mock hardware.

use crate::mock_hw::{HwCall, MockNode, MockSleep, MockWatchdog, NoDelay, RecordingSink};

use mfm_sensor::config::NodeConfig;
use mfm_sensor::packet::{PACKET_LEN, ResultPacket, WIRE_LEN};
use mfm_sensor::power::SleepController;
use mfm_sensor::protocol::CommandHandler;
use mfm_sensor::scheduler::Node;
use mfm_sensor::shared::SharedState;

type TestNode<'a> = Node<'a, MockNode, NoDelay, MockWatchdog, MockSleep, RecordingSink>;

fn make_node(shared: &SharedState) -> TestNode<'_> {
    let mut node = Node::new(
        NodeConfig::default(),
        MockNode::new(),
        NoDelay::default(),
        SleepController::new(MockWatchdog::default(), MockSleep::default()),
        shared,
        RecordingSink::default(),
    );
    node.start();
    node
}

fn fetch(handler: &CommandHandler<'_>) -> [u8; WIRE_LEN] {
    let mut out = [0u8; WIRE_LEN];
    assert_eq!(handler.on_command(0x11, &mut out), WIRE_LEN);
    out
}

#[test]
fn start_sets_rails_off_and_arms_watchdog() {
    let shared = SharedState::new();
    let node = make_node(&shared);
    assert_eq!(
        node.hardware().calls,
        vec![HwCall::HighPower(false), HwCall::LowPower(false)]
    );
    let (wdt, _) = node.sleep_controller().parts();
    assert!(wdt.armed);
}

#[test]
fn measure_then_fetch_returns_packet_once() {
    let shared = SharedState::new();
    let handler = CommandHandler::new(&shared);
    let mut node = make_node(&shared);

    handler.on_command(0x10, &mut []);
    let packet = node.step().expect("cycle should run");

    let first = fetch(&handler);
    assert_eq!(first[0], PACKET_LEN);
    assert_eq!(ResultPacket::from_wire(&first), Some(packet));
    assert_eq!(&first[11..19], b"\0\0\0\0\07.2");

    // Fetch-then-fetch: the second read is all zeros after the length.
    let second = fetch(&handler);
    assert_eq!(second[0], PACKET_LEN);
    assert!(second[1..].iter().all(|&b| b == 0));
}

#[test]
fn fetch_before_any_measurement_is_zeroed() {
    let shared = SharedState::new();
    let handler = CommandHandler::new(&shared);
    let mut node = make_node(&shared);

    assert!(node.step().is_none());
    let out = fetch(&handler);
    assert_eq!(ResultPacket::from_wire(&out), Some(ResultPacket::zeroed()));
    assert_eq!(node.hardware().count(&HwCall::ReadPressure), 0);
}

#[test]
fn repeated_start_runs_one_cycle() {
    let shared = SharedState::new();
    let handler = CommandHandler::new(&shared);
    let mut node = make_node(&shared);

    handler.on_command(0x10, &mut []);
    handler.on_command(0x10, &mut []);
    assert!(node.step().is_some());
    assert!(node.step().is_none());

    assert_eq!(node.stats().cycles, 1);
    assert_eq!(node.hardware().count(&HwCall::ReadPressure), 11);
}

#[test]
fn calibrate_flag_applies_to_next_cycle_only() {
    let shared = SharedState::new();
    let handler = CommandHandler::new(&shared);
    let mut node = make_node(&shared);

    handler.on_command(0x80, &mut []);
    // Calibration alone does not start a cycle.
    assert!(node.step().is_none());
    assert!(shared.calibration_pending());

    handler.on_command(0x10, &mut []);
    node.step();
    let calibrated = ResultPacket::from_wire(&fetch(&handler)).expect("valid packet");
    assert!(calibrated.is_calibrated());

    handler.on_command(0x10, &mut []);
    node.step();
    let plain = ResultPacket::from_wire(&fetch(&handler)).expect("valid packet");
    assert!(!plain.is_calibrated());
    assert_eq!(node.hardware().count(&HwCall::EzoCalibrate), 1);
    assert_eq!(node.stats().calibrations, 1);
}

#[test]
fn unfetched_packet_is_replaced_by_next_cycle() {
    let shared = SharedState::new();
    let handler = CommandHandler::new(&shared);
    let mut node = make_node(&shared);

    handler.on_command(0x80, &mut []);
    handler.on_command(0x10, &mut []);
    node.step();
    handler.on_command(0x10, &mut []);
    node.step();

    let latest = ResultPacket::from_wire(&fetch(&handler)).expect("valid packet");
    assert!(!latest.is_calibrated());
}

#[test]
fn idle_loop_sleeps_with_watchdog_off() {
    let shared = SharedState::new();
    let mut node = make_node(&shared);

    node.step();
    node.step();
    let (wdt, cpu) = node.sleep_controller().parts();
    assert_eq!(cpu.sleeps, 2);
    assert_eq!(wdt.feeds, 2);
    // Armed at start plus once after each wake-up.
    assert_eq!(wdt.arms, 3);
    assert!(wdt.armed);
}

#[test]
fn pending_request_runs_before_sleep() {
    let shared = SharedState::new();
    let handler = CommandHandler::new(&shared);
    let mut node = make_node(&shared);

    handler.on_command(0x10, &mut []);
    node.step();
    assert_eq!(node.sleep_controller().parts().1.sleeps, 1);

    // Already pending when the loop comes round: the cycle runs first.
    handler.on_command(0x10, &mut []);
    assert!(shared.is_work_pending());
    assert!(node.step().is_some());
    assert_eq!(node.stats().cycles, 2);
}

#[test]
fn unknown_command_changes_nothing() {
    let shared = SharedState::new();
    let handler = CommandHandler::new(&shared);
    let mut node = make_node(&shared);

    let mut out = [0xAAu8; WIRE_LEN];
    assert_eq!(handler.on_command(0x42, &mut out), 0);
    assert!(out.iter().all(|&b| b == 0xAA));
    assert!(node.step().is_none());
}

#[test]
fn every_cycle_ends_with_rails_off() {
    let shared = SharedState::new();
    let handler = CommandHandler::new(&shared);
    let mut node = make_node(&shared);

    for _ in 0..3 {
        handler.on_command(0x10, &mut []);
        node.step();
        let calls = &node.hardware().calls;
        let high = calls.iter().rev().find_map(|c| match c {
            HwCall::HighPower(on) => Some(*on),
            _ => None,
        });
        let low = calls.iter().rev().find_map(|c| match c {
            HwCall::LowPower(on) => Some(*on),
            _ => None,
        });
        assert_eq!(high, Some(false));
        assert_eq!(low, Some(false));
    }
    assert_eq!(node.stats().cycles, 3);
}
