//! Measurement cycle against mock hardware: power sequencing, sentinel
//! handling and temperature compensation.

use crate::mock_hw::{HwCall, MockNode, NoDelay, RecordingSink, no_device};

use mfm_sensor::app::events::{AppEvent, Sensor};
use mfm_sensor::app::service::MeasurementService;
use mfm_sensor::config::NodeConfig;
use mfm_sensor::control::median::MAX_WINDOW;
use mfm_sensor::packet::ResultPacket;
use mfm_sensor::shared::SharedState;

fn run(hw: &mut MockNode, shared: &SharedState) -> (ResultPacket, RecordingSink) {
    let mut service = MeasurementService::new(NodeConfig::default());
    let mut sink = RecordingSink::default();
    let packet = service.run_cycle(hw, &mut NoDelay::default(), shared, &mut sink);
    (packet, sink)
}

#[test]
fn healthy_cycle_fills_every_field() {
    let mut hw = MockNode::new();
    let shared = SharedState::new();
    let (packet, _) = run(&mut hw, &shared);

    assert_eq!(packet.pressure, 3040);
    assert_eq!(packet.pressure_temp, 21.5);
    assert_eq!(packet.probe_temp, 22.25);
    assert_eq!(&packet.conductivity, b"\0\0\0\0\07.2");
    assert_eq!(packet.flags, 0);
    assert_eq!(shared.peek_packet(), packet);
}

#[test]
fn power_and_command_order() {
    let mut hw = MockNode::new();
    let shared = SharedState::new();
    run(&mut hw, &shared);

    assert_eq!(hw.count(&HwCall::ReadPressure), 11);
    assert_eq!(
        hw.sequence(),
        vec![
            HwCall::HighPower(true),
            HwCall::LowPower(true),
            HwCall::HighPower(false),
            HwCall::ReadProbe,
            HwCall::ReadProbe,
            HwCall::EzoEnable,
            HwCall::EzoContinuousOff,
            HwCall::EzoTemperature(22),
            HwCall::EzoRead,
            HwCall::EzoDisable,
            HwCall::LowPower(false),
        ]
    );
    // The 5 V rail drops only after the whole pressure burst.
    let last_read = hw.calls.iter().rposition(|c| *c == HwCall::ReadPressure);
    assert!(last_read < hw.position(&HwCall::HighPower(false)));
}

#[test]
fn settle_and_hold_delays_are_honoured() {
    let mut hw = MockNode::new();
    let shared = SharedState::new();
    let mut delay = NoDelay::default();
    let mut service = MeasurementService::new(NodeConfig::default());
    service.run_cycle(&mut hw, &mut delay, &shared, &mut RecordingSink::default());
    // 10 ms settle + 1 ms hold + 200 us + 500 us around the EZO shutdown.
    assert!(delay.total_ns >= 11_700_000);
}

#[test]
fn minority_pressure_failures_are_filtered() {
    let mut hw = MockNode::new();
    hw.script_pressure(11, 5);
    let shared = SharedState::new();
    let (packet, sink) = run(&mut hw, &shared);

    // Six good frames 3005..=3010.  Pressure sentinels sort below them,
    // temperature sentinels above.
    assert_eq!(packet.pressure, 3005);
    assert_eq!(packet.pressure_temp, 30.0);
    assert!(!sink.events.iter().any(|e| matches!(
        e,
        AppEvent::SensorFault {
            sensor: Sensor::Pressure,
            ..
        }
    )));
}

#[test]
fn majority_pressure_failures_invalidate_channel() {
    let mut hw = MockNode::new();
    hw.script_pressure(11, 6);
    let shared = SharedState::new();
    let (packet, sink) = run(&mut hw, &shared);

    assert_eq!(packet.pressure, 0);
    assert_eq!(packet.pressure_temp, 200.0);
    // The other channels are unaffected.
    assert_eq!(packet.probe_temp, 22.25);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::SensorFault {
            sensor: Sensor::Pressure,
            ..
        }
    )));
}

#[test]
fn probe_failure_uses_sentinel_and_fallback_compensation() {
    let mut hw = MockNode::new();
    hw.probe_default = Err(no_device());
    let shared = SharedState::new();
    let (packet, _) = run(&mut hw, &shared);

    assert_eq!(packet.probe_temp, 100.0);
    assert_eq!(hw.count(&HwCall::EzoTemperature(10)), 1);
    assert_eq!(&packet.conductivity, b"\0\0\0\0\07.2");
}

#[test]
fn priming_read_result_is_discarded() {
    let mut hw = MockNode::new();
    hw.probe.push_back(Ok(85.0));
    hw.probe.push_back(Ok(18.6));
    let shared = SharedState::new();
    let (packet, _) = run(&mut hw, &shared);

    assert_eq!(packet.probe_temp, 18.6);
    assert_eq!(hw.count(&HwCall::EzoTemperature(18)), 1);
}

#[test]
fn out_of_range_probe_compensates_with_fallback() {
    let mut hw = MockNode::new();
    hw.probe_default = Ok(63.0);
    let shared = SharedState::new();
    let (packet, _) = run(&mut hw, &shared);

    assert_eq!(packet.probe_temp, 63.0);
    assert_eq!(hw.count(&HwCall::EzoTemperature(10)), 1);
}

#[test]
fn conductivity_enable_failure_skips_commands() {
    let mut hw = MockNode::new();
    hw.ezo_enable = Err(no_device());
    let shared = SharedState::new();
    shared.request_calibration();
    let (packet, sink) = run(&mut hw, &shared);

    assert_eq!(packet.conductivity, [0; 8]);
    assert!(!packet.is_calibrated());
    assert_eq!(hw.count(&HwCall::EzoRead), 0);
    assert_eq!(hw.count(&HwCall::EzoCalibrate), 0);
    // Still powered down cleanly.
    assert_eq!(hw.count(&HwCall::EzoDisable), 1);
    assert_eq!(hw.calls.last(), Some(&HwCall::LowPower(false)));
    // The request survives for the next cycle.
    assert!(shared.calibration_pending());
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::SensorFault {
            sensor: Sensor::Conductivity,
            ..
        }
    )));
}

#[test]
fn conductivity_read_failure_zeroes_field() {
    let mut hw = MockNode::new();
    hw.ezo_value = Err(no_device());
    let shared = SharedState::new();
    let (packet, _) = run(&mut hw, &shared);

    assert_eq!(packet.conductivity, [0; 8]);
    assert_eq!(packet.pressure, 3040);
}

#[test]
fn calibration_runs_before_read_and_sets_flag() {
    let mut hw = MockNode::new();
    let shared = SharedState::new();
    shared.request_calibration();
    let (packet, sink) = run(&mut hw, &shared);

    assert!(packet.is_calibrated());
    let cal = hw.position(&HwCall::EzoCalibrate);
    assert!(cal.is_some());
    assert!(cal > hw.position(&HwCall::EzoTemperature(22)));
    assert!(cal < hw.position(&HwCall::EzoRead));
    assert!(!shared.calibration_pending());
    assert_eq!(sink.events[0], AppEvent::CycleStarted { calibration: true });
    assert!(sink.events.contains(&AppEvent::CalibrationPerformed { ok: true }));
}

#[test]
fn rejected_calibration_still_flags_packet() {
    let mut hw = MockNode::new();
    hw.ezo_calibrate = Err(mfm_sensor::error::Error::Sensor(
        mfm_sensor::error::SensorError::ProtocolNak,
    ));
    let shared = SharedState::new();
    shared.request_calibration();
    let (packet, sink) = run(&mut hw, &shared);

    assert!(packet.is_calibrated());
    assert!(sink.events.contains(&AppEvent::CalibrationPerformed { ok: false }));
}

#[test]
fn cycle_completed_reports_burst() {
    let mut hw = MockNode::new();
    hw.script_pressure(11, 3);
    let shared = SharedState::new();
    let (packet, sink) = run(&mut hw, &shared);

    match sink.events.last() {
        Some(AppEvent::CycleCompleted(report)) => {
            assert_eq!(report.packet, packet);
            assert_eq!(report.pressure_failures, 3);
            assert_eq!(report.pressure_samples, 11);
        }
        other => panic!("expected CycleCompleted, got {other:?}"),
    }
}

#[test]
fn oversized_burst_stops_at_window_capacity() {
    let mut hw = MockNode::new();
    let shared = SharedState::new();
    let config = NodeConfig {
        pressure_samples: MAX_WINDOW + 9,
        ..NodeConfig::default()
    };
    let mut sink = RecordingSink::default();
    let packet = MeasurementService::new(config).run_cycle(
        &mut hw,
        &mut NoDelay::default(),
        &shared,
        &mut sink,
    );

    assert_eq!(packet.pressure, 3040);
    // One frame past capacity is read, rejected, and ends the burst.
    assert_eq!(hw.count(&HwCall::ReadPressure), MAX_WINDOW + 1);
    match sink.events.last() {
        Some(AppEvent::CycleCompleted(report)) => {
            assert_eq!(report.pressure_samples, MAX_WINDOW);
        }
        other => panic!("expected CycleCompleted, got {other:?}"),
    }
}
