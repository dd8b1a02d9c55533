//! Measurement service: the hexagonal core.
//!
//! [`MeasurementService`] runs one measurement cycle end to end: power
//! sequencing, the pressure median burst, the probe read, conductivity with
//! temperature compensation and the optional calibration, then publishes
//! the packet.  All I/O flows through the port traits, so the whole cycle
//! runs on the host against mocks.
//!
//! ```text
//!  PowerRailPort ◀──┐
//!  PressureSensor ──┤  ┌────────────────────┐
//!  ProbeTemp ───────┼─▶│ MeasurementService │──▶ SharedState (packet)
//!  Conductivity ◀──▶┘  └────────────────────┘──▶ EventSink
//! ```
//!
//! No step aborts the cycle.  A failing sensor leaves its field empty in the
//! [`Measurement`] and the packet carries that field's sentinel.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::config::NodeConfig;
use crate::control::median::{MAX_WINDOW, MedianWindow};
use crate::diagnostics::CycleStats;
use crate::error::{Error, SensorError};
use crate::packet::{Measurement, ResultPacket};
use crate::shared::SharedState;

use super::events::{AppEvent, CycleReport, Sensor};
use super::ports::{EventSink, NodeHardware};

/// Compensation value pushed to the conductivity sensor.
///
/// Uses the probe reading when it lies strictly inside the configured range,
/// otherwise the fallback.  The float-to-integer cast truncates toward zero
/// and saturates, so sub-zero readings compensate at 0 C.
pub fn compensation_temperature(probe: Option<f32>, config: &NodeConfig) -> u8 {
    match probe {
        Some(t) if t > config.compensation_min_c && t < config.compensation_max_c => t as u8,
        _ => config.compensation_fallback_c,
    }
}

pub struct MeasurementService {
    config: NodeConfig,
    stats: CycleStats,
}

impl MeasurementService {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            stats: CycleStats::new(),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Run one full cycle and publish the result into `shared`.
    ///
    /// `hw` satisfies every port the cycle drives, which avoids handing out
    /// several mutable borrows of the same adapter.
    pub fn run_cycle(
        &mut self,
        hw: &mut impl NodeHardware,
        delay: &mut impl DelayNs,
        shared: &SharedState,
        sink: &mut impl EventSink,
    ) -> ResultPacket {
        let mut m = Measurement::default();
        sink.emit(&AppEvent::CycleStarted {
            calibration: shared.calibration_pending(),
        });

        // 1. Power up everything.
        hw.set_high_power(true);
        hw.set_low_power(true);
        delay.delay_ms(self.config.rail_settle_ms);

        // 2. Pressure burst.
        let mut window = MedianWindow::new();
        for _ in 0..self.config.pressure_samples {
            if !window.push(hw.read_pressure()) {
                warn!(
                    "pressure: burst of {} exceeds the {}-sample window, extra frames dropped",
                    self.config.pressure_samples, MAX_WINDOW
                );
                break;
            }
        }
        let failures = window.failures();
        let samples = window.len();
        self.stats.pressure_frames_rejected += failures as u32;
        let median = window.resolve();
        if median.valid {
            m.pressure = Some((median.pressure, median.temperature));
        } else {
            warn!("pressure: {}/{} frames failed, channel invalid", failures, samples);
            self.stats.pressure_channel_invalid += 1;
            self.fault(sink, Sensor::Pressure, SensorError::IntegrityFailure.into());
        }

        // 3. Only the pressure transmitter needs 5 V.
        delay.delay_us(self.config.pressure_rail_hold_us);
        hw.set_high_power(false);

        // 4. Probe, after throwaway conversions.
        for _ in 0..self.config.probe_priming_reads {
            let _ = hw.read_probe_temperature();
        }
        match hw.read_probe_temperature() {
            Ok(t) => m.probe_temp = Some(t),
            Err(e) => {
                warn!("probe: {}", e);
                self.stats.probe_failures += 1;
                self.fault(sink, Sensor::Probe, e);
            }
        }

        // 5-7. Conductivity.
        match hw.enable() {
            Ok(()) => self.conductivity(hw, shared, sink, &mut m),
            Err(e) => {
                warn!("conductivity: enable failed: {}", e);
                self.stats.conductivity_failures += 1;
                self.fault(sink, Sensor::Conductivity, e);
            }
        }
        delay.delay_us(self.config.ezo_pre_disable_us);
        hw.disable();
        delay.delay_us(self.config.ezo_post_disable_us);

        // 8. Power down.
        hw.set_low_power(false);

        // 9. Publish.
        let packet = ResultPacket::from(&m);
        shared.publish(packet);
        self.stats.cycles += 1;
        info!("cycle done | {}", self.stats);
        sink.emit(&AppEvent::CycleCompleted(CycleReport {
            packet,
            pressure_failures: failures,
            pressure_samples: samples,
        }));
        packet
    }

    /// Steps run while the conductivity sensor is up.
    fn conductivity(
        &mut self,
        hw: &mut impl NodeHardware,
        shared: &SharedState,
        sink: &mut impl EventSink,
        m: &mut Measurement,
    ) {
        if let Err(e) = hw.disable_continuous_reading() {
            self.conductivity_fault(sink, "disable continuous", e);
        }

        let compensation = compensation_temperature(m.probe_temp, &self.config);
        if let Err(e) = hw.set_temperature(compensation) {
            self.conductivity_fault(sink, "set temperature", e);
        }

        if shared.take_calibration_request() {
            let ok = match hw.calibrate() {
                Ok(()) => true,
                Err(e) => {
                    self.conductivity_fault(sink, "calibrate", e);
                    false
                }
            };
            m.calibrated = true;
            self.stats.calibrations += 1;
            sink.emit(&AppEvent::CalibrationPerformed { ok });
        }

        match hw.request_value() {
            Ok(v) => m.conductivity = Some(v),
            Err(e) => self.conductivity_fault(sink, "read", e),
        }
    }

    fn conductivity_fault(&mut self, sink: &mut impl EventSink, step: &str, e: Error) {
        warn!("conductivity: {} failed: {}", step, e);
        self.stats.conductivity_failures += 1;
        self.fault(sink, Sensor::Conductivity, e);
    }

    fn fault(&self, sink: &mut impl EventSink, sensor: Sensor, error: Error) {
        sink.emit(&AppEvent::SensorFault { sensor, error });
    }
}
