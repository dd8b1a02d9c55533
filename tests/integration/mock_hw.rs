//! Mock node hardware for integration tests.
//!
//! Records every port call so tests can assert on the full power and
//! command sequence without touching real GPIO or UART peripherals.

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use mfm_sensor::app::events::AppEvent;
use mfm_sensor::app::ports::{
    ConductivityPort, EventSink, LowPowerPort, PowerRailPort, PressureSensorPort,
    ProbeTemperaturePort, WatchdogPort,
};
use mfm_sensor::error::{Error, Result, SensorError};
use mfm_sensor::sensors::ezo_ec::right_justify;
use mfm_sensor::sensors::huba713::PressureReading;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    HighPower(bool),
    LowPower(bool),
    ReadPressure,
    ReadProbe,
    EzoEnable,
    EzoDisable,
    EzoContinuousOff,
    EzoTemperature(u8),
    EzoCalibrate,
    EzoRead,
}

// ── MockNode ──────────────────────────────────────────────────

/// Every sensor answers from a script; anything not scripted falls back to
/// a healthy default.
pub struct MockNode {
    pub calls: Vec<HwCall>,
    pub pressure: VecDeque<PressureReading>,
    pub pressure_default: PressureReading,
    pub probe: VecDeque<Result<f32>>,
    pub probe_default: Result<f32>,
    pub ezo_enable: Result<()>,
    pub ezo_calibrate: Result<()>,
    pub ezo_value: Result<[u8; 8]>,
}

#[allow(dead_code)]
impl MockNode {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            pressure: VecDeque::new(),
            pressure_default: PressureReading {
                pressure: 3040,
                temperature: 21.5,
                valid: true,
            },
            probe: VecDeque::new(),
            probe_default: Ok(22.25),
            ezo_enable: Ok(()),
            ezo_calibrate: Ok(()),
            ezo_value: Ok(right_justify(b"7.2")),
        }
    }

    pub fn count(&self, call: &HwCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn position(&self, call: &HwCall) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }

    /// Calls other than the eleven pressure reads, in order.
    pub fn sequence(&self) -> Vec<HwCall> {
        self.calls
            .iter()
            .filter(|c| **c != HwCall::ReadPressure)
            .cloned()
            .collect()
    }

    /// Queue `bad` invalid frames followed by good ones up to `total`.
    pub fn script_pressure(&mut self, total: usize, bad: usize) {
        for i in 0..total {
            self.pressure.push_back(if i < bad {
                PressureReading::invalid()
            } else {
                PressureReading {
                    pressure: 3000 + i as u16,
                    temperature: 20.0 + i as f32,
                    valid: true,
                }
            });
        }
    }
}

impl Default for MockNode {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerRailPort for MockNode {
    fn set_high_power(&mut self, on: bool) {
        self.calls.push(HwCall::HighPower(on));
    }

    fn set_low_power(&mut self, on: bool) {
        self.calls.push(HwCall::LowPower(on));
    }
}

impl PressureSensorPort for MockNode {
    fn read_pressure(&mut self) -> PressureReading {
        self.calls.push(HwCall::ReadPressure);
        self.pressure.pop_front().unwrap_or(self.pressure_default)
    }
}

impl ProbeTemperaturePort for MockNode {
    fn read_probe_temperature(&mut self) -> Result<f32> {
        self.calls.push(HwCall::ReadProbe);
        self.probe.pop_front().unwrap_or(self.probe_default)
    }
}

impl ConductivityPort for MockNode {
    fn enable(&mut self) -> Result<()> {
        self.calls.push(HwCall::EzoEnable);
        self.ezo_enable
    }

    fn disable(&mut self) {
        self.calls.push(HwCall::EzoDisable);
    }

    fn disable_continuous_reading(&mut self) -> Result<()> {
        self.calls.push(HwCall::EzoContinuousOff);
        Ok(())
    }

    fn set_temperature(&mut self, celsius: u8) -> Result<()> {
        self.calls.push(HwCall::EzoTemperature(celsius));
        Ok(())
    }

    fn calibrate(&mut self) -> Result<()> {
        self.calls.push(HwCall::EzoCalibrate);
        self.ezo_calibrate
    }

    fn request_value(&mut self) -> Result<[u8; 8]> {
        self.calls.push(HwCall::EzoRead);
        self.ezo_value
    }
}

pub fn no_device() -> Error {
    Error::Sensor(SensorError::NoDevice)
}

// ── Delay ─────────────────────────────────────────────────────

/// Returns immediately; keeps the total requested wait.
#[derive(Default)]
pub struct NoDelay {
    pub total_ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Watchdog + low power ──────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockWatchdog {
    pub armed: bool,
    pub arms: u32,
    pub feeds: u32,
}

impl WatchdogPort for MockWatchdog {
    fn arm(&mut self) {
        self.armed = true;
        self.arms += 1;
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    fn feed(&mut self) {
        assert!(self.armed, "fed while disarmed");
        self.feeds += 1;
    }
}

/// Never blocks; counts how often the loop went to sleep.
#[derive(Debug, Default)]
pub struct MockSleep {
    pub sleeps: u32,
}

impl LowPowerPort for MockSleep {
    fn sleep(&mut self) {
        self.sleeps += 1;
    }
}
