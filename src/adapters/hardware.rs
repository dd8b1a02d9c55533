//! Hardware adapter: bridges the individual drivers to the port traits.
//!
//! Owns the rail switches and the three sensor drivers and exposes them as
//! one [`NodeHardware`](crate::app::ports::NodeHardware) value, which the
//! measurement service borrows mutably once per cycle.

use crate::app::ports::{ConductivityPort, PowerRailPort, PressureSensorPort, ProbeTemperaturePort};
use crate::error::Result;
use crate::sensors::huba713::PressureReading;

/// Concrete adapter that combines all hardware behind the port traits.
pub struct HardwareAdapter<R, P, T, E> {
    rails: R,
    pressure: P,
    probe: T,
    conductivity: E,
}

impl<R, P, T, E> HardwareAdapter<R, P, T, E> {
    pub fn new(rails: R, pressure: P, probe: T, conductivity: E) -> Self {
        Self {
            rails,
            pressure,
            probe,
            conductivity,
        }
    }

    pub fn rails(&self) -> &R {
        &self.rails
    }

    pub fn conductivity(&self) -> &E {
        &self.conductivity
    }
}

// ── PowerRailPort ─────────────────────────────────────────────

impl<R: PowerRailPort, P, T, E> PowerRailPort for HardwareAdapter<R, P, T, E> {
    fn set_high_power(&mut self, on: bool) {
        self.rails.set_high_power(on);
    }

    fn set_low_power(&mut self, on: bool) {
        self.rails.set_low_power(on);
    }
}

// ── Sensor ports ──────────────────────────────────────────────

impl<R, P: PressureSensorPort, T, E> PressureSensorPort for HardwareAdapter<R, P, T, E> {
    fn read_pressure(&mut self) -> PressureReading {
        self.pressure.read_pressure()
    }
}

impl<R, P, T: ProbeTemperaturePort, E> ProbeTemperaturePort for HardwareAdapter<R, P, T, E> {
    fn read_probe_temperature(&mut self) -> Result<f32> {
        self.probe.read_probe_temperature()
    }
}

impl<R, P, T, E: ConductivityPort> ConductivityPort for HardwareAdapter<R, P, T, E> {
    fn enable(&mut self) -> Result<()> {
        self.conductivity.enable()
    }

    fn disable(&mut self) {
        self.conductivity.disable();
    }

    fn disable_continuous_reading(&mut self) -> Result<()> {
        self.conductivity.disable_continuous_reading()
    }

    fn set_temperature(&mut self, celsius: u8) -> Result<()> {
        self.conductivity.set_temperature(celsius)
    }

    fn calibrate(&mut self) -> Result<()> {
        self.conductivity.calibrate()
    }

    fn request_value(&mut self) -> Result<[u8; 8]> {
        self.conductivity.request_value()
    }
}
