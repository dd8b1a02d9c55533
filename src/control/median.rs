//! Median filter over a burst of pressure frames.
//!
//! The pressure transmitter occasionally produces a corrupted frame.  Rather
//! than averaging (which lets one bad frame skew the result) the cycle takes
//! a burst of samples and keeps the middle one.  Failed samples stay in the
//! window with their sentinel values so they sort to the extremes; if half or
//! more of the burst failed the whole channel is reported invalid.
//!
//! Pressure and temperature are sorted independently, so the two medians may
//! come from different frames.

use heapless::Vec;

use crate::sensors::huba713::PressureReading;

/// Largest burst the window can hold.
pub const MAX_WINDOW: usize = 31;

#[derive(Debug, Clone, Default)]
pub struct MedianWindow {
    pressures: Vec<u16, MAX_WINDOW>,
    temperatures: Vec<f32, MAX_WINDOW>,
    failures: usize,
}

impl MedianWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one sample.  Returns `false` (and drops the sample) once the
    /// window is full.
    pub fn push(&mut self, reading: PressureReading) -> bool {
        let reading = if reading.valid {
            reading
        } else {
            PressureReading::invalid()
        };
        if self.pressures.push(reading.pressure).is_err() {
            return false;
        }
        // Both vectors always have the same length.
        let _ = self.temperatures.push(reading.temperature);
        if !reading.valid {
            self.failures += 1;
        }
        true
    }

    pub fn len(&self) -> usize {
        self.pressures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pressures.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Medians of both channels, or [`PressureReading::invalid`] when the
    /// window is empty or at least half of it failed.
    pub fn resolve(&mut self) -> PressureReading {
        let n = self.len();
        if n == 0 || self.failures * 2 >= n {
            return PressureReading::invalid();
        }
        self.pressures.sort_unstable();
        self.temperatures.sort_unstable_by(f32::total_cmp);
        PressureReading {
            pressure: self.pressures[n / 2],
            temperature: self.temperatures[n / 2],
            valid: true,
        }
    }

    pub fn clear(&mut self) {
        self.pressures.clear();
        self.temperatures.clear();
        self.failures = 0;
    }
}
