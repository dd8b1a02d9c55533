//! Runtime counters.
//!
//! The node has no storage, so counters live in RAM and restart from zero
//! on every reset.  They are logged once per cycle.

use core::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub cycles: u32,
    pub calibrations: u32,
    /// Individual pressure frames that failed to decode.
    pub pressure_frames_rejected: u32,
    /// Cycles whose whole pressure burst was discarded.
    pub pressure_channel_invalid: u32,
    pub probe_failures: u32,
    /// Conductivity steps (enable, commands, read) that failed.
    pub conductivity_failures: u32,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycles: 0,
            calibrations: 0,
            pressure_frames_rejected: 0,
            pressure_channel_invalid: 0,
            probe_failures: 0,
            conductivity_failures: 0,
        }
    }
}

impl fmt::Display for CycleStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycles={} cal={} frames_rej={} p_invalid={} probe_fail={} ec_fail={}",
            self.cycles,
            self.calibrations,
            self.pressure_frames_rejected,
            self.pressure_channel_invalid,
            self.probe_failures,
            self.conductivity_failures,
        )
    }
}
