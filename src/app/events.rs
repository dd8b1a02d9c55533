//! Outbound application events.
//!
//! The [`MeasurementService`](super::service::MeasurementService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them; on the board they go to the
//! serial log.

use crate::error::Error;
use crate::packet::ResultPacket;

/// Which sensor a fault came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    Pressure,
    Probe,
    Conductivity,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A cycle started; `calibration` is set if one was requested.
    CycleStarted { calibration: bool },

    /// A sensor failed and its field will carry a sentinel.
    SensorFault { sensor: Sensor, error: Error },

    /// A dry calibration was attempted.
    CalibrationPerformed { ok: bool },

    /// The cycle published its packet.
    CycleCompleted(CycleReport),
}

/// Summary of one finished cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub packet: ResultPacket,
    /// Pressure frames that failed out of the burst.
    pub pressure_failures: usize,
    pub pressure_samples: usize,
}
