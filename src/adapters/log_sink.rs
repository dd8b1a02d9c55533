//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC on the board).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::CycleStarted { calibration } => {
                info!("CYCLE | start{}", if *calibration { " +cal" } else { "" });
            }
            AppEvent::SensorFault { sensor, error } => {
                warn!("FAULT | {:?}: {}", sensor, error);
            }
            AppEvent::CalibrationPerformed { ok } => {
                info!("CAL   | dry calibration {}", if *ok { "OK" } else { "FAILED" });
            }
            AppEvent::CycleCompleted(r) => {
                let ec = r.packet.conductivity;
                let ec_text = ec
                    .iter()
                    .position(|&b| b != 0)
                    .and_then(|start| core::str::from_utf8(&ec[start..]).ok())
                    .unwrap_or("-");
                info!(
                    "DATA  | p={} ({}/{} bad) | T_p={:.2}\u{00b0}C | T_probe={:.4}\u{00b0}C | \
                     EC={} | flags=0x{:02X}",
                    r.packet.pressure,
                    r.pressure_failures,
                    r.pressure_samples,
                    r.packet.pressure_temp,
                    r.packet.probe_temp,
                    ec_text,
                    r.packet.flags,
                );
            }
        }
    }
}
