//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Driver / Adapter ──▶ Port trait ──▶ MeasurementService (domain)
//! ```
//!
//! Sensor drivers and board adapters implement these traits.  The
//! [`MeasurementService`](super::service::MeasurementService) and the
//! [`Node`](crate::scheduler::Node) loop consume them via generics, so the
//! measurement cycle never touches hardware directly and runs on the host
//! against mocks.

use crate::error::Result;
use crate::sensors::huba713::PressureReading;

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.
pub trait Clock {
    /// Milliseconds since boot.  Never goes backwards.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Power rails (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The two switched supply rails on the board.
pub trait PowerRailPort {
    /// 5 V rail.  Only the pressure sensor hangs off it.
    fn set_high_power(&mut self, on: bool);

    /// 3V3 rail.  Temperature probe and conductivity isolator.
    fn set_low_power(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapters: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Pressure + media temperature from the ZACwire sensor.
pub trait PressureSensorPort {
    /// One frame.  Never fails: an invalid frame comes back with
    /// `valid == false` and sentinel values filled in.
    fn read_pressure(&mut self) -> PressureReading;
}

/// One-wire temperature probe.
pub trait ProbeTemperaturePort {
    /// One full conversion, in degrees Celsius.
    fn read_probe_temperature(&mut self) -> Result<f32>;
}

/// Conductivity sensor behind the UART isolator.
pub trait ConductivityPort {
    /// Power up and wait for the boot banner.
    fn enable(&mut self) -> Result<()>;

    /// Power down and release the UART.
    fn disable(&mut self);

    fn disable_continuous_reading(&mut self) -> Result<()>;

    /// Temperature compensation in whole degrees Celsius.
    fn set_temperature(&mut self, celsius: u8) -> Result<()>;

    /// Dry calibration.
    fn calibrate(&mut self) -> Result<()>;

    /// Current reading, right-justified and zero padded.
    fn request_value(&mut self) -> Result<[u8; 8]>;
}

/// Everything the measurement cycle drives.
///
/// Blanket-implemented, so any adapter that provides the individual ports
/// can be handed to [`MeasurementService::run_cycle`](super::service::MeasurementService::run_cycle)
/// without a double mutable borrow.
pub trait NodeHardware:
    PowerRailPort + PressureSensorPort + ProbeTemperaturePort + ConductivityPort
{
}

impl<T> NodeHardware for T where
    T: PowerRailPort + PressureSensorPort + ProbeTemperaturePort + ConductivityPort
{
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Sleep / watchdog (driven adapters: scheduler → MCU)
// ───────────────────────────────────────────────────────────────

/// Device watchdog.
pub trait WatchdogPort {
    /// Start the watchdog.  Must not return before the watchdog's clock
    /// domain has synchronised, or an early reset can follow.
    fn arm(&mut self);

    /// Stop the watchdog (before low-power sleep).
    fn disarm(&mut self);

    /// Kick the watchdog.
    fn feed(&mut self);
}

/// Low-power idle.
pub trait LowPowerPort {
    /// Sleep until the next interrupt.
    ///
    /// Implementations must latch wake-ups that arrive between the caller's
    /// last pending-work check and the actual sleep entry.
    fn sleep(&mut self);
}
