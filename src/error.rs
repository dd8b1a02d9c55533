//! Unified error types for the MFM sensor firmware.
//!
//! Every fallible driver operation funnels into [`Error`].  All variants are
//! `Copy` so they can be carried through the orchestrator and the event sink
//! without allocation.  None of these ever reach the host: the measurement
//! cycle absorbs them into per-field sentinels.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor did not answer, answered late, or answered garbage.
    Sensor(SensorError),
    /// A GPIO line or the UART peripheral reported a failure.
    Io(IoError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The bus never reached the expected state in time.
    Timeout,
    /// Parity or idle-pattern check failed.
    IntegrityFailure,
    /// No presence pulse / boot banner was seen.
    NoDevice,
    /// The sensor replied with something other than the expected acknowledgement.
    ProtocolNak,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::IntegrityFailure => write!(f, "integrity check failed"),
            Self::NoDevice => write!(f, "no device"),
            Self::ProtocolNak => write!(f, "unexpected response"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Peripheral I/O errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    GpioRead,
    GpioWrite,
    UartRead,
    UartWrite,
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioRead => write!(f, "GPIO read failed"),
            Self::GpioWrite => write!(f, "GPIO write failed"),
            Self::UartRead => write!(f, "UART read failed"),
            Self::UartWrite => write!(f, "UART write failed"),
        }
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
