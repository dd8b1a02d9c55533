//! Huba Control 713 pressure transmitter (ZACwire output).
//!
//! The transmitter streams a three-byte frame: a big-endian 16-bit pressure
//! count followed by one byte of media temperature.

use log::warn;

use crate::app::ports::PressureSensorPort;
use crate::drivers::zacwire::SingleWireDecoder;

/// Frame length in bytes.
pub const HUBA_FRAME_LEN: usize = 3;

/// Temperature reported with an invalid frame.
pub const PRESSURE_TEMP_SENTINEL_C: f32 = 200.0;

/// One pressure sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureReading {
    pub pressure: u16,
    pub temperature: f32,
    pub valid: bool,
}

impl PressureReading {
    /// Sentinel reading: pressure 0, temperature 200 C.
    pub const fn invalid() -> Self {
        Self {
            pressure: 0,
            temperature: PRESSURE_TEMP_SENTINEL_C,
            valid: false,
        }
    }

    /// Decode a raw frame.
    pub fn from_frame(frame: [u8; HUBA_FRAME_LEN]) -> Self {
        Self {
            pressure: u16::from_be_bytes([frame[0], frame[1]]),
            temperature: 0.784 * f32::from(frame[2]) - 50.0,
            valid: true,
        }
    }
}

pub struct Huba713<Z> {
    decoder: Z,
}

impl<Z: SingleWireDecoder> Huba713<Z> {
    pub fn new(decoder: Z) -> Self {
        Self { decoder }
    }

    /// One frame; any decode failure yields [`PressureReading::invalid`].
    pub fn read(&mut self) -> PressureReading {
        match self.decoder.read_frame(HUBA_FRAME_LEN) {
            Ok(frame) => match <[u8; HUBA_FRAME_LEN]>::try_from(frame.as_bytes()) {
                Ok(bytes) => PressureReading::from_frame(bytes),
                Err(_) => {
                    warn!("huba713: short frame ({} bytes)", frame.len());
                    PressureReading::invalid()
                }
            },
            Err(e) => {
                warn!("huba713: {}", e);
                PressureReading::invalid()
            }
        }
    }
}

impl<Z: SingleWireDecoder> PressureSensorPort for Huba713<Z> {
    fn read_pressure(&mut self) -> PressureReading {
        self.read()
    }
}
