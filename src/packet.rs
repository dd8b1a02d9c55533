//! Result packet returned to the host.
//!
//! Wire layout, little-endian, 20 bytes total:
//!
//! ```text
//!  0      1..3       3..7          7..11        11..19          19
//! ┌─────┬──────────┬─────────────┬────────────┬───────────────┬───────┐
//! │ len │ pressure │ press. temp │ probe temp │ conductivity  │ flags │
//! │ u8  │ u16      │ f32         │ f32        │ [u8; 8] ASCII │ u8    │
//! └─────┴──────────┴─────────────┴────────────┴───────────────┴───────┘
//! ```
//!
//! `len` counts the bytes after itself (19).  Inside the firmware each
//! field of a [`Measurement`] is an `Option`; sentinels only appear when
//! the measurement is flattened into a [`ResultPacket`].

use crate::sensors::ds18b20::PROBE_SENTINEL_C;
use crate::sensors::ezo_ec::VALUE_LEN;
use crate::sensors::huba713::PRESSURE_TEMP_SENTINEL_C;

/// Payload bytes following the length prefix.
pub const PACKET_LEN: u8 = 19;
/// Length prefix plus payload.
pub const WIRE_LEN: usize = PACKET_LEN as usize + 1;

/// The cycle that produced this packet ran a dry calibration.
pub const FLAG_CALIBRATED: u8 = 0x01;

/// Fixed-layout result.  A zeroed packet means "nothing measured since the
/// last fetch".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultPacket {
    pub pressure: u16,
    pub pressure_temp: f32,
    pub probe_temp: f32,
    pub conductivity: [u8; VALUE_LEN],
    pub flags: u8,
}

impl Default for ResultPacket {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl ResultPacket {
    pub const fn zeroed() -> Self {
        Self {
            pressure: 0,
            pressure_temp: 0.0,
            probe_temp: 0.0,
            conductivity: [0; VALUE_LEN],
            flags: 0,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.flags & FLAG_CALIBRATED != 0
    }

    pub fn to_bytes(&self) -> [u8; WIRE_LEN] {
        let mut out = [0u8; WIRE_LEN];
        out[0] = PACKET_LEN;
        out[1..3].copy_from_slice(&self.pressure.to_le_bytes());
        out[3..7].copy_from_slice(&self.pressure_temp.to_le_bytes());
        out[7..11].copy_from_slice(&self.probe_temp.to_le_bytes());
        out[11..19].copy_from_slice(&self.conductivity);
        out[19] = self.flags;
        out
    }

    /// Copy the wire form into `out`, truncating if it is short.  Returns
    /// the number of bytes written.
    pub fn encode(&self, out: &mut [u8]) -> usize {
        let bytes = self.to_bytes();
        let n = out.len().min(WIRE_LEN);
        out[..n].copy_from_slice(&bytes[..n]);
        n
    }

    /// Parse a wire packet as the host would.
    pub fn from_wire(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < WIRE_LEN || bytes[0] != PACKET_LEN {
            return None;
        }
        let mut conductivity = [0u8; VALUE_LEN];
        conductivity.copy_from_slice(&bytes[11..19]);
        Some(Self {
            pressure: u16::from_le_bytes([bytes[1], bytes[2]]),
            pressure_temp: f32::from_le_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]),
            probe_temp: f32::from_le_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]),
            conductivity,
            flags: bytes[19],
        })
    }
}

/// Outcome of one measurement cycle, before sentinels are applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurement {
    /// Median pressure count and media temperature.
    pub pressure: Option<(u16, f32)>,
    pub probe_temp: Option<f32>,
    pub conductivity: Option<[u8; VALUE_LEN]>,
    pub calibrated: bool,
}

impl From<&Measurement> for ResultPacket {
    fn from(m: &Measurement) -> Self {
        let (pressure, pressure_temp) = m.pressure.unwrap_or((0, PRESSURE_TEMP_SENTINEL_C));
        Self {
            pressure,
            pressure_temp,
            probe_temp: m.probe_temp.unwrap_or(PROBE_SENTINEL_C),
            conductivity: m.conductivity.unwrap_or([0; VALUE_LEN]),
            flags: if m.calibrated { FLAG_CALIBRATED } else { 0 },
        }
    }
}
