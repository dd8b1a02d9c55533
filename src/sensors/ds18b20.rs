//! DS18B20 digital temperature probe on the one-wire bus.
//!
//! The probe is the only device on its bus, so every transaction is
//! addressed with SKIP ROM.  A measurement writes the resolution into the
//! configuration register, starts a conversion, waits the datasheet
//! conversion time, then polls the bus until the probe releases it.
//!
//! The probe occasionally answers a scratchpad read with all ones; such
//! reads are retried a bounded number of times.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::app::ports::{Clock, ProbeTemperaturePort};
use crate::config::{DS18B20_MAX_RETRIES, DS18B20_POLL_INTERVAL_MS, DS18B20_POLL_TIMEOUT_MS};
use crate::drivers::onewire::OneWireBus;
use crate::error::{Result, SensorError};

/// Reported when no usable reading could be taken.
pub const PROBE_SENTINEL_C: f32 = 100.0;

const CMD_SKIP_ROM: u8 = 0xCC;
const CMD_WRITE_SCRATCHPAD: u8 = 0x4E;
const CMD_CONVERT_T: u8 = 0x44;
const CMD_READ_SCRATCHPAD: u8 = 0xBE;

/// Configuration register resolution preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Bits9,
    Bits10,
    Bits11,
    Bits12,
}

impl Resolution {
    /// R1:R0 code.
    pub fn code(self) -> u8 {
        match self {
            Self::Bits9 => 0,
            Self::Bits10 => 1,
            Self::Bits11 => 2,
            Self::Bits12 => 3,
        }
    }

    /// Configuration register value.
    pub fn config_byte(self) -> u8 {
        self.code() << 5
    }

    /// Degrees Celsius per LSB.
    pub fn step(self) -> f32 {
        match self {
            Self::Bits9 => 0.5,
            Self::Bits10 => 0.25,
            Self::Bits11 => 0.125,
            Self::Bits12 => 0.0625,
        }
    }

    /// Worst-case conversion time.
    pub fn conversion_ms(self) -> u32 {
        match self {
            Self::Bits9 => 94,
            Self::Bits10 => 188,
            Self::Bits11 => 375,
            Self::Bits12 => 750,
        }
    }
}

/// Raw scratchpad temperature to degrees Celsius.
///
/// The low 15 bits are taken as a magnitude and the top bit as the sign.
pub fn raw_to_celsius(raw: u16, resolution: Resolution) -> f32 {
    let magnitude = f32::from(raw & 0x7FFF) * resolution.step();
    if raw & 0x8000 != 0 { -magnitude } else { magnitude }
}

pub struct Ds18b20<B, D, C> {
    bus: B,
    delay: D,
    clock: C,
    resolution: Resolution,
}

impl<B, D, C> Ds18b20<B, D, C>
where
    B: OneWireBus,
    D: DelayNs,
    C: Clock,
{
    pub fn new(bus: B, delay: D, clock: C, resolution: Resolution) -> Self {
        Self {
            bus,
            delay,
            clock,
            resolution,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// One full conversion at `resolution`.
    pub fn measure(&mut self, resolution: Resolution) -> Result<f32> {
        self.write_config(resolution)?;
        self.start_conversion()?;
        self.delay.delay_ms(resolution.conversion_ms());
        self.wait_ready()?;
        let raw = self.read_raw_with_retries()?;
        let celsius = raw_to_celsius(raw, resolution);
        debug!("ds18b20: raw=0x{:04X} -> {:.4} C", raw, celsius);
        Ok(celsius)
    }

    /// Like [`measure`](Self::measure), but never fails: any error comes
    /// back as [`PROBE_SENTINEL_C`].
    pub fn read(&mut self, resolution: Resolution) -> f32 {
        match self.measure(resolution) {
            Ok(c) => c,
            Err(e) => {
                warn!("ds18b20: {} (reporting {:.1})", e, PROBE_SENTINEL_C);
                PROBE_SENTINEL_C
            }
        }
    }

    fn select(&mut self) -> Result<()> {
        if !self.bus.reset()? {
            return Err(SensorError::NoDevice.into());
        }
        self.bus.write_byte(CMD_SKIP_ROM)
    }

    fn write_config(&mut self, resolution: Resolution) -> Result<()> {
        self.select()?;
        self.bus.write_byte(CMD_WRITE_SCRATCHPAD)?;
        // TH, TL alarm registers are unused.
        self.bus.write_byte(0x00)?;
        self.bus.write_byte(0x00)?;
        self.bus.write_byte(resolution.config_byte())
    }

    fn start_conversion(&mut self) -> Result<()> {
        self.select()?;
        self.bus.write_byte(CMD_CONVERT_T)
    }

    /// The probe holds read slots low until the conversion finishes.
    fn wait_ready(&mut self) -> Result<()> {
        let start = self.clock.now_ms();
        loop {
            self.delay.delay_ms(DS18B20_POLL_INTERVAL_MS);
            if self.clock.now_ms().saturating_sub(start) > DS18B20_POLL_TIMEOUT_MS {
                return Err(SensorError::Timeout.into());
            }
            if self.bus.read_bit()? {
                return Ok(());
            }
        }
    }

    fn read_raw(&mut self) -> Result<u16> {
        self.select()?;
        self.bus.write_byte(CMD_READ_SCRATCHPAD)?;
        let lsb = self.bus.read_byte()?;
        let msb = self.bus.read_byte()?;
        Ok(u16::from_le_bytes([lsb, msb]))
    }

    fn read_raw_with_retries(&mut self) -> Result<u16> {
        for attempt in 0..=DS18B20_MAX_RETRIES {
            let raw = self.read_raw()?;
            if raw != 0xFFFF {
                return Ok(raw);
            }
            debug!("ds18b20: all-ones scratchpad (attempt {})", attempt + 1);
        }
        Err(SensorError::IntegrityFailure.into())
    }
}

impl<B, D, C> ProbeTemperaturePort for Ds18b20<B, D, C>
where
    B: OneWireBus,
    D: DelayNs,
    C: Clock,
{
    fn read_probe_temperature(&mut self) -> Result<f32> {
        let resolution = self.resolution;
        self.measure(resolution)
    }
}
