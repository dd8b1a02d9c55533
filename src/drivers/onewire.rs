//! Bit-banged one-wire master, standard speed.
//!
//! Drives a single open-drain line with an external pull-up: `set_low()`
//! pulls the bus down, `set_high()` releases it.  Every time slot runs inside
//! a critical section so an interrupt can't stretch a slot past its window.
//!
//! Only ROM-skip addressing is used on this board, so there is no search or
//! match-ROM support.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::{
    OW_TIME_A_US, OW_TIME_B_US, OW_TIME_C_US, OW_TIME_D_US, OW_TIME_E_US, OW_TIME_F_US,
    OW_TIME_H_US, OW_TIME_I_US, OW_TIME_J_US,
};
use crate::error::{IoError, Result};

/// Byte-level one-wire operations.  [`Ds18b20`](crate::sensors::ds18b20::Ds18b20)
/// is generic over this so it can run against a scripted bus in tests.
pub trait OneWireBus {
    /// Reset pulse.  `Ok(true)` iff at least one device answered with a
    /// presence pulse.
    fn reset(&mut self) -> Result<bool>;

    fn write_bit(&mut self, bit: bool) -> Result<()>;

    fn read_bit(&mut self) -> Result<bool>;

    /// LSB first.
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    /// LSB first.
    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }
}

/// One-wire master on an open-drain GPIO.
pub struct OneWire<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> OneWire<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    /// Takes the line and leaves it released.
    pub fn new(mut pin: P, delay: D) -> Result<Self> {
        pin.set_high().map_err(|_| IoError::GpioWrite)?;
        Ok(Self { pin, delay })
    }

    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    fn pull_low(&mut self) -> Result<()> {
        self.pin.set_low().map_err(|_| IoError::GpioWrite.into())
    }

    fn let_go(&mut self) -> Result<()> {
        self.pin.set_high().map_err(|_| IoError::GpioWrite.into())
    }

    fn sample(&mut self) -> Result<bool> {
        self.pin.is_high().map_err(|_| IoError::GpioRead.into())
    }
}

impl<P, D> OneWireBus for OneWire<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn reset(&mut self) -> Result<bool> {
        critical_section::with(|_| -> Result<bool> {
            self.pull_low()?;
            self.delay.delay_us(OW_TIME_H_US);
            self.let_go()?;
            self.delay.delay_us(OW_TIME_I_US);
            let line_high = self.sample()?;
            self.delay.delay_us(OW_TIME_J_US);
            Ok(!line_high)
        })
    }

    fn write_bit(&mut self, bit: bool) -> Result<()> {
        let (low_us, high_us) = if bit {
            (OW_TIME_A_US, OW_TIME_B_US)
        } else {
            (OW_TIME_C_US, OW_TIME_D_US)
        };
        critical_section::with(|_| -> Result<()> {
            self.pull_low()?;
            self.delay.delay_us(low_us);
            self.let_go()?;
            self.delay.delay_us(high_us);
            Ok(())
        })
    }

    fn read_bit(&mut self) -> Result<bool> {
        critical_section::with(|_| -> Result<bool> {
            self.pull_low()?;
            self.delay.delay_us(OW_TIME_A_US);
            self.let_go()?;
            self.delay.delay_us(OW_TIME_E_US);
            let bit = self.sample()?;
            self.delay.delay_us(OW_TIME_F_US);
            Ok(bit)
        })
    }
}
