//! Atlas Scientific EZO-EC conductivity circuit, UART mode.
//!
//! The circuit sits behind a galvanic isolator whose supply is switched by
//! an enable line.  Commands are ASCII terminated by `\r`; every command
//! except `R` answers with a single `*OK` line.  After power-up the circuit
//! announces itself with `*RE`.
//!
//! ```text
//!   node                         EZO-EC
//!    │ ── enable ──────────────▶  │
//!    │ ◀────────────── "*RE\r" ── │
//!    │ ── "C,0\r" ─────────────▶  │
//!    │ ◀────────────── "*OK\r" ── │
//!    │ ── "R\r" ───────────────▶  │
//!    │ ◀────── "7.2\r*OK\r" ───── │
//! ```

use core::fmt::Write as _;

use embedded_hal::digital::OutputPin;
use embedded_io::{Read, ReadReady, Write};
use heapless::String;
use log::{debug, info, warn};

use crate::app::ports::{Clock, ConductivityPort};
use crate::error::{Error, IoError, Result, SensorError};

/// Width of the conductivity field.
pub const VALUE_LEN: usize = 8;

/// Longest line buffered from the circuit, terminator excluded.
const MAX_LINE_CHARS: usize = 9;

const BOOT_BANNER: &str = "*RE";
const ACK: &str = "*OK";

/// A response line.
pub type Line = String<10>;

/// The UART the circuit talks on, plus the ability to take it down while
/// the isolator is unpowered.
pub trait EzoLink: Read + Write + ReadReady {
    /// (Re)initialise the UART.
    fn power_up(&mut self) -> Result<()>;

    /// Disable the UART.  TX must not back-power the isolator.
    fn power_down(&mut self);
}

/// Timeouts for one driver instance.
#[derive(Debug, Clone, Copy)]
pub struct EzoTimeouts {
    pub boot_ms: u64,
    pub response_ms: u64,
}

pub struct EzoEc<U, E, C> {
    link: U,
    enable: E,
    clock: C,
    timeouts: EzoTimeouts,
}

impl<U, E, C> EzoEc<U, E, C>
where
    U: EzoLink,
    E: OutputPin,
    C: Clock,
{
    pub fn new(link: U, enable: E, clock: C, timeouts: EzoTimeouts) -> Self {
        Self {
            link,
            enable,
            clock,
            timeouts,
        }
    }

    /// Borrow the link, e.g. to inspect a test double.
    pub fn link(&self) -> &U {
        &self.link
    }

    /// Discard whatever is sitting in the RX FIFO.
    fn flush_rx(&mut self) -> Result<()> {
        let mut scratch = [0u8; 16];
        while self.link.read_ready().map_err(|_| IoError::UartRead)? {
            let n = self.link.read(&mut scratch).map_err(|_| IoError::UartRead)?;
            if n == 0 {
                break;
            }
        }
        Ok(())
    }

    fn send(&mut self, cmd: &str) -> Result<()> {
        debug!("ezo-ec: > {:?}", cmd);
        self.link
            .write_all(cmd.as_bytes())
            .map_err(|_| IoError::UartWrite)?;
        self.link.flush().map_err(|_| IoError::UartWrite)?;
        Ok(())
    }

    /// Next byte, or `None` once `budget_ms` past `start_ms` has elapsed.
    fn read_byte(&mut self, start_ms: u64, budget_ms: u64) -> Result<Option<u8>> {
        loop {
            if self.link.read_ready().map_err(|_| IoError::UartRead)? {
                let mut b = [0u8; 1];
                if self.link.read(&mut b).map_err(|_| IoError::UartRead)? == 1 {
                    return Ok(Some(b[0]));
                }
            }
            if self.clock.now_ms().saturating_sub(start_ms) > budget_ms {
                return Ok(None);
            }
            core::hint::spin_loop();
        }
    }

    /// Read up to `\r`, keeping at most [`MAX_LINE_CHARS`] characters.  The
    /// rest of an over-long line is consumed so the next reply starts clean.
    fn read_line(&mut self, budget_ms: u64) -> Result<Line> {
        let start = self.clock.now_ms();
        let mut line = Line::new();
        loop {
            let Some(b) = self.read_byte(start, budget_ms)? else {
                return Err(SensorError::Timeout.into());
            };
            if b == b'\r' {
                break;
            }
            // Only printable ASCII is meaningful; drop line noise.
            if b.is_ascii() && !b.is_ascii_control() && line.len() < MAX_LINE_CHARS {
                let _ = line.push(char::from(b));
            }
        }
        debug!("ezo-ec: < {:?}", line.as_str());
        Ok(line)
    }

    /// Send `cmd` and require a `*OK` answer.
    fn command(&mut self, cmd: &str) -> Result<()> {
        self.send(cmd)?;
        let line = self.read_line(self.timeouts.response_ms)?;
        if line == ACK {
            Ok(())
        } else {
            warn!("ezo-ec: {:?} answered {:?}", cmd.trim_end(), line.as_str());
            Err(SensorError::ProtocolNak.into())
        }
    }

    fn wait_for_boot(&mut self) -> Result<()> {
        let start = self.clock.now_ms();
        let budget = self.timeouts.boot_ms;
        loop {
            let elapsed = self.clock.now_ms().saturating_sub(start);
            if elapsed > budget {
                return Err(SensorError::NoDevice.into());
            }
            match self.read_line(budget - elapsed) {
                Ok(line) if line == BOOT_BANNER => return Ok(()),
                Ok(_) => {}
                Err(Error::Sensor(SensorError::Timeout)) => {
                    return Err(SensorError::NoDevice.into());
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<U, E, C> ConductivityPort for EzoEc<U, E, C>
where
    U: EzoLink,
    E: OutputPin,
    C: Clock,
{
    fn enable(&mut self) -> Result<()> {
        self.enable.set_high().map_err(|_| IoError::GpioWrite)?;
        self.link.power_up()?;
        self.wait_for_boot()?;
        info!("ezo-ec: ready");
        Ok(())
    }

    fn disable(&mut self) {
        if self.enable.set_low().is_err() {
            warn!("ezo-ec: could not release enable line");
        }
        self.link.power_down();
    }

    fn disable_continuous_reading(&mut self) -> Result<()> {
        self.command("C,0\r")
    }

    fn set_temperature(&mut self, celsius: u8) -> Result<()> {
        let mut cmd: String<10> = String::new();
        write!(cmd, "T,{}\r", celsius).map_err(|_| IoError::UartWrite)?;
        self.command(&cmd)
    }

    fn calibrate(&mut self) -> Result<()> {
        self.command("Cal,dry\r")
    }

    fn request_value(&mut self) -> Result<[u8; VALUE_LEN]> {
        self.flush_rx()?;
        self.send("R\r")?;

        let start = self.clock.now_ms();
        let mut raw: heapless::Vec<u8, VALUE_LEN> = heapless::Vec::new();
        while !raw.is_full() {
            let Some(b) = self.read_byte(start, self.timeouts.response_ms)? else {
                return Err(SensorError::Timeout.into());
            };
            if b == b'\r' {
                break;
            }
            let _ = raw.push(b);
        }

        self.flush_rx()?;
        Ok(right_justify(&raw))
    }
}

/// Right-justify `raw` into the fixed field, zero padded on the left.
pub fn right_justify(raw: &[u8]) -> [u8; VALUE_LEN] {
    let mut out = [0u8; VALUE_LEN];
    let n = raw.len().min(VALUE_LEN);
    out[VALUE_LEN - n..].copy_from_slice(&raw[..n]);
    out
}
