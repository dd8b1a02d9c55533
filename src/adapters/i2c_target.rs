//! Host bus transport: I²C target at [`HOST_BUS_ADDRESS`].
//!
//! A dedicated high-priority task blocks on the target driver, hands every
//! received command byte to the [`CommandHandler`], queues any response
//! bytes for the next host read, and wakes the main loop when a cycle has
//! been requested.
//!
//! The response to `0x11` only exists once this task has seen the command
//! byte, so the host must end the write transaction and wait at least
//! [`HOST_READ_DELAY_MS`] before reading.  A write then repeated-start read
//! is not supported.  Anything still sitting in the transmit FIFO is thrown
//! away before a response is queued, so a read never returns a stale packet.
//!
//! The handler itself stays interrupt-safe (no blocking, no logging); only
//! this task logs.

use core::fmt::Display;

use log::{debug, warn};

use crate::protocol::CommandHandler;
use crate::shared::SharedState;

#[cfg(target_os = "espidf")]
pub use esp::start;

/// Minimum gap the host leaves between writing `0x11` and reading.
pub const HOST_READ_DELAY_MS: u32 = 2;

/// Byte-level view of an I²C target peripheral.
pub trait TargetPort {
    type Error: Display;

    /// Block until the host writes a command byte.  `None` for an empty
    /// transaction.
    fn read_command(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Drop whatever the transmit FIFO still holds.
    fn discard_pending(&mut self) -> Result<(), Self::Error>;

    /// Queue `bytes` for the next host read.
    fn queue_response(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Handle one command transaction.  Returns `true` when the main loop has
/// work waiting and should be woken.
pub fn serve_one<T: TargetPort>(
    port: &mut T,
    handler: &CommandHandler<'_>,
    shared: &SharedState,
    out: &mut [u8],
) -> bool {
    let cmd = match port.read_command() {
        Ok(Some(cmd)) => cmd,
        Ok(None) => return false,
        Err(e) => {
            warn!("host bus: read failed: {}", e);
            return false;
        }
    };

    let n = handler.on_command(cmd, out);
    debug!("host bus: cmd 0x{:02X} -> {} bytes", cmd, n);
    if n > 0 {
        if let Err(e) = port.discard_pending() {
            warn!("host bus: tx fifo reset failed: {}", e);
        }
        if let Err(e) = port.queue_response(&out[..n]) {
            warn!("host bus: response write failed: {}", e);
        }
    }
    shared.is_work_pending()
}

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_hal::delay::{BLOCK, TickType};
    use esp_idf_hal::gpio::{InputPin, OutputPin};
    use esp_idf_hal::i2c::{I2c, I2cSlaveConfig, I2cSlaveDriver};
    use esp_idf_hal::peripheral::Peripheral;
    use esp_idf_hal::sys::{EspError, esp, i2c_port_t, i2c_reset_tx_fifo};
    use log::info;

    use super::{TargetPort, serve_one};
    use crate::adapters::wake::Waker;
    use crate::config::HOST_BUS_ADDRESS;
    use crate::drivers::task_pin::{Core, spawn_on_core};
    use crate::error::{Error, Result};
    use crate::packet::WIRE_LEN;
    use crate::protocol::CommandHandler;
    use crate::shared::SharedState;

    const TARGET_BUF_LEN: usize = 128;
    const RESPONSE_TIMEOUT_MS: u64 = 50;

    struct EspTarget {
        driver: I2cSlaveDriver<'static>,
        port: i2c_port_t,
        reply_ticks: u32,
    }

    impl TargetPort for EspTarget {
        type Error = EspError;

        fn read_command(&mut self) -> core::result::Result<Option<u8>, EspError> {
            let mut cmd = [0u8; 1];
            let n = self.driver.read(&mut cmd, BLOCK)?;
            Ok((n == 1).then_some(cmd[0]))
        }

        fn discard_pending(&mut self) -> core::result::Result<(), EspError> {
            // SAFETY: the port is owned by `driver`, which is installed.
            esp!(unsafe { i2c_reset_tx_fifo(self.port) })
        }

        fn queue_response(&mut self, bytes: &[u8]) -> core::result::Result<(), EspError> {
            self.driver.write(bytes, self.reply_ticks).map(|_| ())
        }
    }

    /// Create the target driver and start the transport task.
    pub fn start<I2C: I2c>(
        i2c: impl Peripheral<P = I2C> + 'static,
        sda: impl Peripheral<P = impl InputPin + OutputPin> + 'static,
        scl: impl Peripheral<P = impl InputPin + OutputPin> + 'static,
        shared: &'static SharedState,
        waker: Waker,
    ) -> Result<()> {
        let config = I2cSlaveConfig::new()
            .sda_enable_pullup(true)
            .scl_enable_pullup(true)
            .rx_buffer_length(TARGET_BUF_LEN)
            .tx_buffer_length(TARGET_BUF_LEN);
        let driver = I2cSlaveDriver::new(i2c, sda, scl, HOST_BUS_ADDRESS, &config)
            .map_err(|_| Error::Init("i2c target"))?;
        info!("host bus: I2C target at 0x{:02X}", HOST_BUS_ADDRESS);

        let mut target = EspTarget {
            driver,
            port: I2C::port(),
            reply_ticks: TickType::new_millis(RESPONSE_TIMEOUT_MS).ticks(),
        };
        spawn_on_core(Core::Pro, 10, 4, "host-bus\0", move || {
            let handler = CommandHandler::new(shared);
            let mut out = [0u8; WIRE_LEN];
            loop {
                if serve_one(&mut target, &handler, shared, &mut out) {
                    waker.wake();
                }
            }
        })
        .map_err(|_| Error::Init("host bus task"))?;
        Ok(())
    }
}
