//! EZO-EC UART link over the ESP-IDF UART driver.
//!
//! While the isolator is unpowered the TX pin is detached from the UART and
//! left floating so it can't back-feed the isolator through its input.

use esp_idf_hal::delay::TickType;
use esp_idf_hal::uart::UartDriver;
use esp_idf_svc::sys::{
    UART_PIN_NO_CHANGE, esp, gpio_mode_t_GPIO_MODE_INPUT, gpio_set_direction, uart_set_pin,
};
use log::warn;

use crate::error::{Error, Result};
use crate::sensors::ezo_ec::EzoLink;

/// Longest a single `read()` blocks waiting for the first byte.
const READ_WAIT_MS: u64 = 10;

pub struct EzoUart {
    uart: UartDriver<'static>,
    tx_gpio: i32,
    rx_gpio: i32,
}

impl EzoUart {
    pub fn new(uart: UartDriver<'static>, tx_gpio: i32, rx_gpio: i32) -> Self {
        let mut link = Self {
            uart,
            tx_gpio,
            rx_gpio,
        };
        link.power_down();
        link
    }
}

impl embedded_io::ErrorType for EzoUart {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Read for EzoUart {
    fn read(&mut self, buf: &mut [u8]) -> core::result::Result<usize, Self::Error> {
        let ticks = TickType::new_millis(READ_WAIT_MS).ticks();
        self.uart
            .read(buf, ticks)
            .map_err(|_| embedded_io::ErrorKind::Other)
    }
}

impl embedded_io::ReadReady for EzoUart {
    fn read_ready(&mut self) -> core::result::Result<bool, Self::Error> {
        self.uart
            .remaining_read()
            .map(|n| n > 0)
            .map_err(|_| embedded_io::ErrorKind::Other)
    }
}

impl embedded_io::Write for EzoUart {
    fn write(&mut self, buf: &[u8]) -> core::result::Result<usize, Self::Error> {
        self.uart
            .write(buf)
            .map_err(|_| embedded_io::ErrorKind::Other)
    }

    fn flush(&mut self) -> core::result::Result<(), Self::Error> {
        let ticks = TickType::new_millis(100).ticks();
        self.uart
            .wait_tx_done(ticks)
            .map_err(|_| embedded_io::ErrorKind::TimedOut)
    }
}

impl EzoLink for EzoUart {
    fn power_up(&mut self) -> Result<()> {
        // SAFETY: re-routes pins owned by this driver.
        unsafe {
            esp!(uart_set_pin(
                self.uart.port(),
                self.tx_gpio,
                self.rx_gpio,
                UART_PIN_NO_CHANGE,
                UART_PIN_NO_CHANGE,
            ))
            .map_err(|_| Error::Init("ezo uart pins"))?;
        }
        self.uart.clear_rx().map_err(|_| Error::Init("ezo uart rx"))?;
        Ok(())
    }

    fn power_down(&mut self) {
        // SAFETY: the TX pin belongs to this driver.
        let ret = unsafe { gpio_set_direction(self.tx_gpio, gpio_mode_t_GPIO_MODE_INPUT) };
        if ret != 0 {
            warn!("ezo uart: could not float TX ({})", ret);
        }
        let _ = self.uart.clear_rx();
    }
}
