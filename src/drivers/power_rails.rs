//! Switched supply rails.
//!
//! - 5 V: high-side switch, active-high.  Feeds the pressure transmitter.
//! - 3V3: P-channel switch, active-low.  Feeds the probe and the
//!   conductivity isolator.
//!
//! Both rails are forced off when the driver is built.

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::app::ports::PowerRailPort;

pub struct PowerRails<P5, P3> {
    enable_5v: P5,
    enable_3v3_n: P3,
}

impl<P5: OutputPin, P3: OutputPin> PowerRails<P5, P3> {
    pub fn new(enable_5v: P5, enable_3v3_n: P3) -> Self {
        let mut rails = Self {
            enable_5v,
            enable_3v3_n,
        };
        rails.set_high_power(false);
        rails.set_low_power(false);
        rails
    }
}

impl<P5: OutputPin, P3: OutputPin> PowerRailPort for PowerRails<P5, P3> {
    fn set_high_power(&mut self, on: bool) {
        let res = if on {
            self.enable_5v.set_high()
        } else {
            self.enable_5v.set_low()
        };
        if res.is_err() {
            warn!("rails: 5V switch write failed");
        }
        debug!("rails: 5V {}", if on { "on" } else { "off" });
    }

    fn set_low_power(&mut self, on: bool) {
        let res = if on {
            self.enable_3v3_n.set_low()
        } else {
            self.enable_3v3_n.set_high()
        };
        if res.is_err() {
            warn!("rails: 3V3 switch write failed");
        }
        debug!("rails: 3V3 {}", if on { "on" } else { "off" });
    }
}
