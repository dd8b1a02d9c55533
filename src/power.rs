//! Low-power idle with watchdog hand-off.
//!
//! The watchdog can't run while the core sleeps, so it is stopped right
//! before sleep and restarted (and synchronised) right after wake-up.

use log::debug;

use crate::app::ports::{LowPowerPort, WatchdogPort};
use crate::shared::SharedState;

pub struct SleepController<W, L> {
    watchdog: W,
    low_power: L,
    sleeps: u32,
}

impl<W: WatchdogPort, L: LowPowerPort> SleepController<W, L> {
    pub fn new(watchdog: W, low_power: L) -> Self {
        Self {
            watchdog,
            low_power,
            sleeps: 0,
        }
    }

    /// Arm the watchdog for the main loop.
    pub fn start(&mut self) {
        self.watchdog.arm();
    }

    pub fn feed(&mut self) {
        self.watchdog.feed();
    }

    /// Sleep until the next interrupt unless a measurement is already
    /// pending.  Returns whether the core actually slept.
    pub fn sleep_unless_pending(&mut self, shared: &SharedState) -> bool {
        if shared.is_work_pending() {
            debug!("sleep: skipped, work pending");
            return false;
        }
        self.watchdog.disarm();
        self.low_power.sleep();
        self.watchdog.arm();
        self.sleeps = self.sleeps.wrapping_add(1);
        true
    }

    pub fn sleeps(&self) -> u32 {
        self.sleeps
    }

    pub fn parts(&self) -> (&W, &L) {
        (&self.watchdog, &self.low_power)
    }
}
