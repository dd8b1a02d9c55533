//! Task Watchdog Timer (TWDT) driver.
//!
//! The main task is subscribed while awake and unsubscribed around sleep,
//! so a long idle period never counts as a stall.  A cycle must feed the
//! watchdog at least every 8 seconds.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

use crate::app::ports::WatchdogPort;

/// Stall budget for the main task.
pub const WATCHDOG_TIMEOUT_MS: u32 = 8_000;

pub struct Watchdog {
    subscribed: bool,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Configure the TWDT.  The task is not subscribed until [`arm`](WatchdogPort::arm).
    pub fn new() -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: reconfiguring the TWDT from the main task at boot.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms: WATCHDOG_TIMEOUT_MS,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!(
                        "TWDT reconfigure returned {} (may already be configured)",
                        ret
                    );
                }
            }
            info!("Watchdog: {} ms, panic on trigger", WATCHDOG_TIMEOUT_MS);
        }

        #[cfg(not(target_os = "espidf"))]
        info!("Watchdog(sim): no-op");

        Self { subscribed: false }
    }

    pub fn is_armed(&self) -> bool {
        self.subscribed
    }
}

impl WatchdogPort for Watchdog {
    fn arm(&mut self) {
        if self.subscribed {
            return;
        }
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: subscribes the calling (main) task.  The call returns
            // once the TWDT has registered it, so no extra sync is needed.
            let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
            if ret != ESP_OK {
                log::warn!("Watchdog: failed to subscribe ({})", ret);
                return;
            }
        }
        self.subscribed = true;
    }

    fn disarm(&mut self) {
        if !self.subscribed {
            return;
        }
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: the main task is subscribed (checked above).
            unsafe {
                esp_task_wdt_delete(core::ptr::null_mut());
            }
        }
        self.subscribed = false;
    }

    fn feed(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: the main task is subscribed.
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}
