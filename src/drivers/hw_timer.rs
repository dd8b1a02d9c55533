//! Capture timer for the ZACwire decoder, built on the ESP-IDF general
//! purpose timer and the GPIO ISR service.
//!
//! The timer counts at 1 MHz and raises a one-shot alarm `ticks` after each
//! [`restart`](CaptureTimer::restart).  The line's falling-edge interrupt
//! and the alarm both dispatch to plain `fn()` hooks, which in the firmware
//! point at the `static` [`ZacwireBus`](super::zacwire::ZacwireBus).
//!
//! Both callbacks execute in ISR context.

use core::ffi::c_void;

use esp_idf_svc::sys::*;
use log::info;

use super::zacwire::CaptureTimer;
use crate::config::ZACWIRE_TIMER_HZ;
use crate::error::{Error, Result};

pub struct EspCaptureTimer {
    timer: gptimer_handle_t,
    gpio: gpio_num_t,
    running: bool,
}

// SAFETY: the handle is only touched through the gptimer API, which is
// safe to call from any task or ISR once the timer exists.
unsafe impl Send for EspCaptureTimer {}

/// SAFETY: `arg` is the `fn()` registered in `EspCaptureTimer::new`.
unsafe extern "C" fn edge_isr(arg: *mut c_void) {
    let hook: fn() = unsafe { core::mem::transmute::<*mut c_void, fn()>(arg) };
    hook();
}

/// SAFETY: `user_ctx` is the `fn()` registered in `EspCaptureTimer::new`.
unsafe extern "C" fn alarm_isr(
    _timer: gptimer_handle_t,
    _edata: *const gptimer_alarm_event_data_t,
    user_ctx: *mut c_void,
) -> bool {
    let hook: fn() = unsafe { core::mem::transmute::<*mut c_void, fn()>(user_ctx) };
    hook();
    false
}

impl EspCaptureTimer {
    /// Create the timer, hook the falling-edge interrupt of `gpio`, and
    /// leave both interrupts disabled.
    pub fn new(gpio: i32, on_edge: fn(), on_alarm: fn()) -> Result<Self> {
        let mut timer: gptimer_handle_t = core::ptr::null_mut();

        // SAFETY: called once at boot from the main task; the callbacks
        // only forward into the critical-section protected bus.
        unsafe {
            let cfg = gptimer_config_t {
                clk_src: soc_periph_gptimer_clk_src_t_GPTIMER_CLK_SRC_DEFAULT,
                direction: gptimer_count_direction_t_GPTIMER_COUNT_UP,
                resolution_hz: ZACWIRE_TIMER_HZ,
                ..Default::default()
            };
            esp!(gptimer_new_timer(&cfg, &mut timer)).map_err(|_| Error::Init("gptimer create"))?;

            let cbs = gptimer_event_callbacks_t {
                on_alarm: Some(alarm_isr),
            };
            esp!(gptimer_register_event_callbacks(timer, &cbs, on_alarm as *mut c_void))
                .map_err(|_| Error::Init("gptimer callbacks"))?;
            esp!(gptimer_enable(timer)).map_err(|_| Error::Init("gptimer enable"))?;

            // Already installed by another driver is fine.
            let ret = gpio_install_isr_service(0);
            if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
                return Err(Error::Init("gpio isr service"));
            }
            esp!(gpio_set_intr_type(gpio, gpio_int_type_t_GPIO_INTR_NEGEDGE))
                .map_err(|_| Error::Init("zacwire intr type"))?;
            esp!(gpio_isr_handler_add(gpio, Some(edge_isr), on_edge as *mut c_void))
                .map_err(|_| Error::Init("zacwire isr handler"))?;
            gpio_intr_disable(gpio);
        }

        info!("hw_timer: zacwire capture on GPIO{} @ {} Hz", gpio, ZACWIRE_TIMER_HZ);
        Ok(Self {
            timer,
            gpio,
            running: false,
        })
    }
}

impl CaptureTimer for EspCaptureTimer {
    fn restart(&mut self, ticks: u16) {
        // SAFETY: valid handle; both calls are ISR-safe.
        unsafe {
            gptimer_set_raw_count(self.timer, 0);
            let mut alarm = gptimer_alarm_config_t {
                alarm_count: u64::from(ticks),
                reload_count: 0,
                ..Default::default()
            };
            alarm.flags.set_auto_reload_on_alarm(0);
            gptimer_set_alarm_action(self.timer, &alarm);
        }
    }

    fn elapsed(&mut self) -> u16 {
        let mut count: u64 = 0;
        // SAFETY: valid handle, `count` outlives the call.
        unsafe {
            gptimer_get_raw_count(self.timer, &mut count);
        }
        count.min(u64::from(u16::MAX)) as u16
    }

    fn listen(&mut self) {
        // SAFETY: valid handle and a GPIO with a registered handler.
        unsafe {
            if !self.running {
                gptimer_start(self.timer);
                self.running = true;
            }
            gpio_intr_enable(self.gpio);
        }
    }

    fn unlisten(&mut self) {
        // SAFETY: as above.
        unsafe {
            gpio_intr_disable(self.gpio);
            if self.running {
                gptimer_stop(self.timer);
                self.running = false;
            }
        }
    }
}
