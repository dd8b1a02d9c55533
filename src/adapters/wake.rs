//! Idle-until-woken adapter for the main loop.
//!
//! [`WakeLatch`] implements [`LowPowerPort`]: `sleep()` blocks the main task
//! until a [`Waker`] fires.  A wake-up that arrives before `sleep()` is
//! entered stays latched, so the check-then-sleep race in the main loop
//! can't lose a host command.
//!
//! On the board this is a FreeRTOS task notification; with tickless idle
//! enabled the blocked core drops into light sleep.  On the host a
//! `Mutex`/`Condvar` pair stands in.

use crate::app::ports::LowPowerPort;

#[cfg(target_os = "espidf")]
mod imp {
    use core::num::NonZeroU32;
    use std::sync::Arc;

    use esp_idf_hal::delay::BLOCK;
    use esp_idf_hal::task::notification::{Notification, Notifier};

    pub struct WakeLatch {
        notification: Notification,
    }

    #[derive(Clone)]
    pub struct Waker {
        notifier: Arc<Notifier>,
    }

    impl WakeLatch {
        /// Must be created on the task that will sleep.
        pub fn new() -> Self {
            Self {
                notification: Notification::new(),
            }
        }

        pub fn waker(&self) -> Waker {
            Waker {
                notifier: self.notification.notifier(),
            }
        }

        pub(super) fn wait(&mut self) {
            let _ = self.notification.wait(BLOCK);
        }
    }

    impl Waker {
        pub fn wake(&self) {
            // SAFETY: the notified task (main loop) outlives every waker.
            unsafe {
                self.notifier.notify_and_yield(NonZeroU32::MIN);
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod imp {
    use std::sync::{Arc, Condvar, Mutex};

    type Latch = Arc<(Mutex<bool>, Condvar)>;

    pub struct WakeLatch {
        latch: Latch,
    }

    #[derive(Clone)]
    pub struct Waker {
        latch: Latch,
    }

    impl WakeLatch {
        pub fn new() -> Self {
            Self {
                latch: Arc::new((Mutex::new(false), Condvar::new())),
            }
        }

        pub fn waker(&self) -> Waker {
            Waker {
                latch: Arc::clone(&self.latch),
            }
        }

        pub(super) fn wait(&mut self) {
            let (flag, cv) = &*self.latch;
            let Ok(mut woken) = flag.lock() else {
                return;
            };
            while !*woken {
                woken = match cv.wait(woken) {
                    Ok(g) => g,
                    Err(_) => return,
                };
            }
            *woken = false;
        }
    }

    impl Waker {
        pub fn wake(&self) {
            let (flag, cv) = &*self.latch;
            if let Ok(mut woken) = flag.lock() {
                *woken = true;
                cv.notify_one();
            }
        }
    }
}

pub use imp::{WakeLatch, Waker};

impl Default for WakeLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl LowPowerPort for WakeLatch {
    fn sleep(&mut self) {
        self.wait();
    }
}
