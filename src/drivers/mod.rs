//! Bus drivers and board-level peripheral helpers.

#[cfg(target_os = "espidf")]
pub mod hw_timer;
pub mod onewire;
pub mod power_rails;
pub mod task_pin;
pub mod watchdog;
pub mod zacwire;
