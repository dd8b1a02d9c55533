//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements          | Connects to               |
//! |--------------|---------------------|---------------------------|
//! | `hardware`   | NodeHardware        | rails + the three sensors |
//! | `i2c_target` | TargetPort          | ESP32 I²C target driver   |
//! | `log_sink`   | EventSink           | Serial log output         |
//! | `time`       | Clock, DelayNs      | ESP32 system timer        |
//! | `uart`       | EzoLink             | ESP32 UART driver         |
//! | `wake`       | LowPowerPort        | FreeRTOS task notification|

pub mod hardware;
pub mod i2c_target;
pub mod log_sink;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod uart;
pub mod wake;
