//! Sensor drivers.
//!
//! Each driver sits on top of a bus driver from [`crate::drivers`] and
//! implements one of the sensor ports in [`crate::app::ports`].

pub mod ds18b20;
pub mod ezo_ec;
pub mod huba713;
