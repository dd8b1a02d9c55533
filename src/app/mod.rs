//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the measurement cycle: power sequencing, the
//! pressure median filter, temperature compensation and packet assembly.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
