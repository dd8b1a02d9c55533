//! MFM sensor node firmware library.
//!
//! Exposes the measurement logic, sensor drivers and host protocol for
//! integration testing on the host.  All ESP-IDF-specific code is guarded
//! by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod drivers;
pub mod error;
#[cfg(target_os = "espidf")]
mod esp_link_shims;
pub mod packet;
pub mod pins;
pub mod power;
pub mod protocol;
pub mod scheduler;
pub mod sensors;
pub mod shared;
