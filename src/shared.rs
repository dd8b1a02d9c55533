//! State shared between the host-bus interrupt and the main loop.
//!
//! ```text
//!  host-bus ISR                          main loop
//!  ────────────                          ─────────
//!  0x10 ──▶ measurement_requested ──▶ take_measurement_request()
//!  0x80 ──▶ calibration_requested ──▶ take_calibration_request()
//!  0x11 ◀── take_packet()         ◀── publish()
//! ```
//!
//! The flags are plain atomics.  The packet sits behind a critical-section
//! mutex so the ISR can never observe a half-written result.  One instance
//! lives for the whole program, usually as a `static`.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::packet::ResultPacket;

pub struct SharedState {
    measurement_requested: AtomicBool,
    calibration_requested: AtomicBool,
    packet: Mutex<CriticalSectionRawMutex, Cell<ResultPacket>>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            measurement_requested: AtomicBool::new(false),
            calibration_requested: AtomicBool::new(false),
            packet: Mutex::new(Cell::new(ResultPacket::zeroed())),
        }
    }

    // ── Interrupt side ─────────────────────────────────────────

    /// Idempotent: a second request before the cycle runs is absorbed.
    pub fn request_measurement(&self) {
        self.measurement_requested.store(true, Ordering::Release);
    }

    pub fn request_calibration(&self) {
        self.calibration_requested.store(true, Ordering::Release);
    }

    /// Copy out the current packet and zero it in place.
    pub fn take_packet(&self) -> ResultPacket {
        self.packet
            .lock(|cell| cell.replace(ResultPacket::zeroed()))
    }

    // ── Main-loop side ─────────────────────────────────────────

    pub fn take_measurement_request(&self) -> bool {
        self.measurement_requested.swap(false, Ordering::AcqRel)
    }

    pub fn take_calibration_request(&self) -> bool {
        self.calibration_requested.swap(false, Ordering::AcqRel)
    }

    pub fn calibration_pending(&self) -> bool {
        self.calibration_requested.load(Ordering::Acquire)
    }

    /// Work that must run before the node may sleep.
    pub fn is_work_pending(&self) -> bool {
        self.measurement_requested.load(Ordering::Acquire)
    }

    pub fn publish(&self, packet: ResultPacket) {
        self.packet.lock(|cell| cell.set(packet));
    }

    /// Current packet without clearing it.
    pub fn peek_packet(&self) -> ResultPacket {
        self.packet.lock(Cell::get)
    }
}
