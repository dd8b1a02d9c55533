//! Link-time symbols the ESP-IDF build needs but no dependency provides.
//!
//! `critical-section` 1.x expects the final binary to supply
//! `_critical_section_1_0_acquire` and `_critical_section_1_0_release`.
//! The ZACwire decoder lock is taken from the GPIO edge and gptimer alarm
//! ISRs, so a FreeRTOS mutex is not allowed here.  This implementation sits
//! on esp-idf-hal's [`IsrCriticalSection`]: interrupts are masked on the
//! calling core and a portMUX spinlock holds off the other core.
//!
//! Nesting is handled here rather than by the portMUX count so that exactly
//! one guard is outstanding while the section is held.

use core::cell::UnsafeCell;

use esp_idf_hal::interrupt::{IsrCriticalSection, IsrCriticalSectionGuard};

static SECTION: IsrCriticalSection = IsrCriticalSection::new();

struct Held {
    depth: UnsafeCell<u32>,
    guard: UnsafeCell<Option<IsrCriticalSectionGuard<'static>>>,
}

// SAFETY: both cells are only touched while `SECTION` is held.
unsafe impl Sync for Held {}

static HELD: Held = Held {
    depth: UnsafeCell::new(0),
    guard: UnsafeCell::new(None),
};

struct IsrSafeSection;

critical_section::set_impl!(IsrSafeSection);

unsafe impl critical_section::Impl for IsrSafeSection {
    unsafe fn acquire() -> critical_section::RawRestoreState {
        let guard = SECTION.enter();
        // SAFETY: `SECTION` is held from here until the matching release.
        unsafe {
            let depth = &mut *HELD.depth.get();
            if *depth == 0 {
                *HELD.guard.get() = Some(guard);
            } else {
                // Already inside: drop the extra portMUX count straight away.
                drop(guard);
            }
            *depth += 1;
        }
    }

    unsafe fn release(_token: critical_section::RawRestoreState) {
        // SAFETY: called once per acquire, still inside the section.
        let outer = unsafe {
            let depth = &mut *HELD.depth.get();
            *depth = depth.saturating_sub(1);
            if *depth == 0 {
                (*HELD.guard.get()).take()
            } else {
                None
            }
        };
        // Leaves the section last.
        drop(outer);
    }
}
