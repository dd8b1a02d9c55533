//! Build-time configuration for the sensor node.
//!
//! Nothing here is persisted or changed at runtime: the node has no
//! storage and the host protocol offers no configuration commands.
//! Datasheet timings live as named constants so every driver references
//! one place instead of scattering magic numbers.

use crate::sensors::ds18b20::Resolution;

// ---------------------------------------------------------------------------
// One-wire slot timings (standard speed, microseconds)
// ---------------------------------------------------------------------------

/// Pull-down before writing a 1 or reading a bit.
pub const OW_TIME_A_US: u32 = 6;
/// Release after writing a 1.
pub const OW_TIME_B_US: u32 = 64;
/// Pull-down for writing a 0.
pub const OW_TIME_C_US: u32 = 60;
/// Recovery after writing a 0.
pub const OW_TIME_D_US: u32 = 10;
/// Release-to-sample delay when reading.
pub const OW_TIME_E_US: u32 = 9;
/// Remainder of the read slot after sampling.
pub const OW_TIME_F_US: u32 = 55;
/// Reset pulse.
pub const OW_TIME_H_US: u32 = 480;
/// Release-to-presence-sample delay.
pub const OW_TIME_I_US: u32 = 70;
/// Remainder of the presence window.
pub const OW_TIME_J_US: u32 = 410;

// ---------------------------------------------------------------------------
// DS18B20 conversion polling
// ---------------------------------------------------------------------------

pub const DS18B20_POLL_INTERVAL_MS: u32 = 20;
pub const DS18B20_POLL_TIMEOUT_MS: u64 = 1_000;
/// Re-reads of the scratchpad allowed after an all-ones read.
pub const DS18B20_MAX_RETRIES: u8 = 5;

// ---------------------------------------------------------------------------
// ZACwire decoder
// ---------------------------------------------------------------------------

/// Capture timer tick rate used by the decoder.
pub const ZACWIRE_TIMER_HZ: u32 = 1_000_000;
/// Quiet time on the line that counts as "bus idle".
pub const ZACWIRE_IDLE_US: u32 = 500;
/// Timer compare value while measuring the start bit (free-running).
pub const ZACWIRE_CALIBRATION_TICKS: u16 = u16::MAX;

/// Idle window expressed in capture-timer ticks.
pub const fn zacwire_idle_ticks() -> u16 {
    let ticks = ZACWIRE_IDLE_US as u64 * ZACWIRE_TIMER_HZ as u64 / 1_000_000;
    if ticks > u16::MAX as u64 { u16::MAX } else { ticks as u16 }
}

// ---------------------------------------------------------------------------
// Host bus
// ---------------------------------------------------------------------------

/// Target address the node answers on.
pub const HOST_BUS_ADDRESS: u8 = 0x36;

/// Node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    // --- Power ---
    /// Delay after switching both rails on (milliseconds)
    pub rail_settle_ms: u32,

    // --- Pressure sensor ---
    /// Frames sampled per cycle for the median filter (odd)
    pub pressure_samples: usize,
    /// Time budget for one frame, idle wait included (milliseconds)
    pub frame_budget_ms: u64,
    /// Hold time before the 5 V rail is dropped (microseconds)
    pub pressure_rail_hold_us: u32,

    // --- Temperature probe ---
    pub probe_resolution: Resolution,
    /// Conversions thrown away before the kept one
    pub probe_priming_reads: u8,

    // --- Conductivity sensor ---
    /// Lower bound (exclusive) of a usable compensation temperature (Celsius)
    pub compensation_min_c: f32,
    /// Upper bound (exclusive) of a usable compensation temperature (Celsius)
    pub compensation_max_c: f32,
    /// Compensation pushed when the probe reading is unusable (Celsius)
    pub compensation_fallback_c: u8,
    /// Wait for the "*RE" boot banner (milliseconds)
    pub ezo_boot_timeout_ms: u64,
    /// Wait for any single response line (milliseconds)
    pub ezo_response_timeout_ms: u64,
    /// Delay before powering the sensor down (microseconds)
    pub ezo_pre_disable_us: u32,
    /// Delay after powering the sensor down (microseconds)
    pub ezo_post_disable_us: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Power
            rail_settle_ms: 10,

            // Pressure
            pressure_samples: 11,
            frame_budget_ms: 50,
            pressure_rail_hold_us: 1_000,

            // Probe
            probe_resolution: Resolution::Bits12,
            probe_priming_reads: 1,

            // Conductivity
            compensation_min_c: -50.0,
            compensation_max_c: 50.0,
            compensation_fallback_c: 10,
            ezo_boot_timeout_ms: 3_000,
            ezo_response_timeout_ms: 1_500,
            ezo_pre_disable_us: 200,
            ezo_post_disable_us: 500,
        }
    }
}
