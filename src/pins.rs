//! GPIO / peripheral pin assignments for the MFM sensor board.
//!
//! Single source of truth: the firmware entry point references this module
//! rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Power rails
// ---------------------------------------------------------------------------

/// Digital output: HIGH = 5 V rail on (pressure sensor only).
pub const ENABLE_5V_GPIO: i32 = 4;
/// Digital output: LOW = 3V3 rail on (probe + conductivity). Active-low switch.
pub const ENABLE_3V3_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Huba 713 ZACwire output.  Input with falling-edge interrupt.
pub const ZACWIRE_GPIO: i32 = 6;

/// DS18B20 data line.  Open-drain with external 4k7 pull-up.
pub const ONEWIRE_GPIO: i32 = 7;

/// EZO-EC isolator enable.  HIGH = powered; released LOW by pull-down.
pub const ENABLE_CONDUCTIVITY_GPIO: i32 = 3;

// ---------------------------------------------------------------------------
// UART to the EZO-EC (9600 8N1)
// ---------------------------------------------------------------------------

pub const EZO_UART_TX_GPIO: i32 = 17;
pub const EZO_UART_RX_GPIO: i32 = 18;
pub const EZO_UART_BAUD: u32 = 9_600;

// ---------------------------------------------------------------------------
// Host bus (I²C target)
// ---------------------------------------------------------------------------

pub const HOST_SDA_GPIO: i32 = 8;
pub const HOST_SCL_GPIO: i32 = 9;
