//! MFM sensor node firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  HardwareAdapter ─ PowerRails · Huba713 · Ds18b20 · EzoEc    │
//! │  LogEventSink      Watchdog · WakeLatch    I2C target task   │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ─────────────────       │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │       Node → MeasurementService (pure logic)           │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  statics: SHARED (flags + packet) · ZACWIRE (decoder + ISRs) │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Result;
use esp_idf_hal::gpio::{AnyIOPin, Input, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;
use log::info;

use mfm_sensor::adapters::hardware::HardwareAdapter;
use mfm_sensor::adapters::i2c_target;
use mfm_sensor::adapters::log_sink::LogEventSink;
use mfm_sensor::adapters::time::{SystemClock, SystemDelay};
use mfm_sensor::adapters::uart::EzoUart;
use mfm_sensor::adapters::wake::WakeLatch;
use mfm_sensor::config::NodeConfig;
use mfm_sensor::drivers::hw_timer::EspCaptureTimer;
use mfm_sensor::drivers::onewire::OneWire;
use mfm_sensor::drivers::power_rails::PowerRails;
use mfm_sensor::drivers::watchdog::Watchdog;
use mfm_sensor::drivers::zacwire::{ZacwireBus, ZacwireReader};
use mfm_sensor::pins;
use mfm_sensor::power::SleepController;
use mfm_sensor::scheduler::Node;
use mfm_sensor::sensors::ds18b20::Ds18b20;
use mfm_sensor::sensors::ezo_ec::{EzoEc, EzoTimeouts};
use mfm_sensor::sensors::huba713::Huba713;
use mfm_sensor::shared::SharedState;

type ZacwirePin = PinDriver<'static, AnyIOPin, Input>;

/// Flags and result packet shared with the host-bus task.
static SHARED: SharedState = SharedState::new();

/// ZACwire decoder, driven from the edge and alarm interrupts.
static ZACWIRE: ZacwireBus<ZacwirePin, EspCaptureTimer> = ZacwireBus::new();

fn zacwire_edge() {
    ZACWIRE.on_falling_edge();
}

fn zacwire_alarm() {
    ZACWIRE.on_timer_expired();
}

/// SAFETY: every GPIO number comes from `pins`, and each is claimed once.
fn gpio(num: i32) -> AnyIOPin {
    unsafe { AnyIOPin::new(num) }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  MFM sensor node v{}              ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let p = Peripherals::take()?;
    let config = NodeConfig::default();
    let clock = SystemClock::new();

    // ── 2. Power rails (both off) ─────────────────────────────
    let rails = PowerRails::new(
        PinDriver::output(gpio(pins::ENABLE_5V_GPIO))?,
        PinDriver::output(gpio(pins::ENABLE_3V3_GPIO))?,
    );

    // ── 3. Pressure transmitter on ZACwire ────────────────────
    let zac_pin = PinDriver::input(gpio(pins::ZACWIRE_GPIO))?;
    let capture = EspCaptureTimer::new(pins::ZACWIRE_GPIO, zacwire_edge, zacwire_alarm)?;
    ZACWIRE.install(zac_pin, capture);
    let huba = Huba713::new(ZacwireReader::new(&ZACWIRE, clock, config.frame_budget_ms));

    // ── 4. Temperature probe on one-wire ──────────────────────
    let ow_pin = PinDriver::input_output_od(gpio(pins::ONEWIRE_GPIO))?;
    let ow = OneWire::new(ow_pin, SystemDelay)?;
    let probe = Ds18b20::new(ow, SystemDelay, clock, config.probe_resolution);

    // ── 5. Conductivity circuit on UART ───────────────────────
    let uart = UartDriver::new(
        p.uart1,
        gpio(pins::EZO_UART_TX_GPIO),
        gpio(pins::EZO_UART_RX_GPIO),
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(pins::EZO_UART_BAUD)),
    )?;
    let link = EzoUart::new(uart, pins::EZO_UART_TX_GPIO, pins::EZO_UART_RX_GPIO);
    let ezo = EzoEc::new(
        link,
        PinDriver::output(gpio(pins::ENABLE_CONDUCTIVITY_GPIO))?,
        clock,
        EzoTimeouts {
            boot_ms: config.ezo_boot_timeout_ms,
            response_ms: config.ezo_response_timeout_ms,
        },
    );

    let hw = HardwareAdapter::new(rails, huba, probe, ezo);

    // ── 6. Host bus ───────────────────────────────────────────
    let latch = WakeLatch::new();
    i2c_target::start(
        p.i2c0,
        gpio(pins::HOST_SDA_GPIO),
        gpio(pins::HOST_SCL_GPIO),
        &SHARED,
        latch.waker(),
    )?;

    // ── 7. Main loop ──────────────────────────────────────────
    let sleep = SleepController::new(Watchdog::new(), latch);
    let mut node = Node::new(config, hw, SystemDelay, sleep, &SHARED, LogEventSink::new());
    node.run()
}
