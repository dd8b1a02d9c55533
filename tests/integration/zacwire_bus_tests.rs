//! ZACwire bus driven from a second thread standing in for the edge and
//! timer interrupts, with the blocking reader on the test thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorType, InputPin};
use mfm_sensor::adapters::time::SystemClock;
use mfm_sensor::app::ports::PressureSensorPort;
use mfm_sensor::drivers::zacwire::{
    CaptureTimer, DecodeError, DecoderState, SingleWireDecoder, ZacwireBus, ZacwireReader,
};
use mfm_sensor::sensors::huba713::{Huba713, PressureReading};

const PERIOD: u16 = 40;

#[derive(Clone, Default)]
struct SimLine(Arc<AtomicBool>);

impl ErrorType for SimLine {
    type Error = core::convert::Infallible;
}

impl InputPin for SimLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.load(Ordering::SeqCst))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.load(Ordering::SeqCst))
    }
}

#[derive(Clone, Default)]
struct SimTimer {
    elapsed: Arc<AtomicU16>,
    listening: Arc<AtomicBool>,
    restarts: Arc<AtomicU32>,
}

impl CaptureTimer for SimTimer {
    fn restart(&mut self, _ticks: u16) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }

    fn elapsed(&mut self) -> u16 {
        self.elapsed.load(Ordering::SeqCst)
    }

    fn listen(&mut self) {
        self.listening.store(true, Ordering::SeqCst);
    }

    fn unlisten(&mut self) {
        self.listening.store(false, Ordering::SeqCst);
    }
}

type Bus = ZacwireBus<SimLine, SimTimer>;

/// Plays the transmitter: waits until a decode is armed, then raises the
/// interrupts for `bytes`.
fn transmit(bus: &Bus, line: &SimLine, timer: &SimTimer, bytes: &[u8], good_parity: bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while bus.state() != Some(DecoderState::WaitIdle) {
        assert!(Instant::now() < deadline, "decode never armed");
        std::thread::yield_now();
    }

    // Idle window passes.
    line.0.store(true, Ordering::SeqCst);
    bus.on_timer_expired();

    for &b in bytes {
        timer.elapsed.store(0, Ordering::SeqCst);
        bus.on_falling_edge();
        timer.elapsed.store(PERIOD, Ordering::SeqCst);
        bus.on_falling_edge();
        for i in (0..8).rev() {
            if i != 7 {
                bus.on_falling_edge();
            }
            line.0.store(b & (1 << i) != 0, Ordering::SeqCst);
            bus.on_timer_expired();
        }
        let parity = (b.count_ones() % 2 == 1) == good_parity;
        bus.on_falling_edge();
        line.0.store(parity, Ordering::SeqCst);
        bus.on_timer_expired();
    }
}

fn installed() -> (Bus, SimLine, SimTimer) {
    let bus = Bus::new();
    let line = SimLine::default();
    let timer = SimTimer::default();
    bus.install(line.clone(), timer.clone());
    (bus, line, timer)
}

#[test]
fn reader_receives_frame_from_interrupt_thread() {
    let (bus, line, timer) = installed();
    assert_eq!(bus.state(), Some(DecoderState::Done));

    let frame = std::thread::scope(|s| {
        s.spawn(|| transmit(&bus, &line, &timer, &[0x0B, 0xE0, 0x7A], true));
        ZacwireReader::new(&bus, SystemClock::new(), 2_000).read_frame(3)
    });

    let frame = frame.expect("frame should decode");
    assert_eq!(frame.as_bytes(), &[0x0B, 0xE0, 0x7A]);
    assert!(!timer.listening.load(Ordering::SeqCst), "interrupts left on");
    assert!(timer.restarts.load(Ordering::SeqCst) > 0);
}

#[test]
fn huba_over_bus_decodes_reading() {
    let (bus, line, timer) = installed();

    let reading = std::thread::scope(|s| {
        s.spawn(|| transmit(&bus, &line, &timer, &[0x0B, 0xE0, 0x7A], true));
        Huba713::new(ZacwireReader::new(&bus, SystemClock::new(), 2_000)).read_pressure()
    });

    assert!(reading.valid);
    assert_eq!(reading.pressure, 3040);
    assert!((reading.temperature - 45.648).abs() < 1e-3);
}

#[test]
fn bad_parity_over_bus_is_invalid_reading() {
    let (bus, line, timer) = installed();

    let reading = std::thread::scope(|s| {
        s.spawn(|| transmit(&bus, &line, &timer, &[0x0B, 0xE0, 0x7A], false));
        Huba713::new(ZacwireReader::new(&bus, SystemClock::new(), 2_000)).read_pressure()
    });

    assert_eq!(reading, PressureReading::invalid());
}

#[test]
fn silent_line_times_out_within_budget() {
    let (bus, _line, timer) = installed();

    let started = Instant::now();
    let result = ZacwireReader::new(&bus, SystemClock::new(), 20).read_frame(3);

    // Never left the idle window: the line looked busy.
    assert_eq!(result, Err(DecodeError::BusBusy));
    assert_eq!(bus.state(), Some(DecoderState::Error));
    assert!(!timer.listening.load(Ordering::SeqCst));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn uninstalled_bus_reports_timeout() {
    let bus = Bus::new();
    assert_eq!(bus.state(), None);
    let result = ZacwireReader::new(&bus, SystemClock::new(), 5).read_frame(3);
    assert_eq!(result, Err(DecodeError::Timeout));
}

#[test]
fn interrupt_hooks_nest_inside_critical_section() {
    let (bus, line, timer) = installed();

    // The hooks take the bus lock themselves; running them with a section
    // already held must neither deadlock nor lose the state update.
    line.0.store(true, Ordering::SeqCst);
    let state = critical_section::with(|_| {
        bus.on_timer_expired();
        bus.on_falling_edge();
        critical_section::with(|_| bus.state())
    });
    assert_eq!(state, Some(DecoderState::Done));

    // The lock is free again: a full decode still goes through.
    let frame = std::thread::scope(|s| {
        s.spawn(|| transmit(&bus, &line, &timer, &[0x5A], true));
        ZacwireReader::new(&bus, SystemClock::new(), 2_000).read_frame(1)
    });
    assert_eq!(frame.expect("frame should decode").as_bytes(), &[0x5A]);
}
