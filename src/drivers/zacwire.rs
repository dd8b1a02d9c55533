//! ZACwire single-wire decoder.
//!
//! The pressure sensor pushes its frames out on one line with no clock and
//! no fixed baud rate.  Every bit starts with a falling edge; the bit value
//! is carried by the duty cycle (short low = 1, long low = 0).  Each byte
//! opens with a start bit whose full period calibrates the sample point for
//! the rest of that byte:
//!
//! ```text
//!        start bit         bit 7 (=1)        bit 6 (=0)
//!  ──┐   ┌────────┐   ┌──────────┐   ┌──┐          ┌─ ...
//!    └───┘        └───┘          └───┘  └──────────┘
//!    ▲   period   ▲  half  ▲
//!    │◀──────────▶│◀──────▶│ sample
//!  edge          edge
//! ```
//!
//! Eight data bits (MSB first) are followed by one parity bit; the nine bits
//! together must carry even parity.
//!
//! ## Execution model
//!
//! [`Decoder`] is a pure state machine advanced by two interrupt sources:
//! the line's falling-edge interrupt and a one-shot capture/compare timer.
//! Each event returns a [`TimerCommand`] that the interrupt glue applies to
//! the timer.  [`ZacwireBus`] owns the decoder, the line and the timer behind
//! a critical-section mutex so it can live in a `static` shared with the
//! ISRs; [`ZacwireReader`] is the blocking, main-loop side that arms a
//! decode and waits for completion with a time budget.

use core::cell::RefCell;
use core::fmt;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::InputPin;
use log::error;

use crate::app::ports::Clock;
use crate::config::{ZACWIRE_CALIBRATION_TICKS, zacwire_idle_ticks};
use crate::error::{Error, SensorError};

/// Largest frame any ZACwire device on this board sends.
pub const MAX_FRAME_LEN: usize = 4;

/// Data bits plus the trailing parity bit.
const BITS_PER_BYTE: u8 = 9;

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Bytes of one decoded frame, in transmission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    bytes: [u8; MAX_FRAME_LEN],
    len: u8,
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push(&mut self, byte: u8) {
        if (self.len as usize) < MAX_FRAME_LEN {
            self.bytes[self.len as usize] = byte;
            self.len += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The line idled but no complete frame arrived within the budget.
    Timeout,
    /// The line never stayed quiet long enough to start a decode.
    BusBusy,
    /// All bytes were sampled but at least one failed its parity check.
    /// The sampled bytes are still handed back.
    ParityMismatch(Frame),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "frame timeout"),
            Self::BusBusy => write!(f, "bus never idle"),
            Self::ParityMismatch(frame) => write!(f, "parity mismatch in {:02X?}", frame.as_bytes()),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::Timeout | DecodeError::BusBusy => Self::Sensor(SensorError::Timeout),
            DecodeError::ParityMismatch(_) => Self::Sensor(SensorError::IntegrityFailure),
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Waiting for the line to stay quiet for the idle window.
    WaitIdle,
    /// Idle seen; the next falling edge opens a start bit.
    WaitStart,
    /// Measuring the start bit period.
    CalibrateFirstBit,
    /// Waiting for the falling edge of the next bit.
    WaitBit,
    /// Sample timer running for the current bit.
    Sampling,
    /// Nothing armed, or the last decode completed.
    Done,
    /// The last decode was abandoned.
    Error,
}

/// Sample offset for the bits of one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitTimingProfile {
    half_period: u16,
}

impl BitTimingProfile {
    /// Derive the profile from the measured start-bit period (timer ticks).
    pub fn from_start_bit(period_ticks: u16) -> Self {
        Self {
            half_period: (period_ticks / 2).max(1),
        }
    }

    pub fn half_period(&self) -> u16 {
        self.half_period
    }
}

/// What the interrupt glue must do with the capture timer after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Clear the counter and fire the compare interrupt after this many ticks.
    Restart(u16),
    /// Leave the timer alone.
    Leave,
}

/// Pure ZACwire decode state machine.
#[derive(Debug, Clone)]
pub struct Decoder {
    state: DecoderState,
    timing: BitTimingProfile,
    idle_ticks: u16,
    bit_count: u8,
    current: u8,
    ones: u8,
    remaining: u8,
    parity_ok: bool,
    frame: Frame,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub const fn new() -> Self {
        Self {
            state: DecoderState::Done,
            timing: BitTimingProfile { half_period: 1 },
            idle_ticks: zacwire_idle_ticks(),
            bit_count: 0,
            current: 0,
            ones: 0,
            remaining: 0,
            parity_ok: true,
            frame: Frame {
                bytes: [0; MAX_FRAME_LEN],
                len: 0,
            },
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Profile calibrated for the byte currently being decoded.
    pub fn timing(&self) -> BitTimingProfile {
        self.timing
    }

    /// Arm a new decode of `byte_count` bytes (clamped to [`MAX_FRAME_LEN`]).
    pub fn begin(&mut self, byte_count: usize) -> TimerCommand {
        self.frame = Frame::default();
        self.parity_ok = true;
        self.remaining = byte_count.min(MAX_FRAME_LEN) as u8;
        self.reset_byte();
        self.state = DecoderState::WaitIdle;
        TimerCommand::Restart(self.idle_ticks)
    }

    /// Falling edge on the line.  `elapsed` is the capture timer count since
    /// its last restart.
    pub fn on_falling_edge(&mut self, elapsed: u16) -> TimerCommand {
        match self.state {
            // Traffic on the line: the idle window starts over.
            DecoderState::WaitIdle => TimerCommand::Restart(self.idle_ticks),
            DecoderState::WaitStart => {
                self.state = DecoderState::CalibrateFirstBit;
                TimerCommand::Restart(ZACWIRE_CALIBRATION_TICKS)
            }
            DecoderState::CalibrateFirstBit => {
                self.timing = BitTimingProfile::from_start_bit(elapsed);
                self.state = DecoderState::Sampling;
                TimerCommand::Restart(self.timing.half_period)
            }
            DecoderState::WaitBit => {
                self.state = DecoderState::Sampling;
                TimerCommand::Restart(self.timing.half_period)
            }
            // No edge belongs here; ignore glitches.
            DecoderState::Sampling | DecoderState::Done | DecoderState::Error => {
                TimerCommand::Leave
            }
        }
    }

    /// Compare interrupt.  `line_high` is the line level at this instant.
    pub fn on_timer_expired(&mut self, line_high: bool) -> TimerCommand {
        match self.state {
            DecoderState::WaitIdle => {
                self.state = DecoderState::WaitStart;
            }
            DecoderState::Sampling => self.sample(line_high),
            // The timer is either free-running (calibration) or stale.
            DecoderState::WaitStart
            | DecoderState::CalibrateFirstBit
            | DecoderState::WaitBit
            | DecoderState::Done
            | DecoderState::Error => {}
        }
        TimerCommand::Leave
    }

    /// Result of the decode once it has reached [`DecoderState::Done`].
    pub fn outcome(&self) -> Option<Result<Frame, DecodeError>> {
        if self.state != DecoderState::Done {
            return None;
        }
        Some(if self.parity_ok {
            Ok(self.frame)
        } else {
            Err(DecodeError::ParityMismatch(self.frame))
        })
    }

    /// Abandon an in-flight decode.
    pub fn abort(&mut self) -> DecodeError {
        let err = match self.state {
            DecoderState::WaitIdle => DecodeError::BusBusy,
            _ => DecodeError::Timeout,
        };
        self.state = DecoderState::Error;
        err
    }

    fn sample(&mut self, line_high: bool) {
        let bit = u8::from(line_high);
        self.ones += bit;
        self.bit_count += 1;

        if self.bit_count < BITS_PER_BYTE {
            self.current = (self.current << 1) | bit;
            self.state = DecoderState::WaitBit;
            return;
        }

        // Ninth bit: parity.
        if self.ones % 2 != 0 {
            self.parity_ok = false;
        }
        self.frame.push(self.current);
        self.remaining = self.remaining.saturating_sub(1);

        if self.remaining > 0 {
            self.reset_byte();
            self.state = DecoderState::WaitStart;
        } else {
            self.state = DecoderState::Done;
        }
    }

    fn reset_byte(&mut self) {
        self.bit_count = 0;
        self.current = 0;
        self.ones = 0;
    }
}

// ---------------------------------------------------------------------------
// Interrupt-shared bus
// ---------------------------------------------------------------------------

/// Edge interrupt plus one-shot compare timer feeding the decoder.
pub trait CaptureTimer {
    /// Clear the counter and raise the compare interrupt after `ticks`.
    fn restart(&mut self, ticks: u16);

    /// Ticks counted since the last [`restart`](Self::restart).
    fn elapsed(&mut self) -> u16;

    /// Enable the line's falling-edge interrupt and the compare interrupt.
    fn listen(&mut self);

    /// Disable both interrupts.
    fn unlisten(&mut self);
}

struct ZacwireLine<P, T> {
    decoder: Decoder,
    pin: P,
    timer: T,
}

impl<P, T: CaptureTimer> ZacwireLine<P, T> {
    fn apply(&mut self, cmd: TimerCommand) {
        if let TimerCommand::Restart(ticks) = cmd {
            self.timer.restart(ticks);
        }
    }
}

/// Decoder, line and timer shared between the ISRs and the main loop.
///
/// Construct as a `static`, [`install`](Self::install) the peripherals at
/// boot, then route the two interrupt vectors to
/// [`on_falling_edge`](Self::on_falling_edge) and
/// [`on_timer_expired`](Self::on_timer_expired).
pub struct ZacwireBus<P, T> {
    line: Mutex<CriticalSectionRawMutex, RefCell<Option<ZacwireLine<P, T>>>>,
}

impl<P, T> Default for ZacwireBus<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> ZacwireBus<P, T> {
    pub const fn new() -> Self {
        Self {
            line: Mutex::new(RefCell::new(None)),
        }
    }
}

impl<P: InputPin, T: CaptureTimer> ZacwireBus<P, T> {
    /// Hand the line and timer over to the bus.  Interrupts stay off until a
    /// decode is armed.
    pub fn install(&self, pin: P, mut timer: T) {
        timer.unlisten();
        self.line.lock(|cell| {
            cell.replace(Some(ZacwireLine {
                decoder: Decoder::new(),
                pin,
                timer,
            }));
        });
    }

    /// Falling-edge interrupt entry point.
    pub fn on_falling_edge(&self) {
        self.line.lock(|cell| {
            if let Some(line) = cell.borrow_mut().as_mut() {
                let elapsed = line.timer.elapsed();
                let cmd = line.decoder.on_falling_edge(elapsed);
                line.apply(cmd);
            }
        });
    }

    /// Compare-timer interrupt entry point.
    pub fn on_timer_expired(&self) {
        self.line.lock(|cell| {
            if let Some(line) = cell.borrow_mut().as_mut() {
                // A failed read samples as low; parity catches the damage.
                let high = line.pin.is_high().unwrap_or(false);
                let cmd = line.decoder.on_timer_expired(high);
                line.apply(cmd);
            }
        });
    }

    /// Current decoder state, `None` before [`install`](Self::install).
    pub fn state(&self) -> Option<DecoderState> {
        self.line
            .lock(|cell| cell.borrow().as_ref().map(|line| line.decoder.state()))
    }

    fn begin(&self, byte_count: usize) -> bool {
        self.line.lock(|cell| match cell.borrow_mut().as_mut() {
            Some(line) => {
                let cmd = line.decoder.begin(byte_count);
                line.apply(cmd);
                line.timer.listen();
                true
            }
            None => false,
        })
    }

    fn poll(&self) -> Option<Result<Frame, DecodeError>> {
        self.line.lock(|cell| {
            let mut guard = cell.borrow_mut();
            let line = guard.as_mut()?;
            let outcome = line.decoder.outcome()?;
            line.timer.unlisten();
            Some(outcome)
        })
    }

    fn abort(&self) -> DecodeError {
        self.line.lock(|cell| match cell.borrow_mut().as_mut() {
            Some(line) => {
                line.timer.unlisten();
                line.decoder.abort()
            }
            None => DecodeError::Timeout,
        })
    }
}

// ---------------------------------------------------------------------------
// Blocking reader
// ---------------------------------------------------------------------------

/// Capability: read one ZACwire frame.
pub trait SingleWireDecoder {
    fn read_frame(&mut self, byte_count: usize) -> Result<Frame, DecodeError>;
}

/// Main-loop side of a [`ZacwireBus`]: arms a decode and spins until the
/// ISRs finish it or the budget runs out.
pub struct ZacwireReader<'a, P, T, C> {
    bus: &'a ZacwireBus<P, T>,
    clock: C,
    budget_ms: u64,
}

impl<'a, P, T, C> ZacwireReader<'a, P, T, C> {
    pub fn new(bus: &'a ZacwireBus<P, T>, clock: C, budget_ms: u64) -> Self {
        Self {
            bus,
            clock,
            budget_ms,
        }
    }
}

impl<P: InputPin, T: CaptureTimer, C: Clock> SingleWireDecoder for ZacwireReader<'_, P, T, C> {
    fn read_frame(&mut self, byte_count: usize) -> Result<Frame, DecodeError> {
        if byte_count == 0 {
            return Ok(Frame::default());
        }
        if !self.bus.begin(byte_count) {
            error!("zacwire: read before the line was installed");
            return Err(DecodeError::Timeout);
        }

        let start = self.clock.now_ms();
        loop {
            if let Some(outcome) = self.bus.poll() {
                return outcome;
            }
            if self.clock.now_ms().saturating_sub(start) > self.budget_ms {
                return Err(self.bus.abort());
            }
            core::hint::spin_loop();
        }
    }
}
