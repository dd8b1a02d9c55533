//! Main loop.
//!
//! The node does nothing until the host asks for a measurement.  Each pass
//! of the loop runs at most one cycle, kicks the watchdog and then sleeps
//! until the next interrupt.
//!
//! ```text
//!        ┌──────────────────────────────────────────┐
//!        ▼                                          │
//!  measurement requested? ──yes──▶ run_cycle()      │
//!        │ no                          │            │
//!        ▼                             ▼            │
//!       feed watchdog ◀────────────────┘            │
//!        │                                          │
//!        ▼                                          │
//!  work pending? ──no──▶ disarm · sleep · re-arm ───┤
//!        │ yes                                      │
//!        └──────────────────────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use log::info;

use crate::app::ports::{EventSink, LowPowerPort, NodeHardware, WatchdogPort};
use crate::app::service::MeasurementService;
use crate::config::NodeConfig;
use crate::diagnostics::CycleStats;
use crate::packet::ResultPacket;
use crate::power::SleepController;
use crate::shared::SharedState;

/// Everything the main loop owns.
pub struct Node<'a, H, D, W, L, S> {
    service: MeasurementService,
    hw: H,
    delay: D,
    sleep: SleepController<W, L>,
    shared: &'a SharedState,
    sink: S,
}

impl<'a, H, D, W, L, S> Node<'a, H, D, W, L, S>
where
    H: NodeHardware,
    D: DelayNs,
    W: WatchdogPort,
    L: LowPowerPort,
    S: EventSink,
{
    pub fn new(
        config: NodeConfig,
        hw: H,
        delay: D,
        sleep: SleepController<W, L>,
        shared: &'a SharedState,
        sink: S,
    ) -> Self {
        Self {
            service: MeasurementService::new(config),
            hw,
            delay,
            sleep,
            shared,
            sink,
        }
    }

    /// Rails off, watchdog on.
    pub fn start(&mut self) {
        self.hw.set_high_power(false);
        self.hw.set_low_power(false);
        self.sleep.start();
        info!("node: idle, waiting for host");
    }

    /// One pass of the main loop.  Returns the packet if a cycle ran.
    pub fn step(&mut self) -> Option<ResultPacket> {
        let packet = if self.shared.take_measurement_request() {
            Some(self.service.run_cycle(
                &mut self.hw,
                &mut self.delay,
                self.shared,
                &mut self.sink,
            ))
        } else {
            None
        };
        self.sleep.feed();
        self.sleep.sleep_unless_pending(self.shared);
        packet
    }

    pub fn run(&mut self) -> ! {
        self.start();
        loop {
            self.step();
        }
    }

    pub fn stats(&self) -> &CycleStats {
        self.service.stats()
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sleep_controller(&self) -> &SleepController<W, L> {
        &self.sleep
    }
}
