//! Application service: the hexagonal core.
//!
//! [`SamplingService`] owns the [`Sampler`] and turns queue [`Event`]s
//! into sampling periods.  All I/O flows through port traits injected at
//! call sites, making the whole service testable with mock adapters.
//!
//! ```text
//!  TemperatureSource ──▶ ┌──────────────────────┐ ──▶ EventSink
//!                        │   SamplingService    │
//!  TickTimer ◀────────── │   Sampler · stats    │
//!                        └──────────────────────┘
//! ```
//!
//! Runtime sampling errors are reported and swallowed.  A hardware timeout
//! costs one slot; the callout was already re-armed.  A rejected re-arm
//! ends the callout chain, so the service marks itself stalled and the
//! main loop restarts it.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::error::{Error, Result};
use crate::events::Event;

use super::events::AppEvent;
use super::ports::{EventSink, TemperatureSource, TickTimer};
use super::sampler::{Sampler, SamplerStats};

// ───────────────────────────────────────────────────────────────
// SamplingService
// ───────────────────────────────────────────────────────────────

pub struct SamplingService<'a, const N: usize> {
    sampler: Sampler<'a, N>,
    started: bool,
    stalled: bool,
    ticks_handled: u64,
}

impl<'a, const N: usize> SamplingService<'a, N> {
    /// Does **not** touch hardware; call [`start`](Self::start) next.
    pub fn new(sampler: Sampler<'a, N>) -> Self {
        Self {
            sampler,
            started: false,
            stalled: false,
            ticks_handled: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Warm up the sensor and arm the first callout.
    ///
    /// Errors here are startup-fatal: without a responding sensor there is
    /// nothing to report.
    pub fn start(
        &mut self,
        source: &mut impl TemperatureSource,
        timer: &mut impl TickTimer,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.sampler.start(source, timer, delay)?;
        self.started = true;
        self.stalled = false;
        let period_ticks = self.sampler.period_ticks();
        sink.emit(&AppEvent::Started { period_ticks });
        info!("SamplingService started");
        Ok(())
    }

    // ── Event dispatch ────────────────────────────────────────

    /// Handle one event drained from the queue.
    pub fn handle_event(
        &mut self,
        event: Event,
        source: &mut impl TemperatureSource,
        timer: &mut impl TickTimer,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) {
        match event {
            Event::SampleTick => self.on_sample_tick(source, timer, delay, sink),
            // Connection state belongs to the BLE adapter.
            Event::BleConnected | Event::BleDisconnected => {}
        }
    }

    fn on_sample_tick(
        &mut self,
        source: &mut impl TemperatureSource,
        timer: &mut impl TickTimer,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) {
        if !self.started {
            warn!("SamplingService: tick before start ignored");
            return;
        }
        self.ticks_handled += 1;
        match self.sampler.tick(source, timer, delay) {
            Ok(sample) => sink.emit(&AppEvent::SampleStored {
                sample,
                cursor: self.sampler.history().cursor(),
            }),
            Err(e) => {
                if e == Error::SchedulingFailure {
                    self.stalled = true;
                }
                warn!("SamplingService: period {} failed: {}", self.ticks_handled, e);
                sink.emit(&AppEvent::SampleFailed(e));
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// `true` after a rejected re-arm: no further ticks will arrive until
    /// [`start`](Self::start) is called again.
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    pub fn ticks_handled(&self) -> u64 {
        self.ticks_handled
    }

    pub fn stats(&self) -> SamplerStats {
        self.sampler.stats()
    }

    pub fn sampler(&self) -> &Sampler<'a, N> {
        &self.sampler
    }
}
