//! Periodic temperature sampler: the single producer of the history.
//!
//! Each timer callout runs one period:
//!
//! ```text
//!  re-arm timer ─▶ wait data-ready ─▶ read raw ─▶ ×100/4 ─▶ write ─▶ start next conversion
//!  (first, so the      (bounded)                                      (ready by next period)
//!   next wake time
//!   has no jitter)
//! ```
//!
//! The sampler owns the history's [`HistoryWriter`], so it is the only code
//! that can move the cursor.  [`Sampler::tick`] takes `&mut self`; a
//! period can therefore never be re-entered while the previous one is
//! still running.  On the device this holds because callouts are
//! dispatched one at a time from the main loop's event queue.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::config::SamplerConfig;
use crate::error::{Error, Result};
use crate::history::{HistoryWriter, Sample, TempHistory};

use super::ports::{TemperatureSource, TickTimer};

/// Running counters, readable for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub samples_stored: u64,
    pub hardware_timeouts: u32,
    pub scheduling_failures: u32,
    pub last_sample: Option<Sample>,
}

pub struct Sampler<'a, const N: usize> {
    writer: HistoryWriter<'a, N>,
    period_ticks: u32,
    ready_timeout_us: u32,
    ready_poll_us: u32,
    stats: SamplerStats,
}

impl<'a, const N: usize> Sampler<'a, N> {
    pub fn new(writer: HistoryWriter<'a, N>, config: &SamplerConfig) -> Self {
        Self {
            writer,
            period_ticks: config.period_ticks(),
            ready_timeout_us: config.ready_timeout_us,
            ready_poll_us: config.ready_poll_us,
            stats: SamplerStats::default(),
        }
    }

    /// Warm up the peripheral and arm the first callout.
    ///
    /// The first conversion must complete within the ready timeout; a
    /// sensor that never answers is reported as [`Error::HardwareTimeout`]
    /// and the caller should treat that as fatal.  The completed value is
    /// left in the peripheral for the first [`tick`](Self::tick).
    pub fn start(
        &mut self,
        source: &mut impl TemperatureSource,
        timer: &mut impl TickTimer,
        delay: &mut impl DelayNs,
    ) -> Result<()> {
        source.start_conversion();
        self.wait_ready(source, delay)?;
        timer.arm(self.period_ticks)?;
        info!(
            "Sampler: started (period={} ticks, capacity={})",
            self.period_ticks, N
        );
        Ok(())
    }

    /// Run one sampling period.  Returns the sample that was stored.
    pub fn tick(
        &mut self,
        source: &mut impl TemperatureSource,
        timer: &mut impl TickTimer,
        delay: &mut impl DelayNs,
    ) -> Result<Sample> {
        // 1. Re-arm before anything else.
        if let Err(e) = timer.rearm(self.period_ticks) {
            self.stats.scheduling_failures += 1;
            warn!("Sampler: re-arm failed: {}", e);
            return Err(Error::SchedulingFailure);
        }

        // 2. Harvest the conversion started last period.
        if let Err(e) = self.wait_ready(source, delay) {
            self.stats.hardware_timeouts += 1;
            warn!("Sampler: {} (slot {} skipped)", e, self.writer.cursor());
            // Restart so the next period has a chance to recover.
            source.start_conversion();
            return Err(e);
        }
        let raw = source.read_raw();

        // 3. + 4. Convert and store.
        let sample = Sample::from_quarter_degrees(raw);
        self.writer.write(sample);

        // 5. Next conversion runs while we sleep.
        source.start_conversion();

        self.stats.samples_stored += 1;
        self.stats.last_sample = Some(sample);
        Ok(sample)
    }

    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    pub fn period_ticks(&self) -> u32 {
        self.period_ticks
    }

    pub fn history(&self) -> &TempHistory<N> {
        self.writer.history()
    }

    /// Poll `data_ready` every `ready_poll_us` until it is set or
    /// `ready_timeout_us` has elapsed.
    fn wait_ready(
        &self,
        source: &mut impl TemperatureSource,
        delay: &mut impl DelayNs,
    ) -> Result<()> {
        let step = self.ready_poll_us.max(1);
        let mut waited_us = 0u32;
        loop {
            if source.data_ready() {
                return Ok(());
            }
            if waited_us >= self.ready_timeout_us {
                return Err(Error::HardwareTimeout);
            }
            delay.delay_us(step);
            waited_us = waited_us.saturating_add(step);
        }
    }
}
