//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC on the device).  Per-sample events go out
//! at `debug` so a 10 Hz sampler does not flood the console.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u64,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events logged so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted += 1;
        match event {
            AppEvent::Started { period_ticks } => {
                info!("START | period={} ticks", period_ticks);
            }
            AppEvent::SampleStored { sample, cursor } => {
                debug!(
                    "SAMPLE | T={:.2}\u{00b0}C ({}) | next_slot={}",
                    sample.celsius(),
                    sample,
                    cursor
                );
            }
            AppEvent::SampleFailed(e) => {
                warn!("SAMPLE | failed: {}", e);
            }
        }
    }
}
