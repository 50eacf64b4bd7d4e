//! Mock adapters for integration tests.
//!
//! Records every port call so tests can assert on the full history
//! without touching the real temperature peripheral or esp_timer.

use embedded_hal::delay::DelayNs;
use temphist::app::events::AppEvent;
use temphist::app::ports::{EventSink, TemperatureSource};

// ── Scripted sensor ───────────────────────────────────────────

/// Returns raw readings from a script, one per conversion.  `None` in the
/// script makes that conversion hang.
pub struct ScriptedSensor {
    script: Vec<Option<i32>>,
    next: usize,
    current: Option<Option<i32>>,
    pub conversions: u32,
}

impl ScriptedSensor {
    pub fn new(script: &[Option<i32>]) -> Self {
        Self {
            script: script.to_vec(),
            next: 0,
            current: None,
            conversions: 0,
        }
    }
}

impl TemperatureSource for ScriptedSensor {
    fn start_conversion(&mut self) {
        self.conversions += 1;
        // The last entry repeats once the script runs out.
        let idx = self.next.min(self.script.len().saturating_sub(1));
        self.current = Some(self.script.get(idx).copied().flatten());
        self.next += 1;
    }

    fn data_ready(&mut self) -> bool {
        matches!(self.current, Some(Some(_)))
    }

    fn read_raw(&mut self) -> i32 {
        self.current.take().flatten().unwrap_or_default()
    }
}

// ── Delay that only counts ────────────────────────────────────

#[derive(Default)]
pub struct CountingDelay {
    pub waited_ns: u64,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waited_ns += u64::from(ns);
    }
}

// ── Recording sink ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::SampleStored { .. }))
            .count()
    }

    pub fn failures(&self) -> Vec<temphist::error::Error> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::SampleFailed(err) => Some(*err),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
