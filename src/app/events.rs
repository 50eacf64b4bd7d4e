//! Outbound application events.
//!
//! The [`SamplingService`](super::service::SamplingService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them.

use crate::error::Error;
use crate::history::Sample;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Sampling has started (carries the timer period in ticks).
    Started { period_ticks: u32 },

    /// A sample was stored; `cursor` is the slot the next one goes into.
    SampleStored { sample: Sample, cursor: usize },

    /// A period failed; sampling continues.
    SampleFailed(Error),
}
