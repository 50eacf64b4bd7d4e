//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Sampler / SamplingService (domain)
//! ```
//!
//! Driven adapters (temperature peripheral, timer service, event sinks)
//! implement these traits.  The domain consumes them via generics injected
//! at call sites, so the sampling logic never touches hardware directly and
//! runs unchanged against the mocks in `tests/integration/`.
//!
//! Busy-wait delays go through [`embedded_hal::delay::DelayNs`] rather than
//! a port of our own.

// ───────────────────────────────────────────────────────────────
// Temperature source (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// A temperature peripheral with start / data-ready / read semantics.
///
/// Readings are in raw units of 0.25 °C per LSB.  The sampler calls
/// `start_conversion` once to warm up and once after every `read_raw`,
/// so a completed value is always waiting at the next period.
pub trait TemperatureSource {
    /// Kick off a conversion.  Fire-and-forget.
    fn start_conversion(&mut self);

    /// Whether the last started conversion has completed.
    fn data_ready(&mut self) -> bool;

    /// Read the last completed conversion (0.25 °C / LSB).
    fn read_raw(&mut self) -> i32;
}

// ───────────────────────────────────────────────────────────────
// Tick timer (driven adapter: domain → timer service)
// ───────────────────────────────────────────────────────────────

/// One-shot callout timer.  Each call schedules exactly one future sample
/// tick; the sampler re-arms at the start of every period.
pub trait TickTimer {
    /// Schedule the first tick `ticks` timer ticks from now.
    fn arm(&mut self, ticks: u32) -> Result<(), TimerError>;

    /// Schedule the next tick `ticks` timer ticks after the deadline that
    /// just expired.  Late dispatch of the previous tick does not stretch
    /// the period.  Falls back to "from now" when nothing has expired.
    fn rearm(&mut self, ticks: u32) -> Result<(), TimerError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log,
/// test recorder, ...).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`TickTimer`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// The timer was never created.
    NotInitialised,
    /// The timer service refused the request (returns the service's code).
    Rejected(i32),
}

impl core::fmt::Display for TimerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotInitialised => write!(f, "timer not initialised"),
            Self::Rejected(rc) => write!(f, "timer service rejected re-arm (rc={})", rc),
        }
    }
}

impl From<TimerError> for crate::error::Error {
    fn from(_: TimerError) -> Self {
        Self::SchedulingFailure
    }
}
