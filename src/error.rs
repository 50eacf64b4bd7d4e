//! Unified error type for the temperature history firmware.
//!
//! A single `Error` enum that the sampler, the history buffer and the
//! configuration layer all return.  Variants are `Copy` so they can be
//! counted, logged and forwarded through the event sink without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The temperature peripheral never signalled "data ready" within the
    /// configured timeout.  Fatal during startup, recoverable per period.
    HardwareTimeout,
    /// The timer service rejected a re-arm request.
    SchedulingFailure,
    /// A snapshot asked for more samples than the history holds.
    BufferOverrun { requested: usize, capacity: usize },
    /// An encoded report does not fit the caller's response buffer (bytes).
    ResponseTooLarge { needed: usize, available: usize },
    /// Configuration is invalid.
    Config(&'static str),
    /// Peripheral or stack initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardwareTimeout => write!(f, "temperature conversion timed out"),
            Self::SchedulingFailure => write!(f, "timer re-arm rejected"),
            Self::BufferOverrun {
                requested,
                capacity,
            } => write!(
                f,
                "snapshot of {requested} samples exceeds history capacity {capacity}"
            ),
            Self::ResponseTooLarge { needed, available } => write!(
                f,
                "response needs {needed} bytes, only {available} available"
            ),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

impl Error {
    /// `true` for errors after which the system cannot produce samples at
    /// all and startup must be aborted.
    pub const fn is_startup_fatal(&self) -> bool {
        matches!(self, Self::HardwareTimeout | Self::Init(_) | Self::Config(_))
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
