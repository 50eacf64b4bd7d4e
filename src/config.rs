//! Sampler configuration parameters
//!
//! All tunable parameters for the temperature history firmware.  The
//! history capacity itself is a compile-time constant
//! ([`HISTORY_CAPACITY`](crate::history::HISTORY_CAPACITY)); everything
//! else can be overridden from a provisioning blob (JSON or postcard).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core sampling / reporting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    // --- Timing ---
    /// Temperature samples per second
    pub sampling_rate_hz: u32,
    /// Timer service tick rate (ticks per second)
    pub tick_rate_hz: u32,

    // --- Hardware wait ---
    /// Maximum time to wait for a conversion to complete (microseconds)
    pub ready_timeout_us: u32,
    /// Poll interval while waiting for "data ready" (microseconds)
    pub ready_poll_us: u32,

    // --- Reporting ---
    /// Samples returned per GATT read, most recent first
    pub report_depth: usize,
    /// Report only slots that have been written at least once
    pub mask_unwritten: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            // Timing
            sampling_rate_hz: 10,
            tick_rate_hz: 1000,

            // Hardware wait: a conversion takes ~36 µs on typical on-die sensors
            ready_timeout_us: 2_000,
            ready_poll_us: 50,

            // Reporting
            report_depth: 10,
            mask_unwritten: false,
        }
    }
}

impl SamplerConfig {
    /// Timer ticks between two samples.
    pub fn period_ticks(&self) -> u32 {
        self.tick_rate_hz / self.sampling_rate_hz.max(1)
    }

    /// Check every field against a history of `capacity` slots.
    pub fn validate(&self, capacity: usize) -> Result<()> {
        if self.sampling_rate_hz == 0 {
            return Err(Error::Config("sampling_rate_hz must be non-zero"));
        }
        if self.tick_rate_hz < self.sampling_rate_hz {
            return Err(Error::Config("tick_rate_hz must be >= sampling_rate_hz"));
        }
        if self.report_depth == 0 {
            return Err(Error::Config("report_depth must be non-zero"));
        }
        if self.report_depth > capacity {
            return Err(Error::Config("report_depth exceeds history capacity"));
        }
        if self.ready_timeout_us == 0 {
            return Err(Error::Config("ready_timeout_us must be non-zero"));
        }
        if self.ready_poll_us > self.ready_timeout_us {
            return Err(Error::Config("ready_poll_us exceeds ready_timeout_us"));
        }
        Ok(())
    }

    /// Decode a JSON provisioning blob.  Missing fields take defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|_| Error::Config("malformed JSON config"))
    }

    /// Decode a postcard blob.
    pub fn from_postcard(bytes: &[u8]) -> Result<Self> {
        postcard::from_bytes(bytes).map_err(|_| Error::Config("malformed postcard config"))
    }

    /// Encode as a postcard blob.
    pub fn to_postcard(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::Config("postcard encode failed"))
    }
}
