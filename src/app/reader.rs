//! Snapshot reader: answers GATT reads of the temperature history.
//!
//! Runs in the BLE stack's callback context, concurrently with the
//! sampler.  It only ever takes snapshots: no writes, no waiting, no lock.

use heapless::Vec;
use log::info;

use crate::config::SamplerConfig;
use crate::error::{Error, Result};
use crate::history::{Snapshot, TempHistory};

/// Read-side view of a [`TempHistory`] with a fixed report depth.
#[derive(Debug, Clone, Copy)]
pub struct HistoryReader<'a, const N: usize> {
    history: &'a TempHistory<N>,
    report_depth: usize,
    mask_unwritten: bool,
}

impl<'a, const N: usize> HistoryReader<'a, N> {
    pub fn new(history: &'a TempHistory<N>, config: &SamplerConfig) -> Self {
        Self {
            history,
            report_depth: config.report_depth,
            mask_unwritten: config.mask_unwritten,
        }
    }

    /// Payload size of one full report in bytes.
    pub fn payload_len(&self) -> usize {
        self.report_depth * core::mem::size_of::<i16>()
    }

    /// The newest `report_depth` samples, most recent first.
    ///
    /// With `mask_unwritten`, slots that have never been written are left
    /// out until the history has filled once.
    pub fn read(&self) -> Result<Snapshot<N>> {
        let depth = if self.mask_unwritten {
            self.report_depth.min(self.history.written())
        } else {
            self.report_depth
        };
        self.history.try_snapshot(depth)
    }

    /// Take a snapshot and append it to `out` as little-endian i16 values.
    ///
    /// Returns the number of samples appended; `out` is untouched when it
    /// cannot hold the whole report.
    pub fn read_into<const B: usize>(&self, out: &mut Vec<u8, B>) -> Result<usize> {
        let snap = self.read()?;
        if !snap.encode_le(out) {
            return Err(Error::ResponseTooLarge {
                needed: snap.encoded_len(),
                available: B - out.len(),
            });
        }
        log_snapshot(&snap);
        Ok(snap.len())
    }
}

fn log_snapshot<const N: usize>(snap: &Snapshot<N>) {
    let mut line: heapless::String<128> = heapless::String::new();
    for s in snap.iter() {
        // Truncated output is fine for a log line.
        let _ = core::fmt::Write::write_fmt(&mut line, format_args!(" {}", s));
    }
    info!("Temperature read ={}", line);
}
