//! Lock-free temperature history ring.
//!
//! One producer (the sampler, running from the timer callout) and any
//! number of snapshot readers (the GATT read handler) share a single
//! [`TempHistory`] without a lock:
//!
//! ```text
//!   Sampler ──write──▶ [ s0 | s1 | s2 | ... | s15 ] ◀──snapshot── GATT read
//!                              ▲
//!                           cursor (next slot to write)
//! ```
//!
//! The cursor is the only state a reader trusts.  It is loaded exactly
//! once per snapshot (Acquire, pairing with the writer's Release store),
//! and the walk runs backward from it.  Slots are `AtomicI16` so a slot
//! that is overwritten mid-walk reads as either the old or the new sample,
//! never a mix of both.  A reader that is slower than one sampling period
//! may therefore see a slot from a newer generation than its cursor
//! implies; the index itself can never be torn.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicI16, AtomicUsize, Ordering};

use heapless::Vec;

use crate::error::{Error, Result};

/// History capacity used by the firmware.  Power of two.
pub const HISTORY_CAPACITY: usize = 16;

// ───────────────────────────────────────────────────────────────
// Sample
// ───────────────────────────────────────────────────────────────

/// Degrees Celsius scaled by 100 (`2550` = 25.50 °C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Sample(pub i16);

impl Sample {
    /// Convert a raw reading in 0.25 °C steps (`raw * 100 / 4`).
    ///
    /// Saturates at the i16 range; real sensors stay far inside it.
    pub fn from_quarter_degrees(raw: i32) -> Self {
        let scaled = raw.saturating_mul(100) / 4;
        Self(scaled.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16)
    }

    pub const fn centi_celsius(self) -> i16 {
        self.0
    }

    pub fn celsius(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    pub const fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl From<i16> for Sample {
    fn from(v: i16) -> Self {
        Self(v)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Snapshot
// ───────────────────────────────────────────────────────────────

/// Most-recent-first copy of the newest samples.  Lives on the caller's
/// stack and is never shared back into the ring.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot<const N: usize> {
    samples: Vec<Sample, N>,
}

impl<const N: usize> Snapshot<N> {
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The newest sample, if any.
    pub fn latest(&self) -> Option<Sample> {
        self.samples.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        self.samples.iter().copied()
    }

    /// Size of the little-endian wire encoding in bytes.
    pub fn encoded_len(&self) -> usize {
        self.samples.len() * core::mem::size_of::<i16>()
    }

    /// Append the samples as little-endian i16 values.
    ///
    /// Returns `false` (leaving `out` untouched) if `out` cannot hold the
    /// whole payload.
    pub fn encode_le<const B: usize>(&self, out: &mut Vec<u8, B>) -> bool {
        if out.capacity() - out.len() < self.encoded_len() {
            return false;
        }
        for s in &self.samples {
            // Capacity checked above.
            let _ = out.extend_from_slice(&s.to_le_bytes());
        }
        true
    }
}

// ───────────────────────────────────────────────────────────────
// TempHistory
// ───────────────────────────────────────────────────────────────

/// Fixed-capacity ring of [`Sample`]s with a single atomic write cursor.
///
/// `N` must be a non-zero power of two so wraparound is a bitmask; this is
/// checked at compile time in [`TempHistory::new`].
pub struct TempHistory<const N: usize> {
    slots: [AtomicI16; N],
    /// Slot that receives the next sample.
    cursor: AtomicUsize,
    /// Slots written at least once, saturating at `N`.
    written: AtomicUsize,
    writer_taken: AtomicBool,
}

impl<const N: usize> TempHistory<N> {
    const MASK: usize = {
        assert!(N.is_power_of_two(), "history capacity must be a power of two");
        N - 1
    };

    /// Create an empty history.  Unwritten slots read as `0`.
    pub const fn new() -> Self {
        let _ = Self::MASK;
        Self {
            slots: [const { AtomicI16::new(0) }; N],
            cursor: AtomicUsize::new(0),
            written: AtomicUsize::new(0),
            writer_taken: AtomicBool::new(false),
        }
    }

    /// Claim the single write handle.
    ///
    /// Returns `None` once the handle has been handed out; there is
    /// exactly one producer for the lifetime of the history.
    pub fn writer(&self) -> Option<HistoryWriter<'_, N>> {
        if self.writer_taken.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(HistoryWriter { history: self })
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Index of the slot that receives the next sample.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Slots written at least once (saturates at capacity).
    pub fn written(&self) -> usize {
        self.written.load(Ordering::Acquire)
    }

    /// `true` once every slot holds a real sample.
    pub fn is_primed(&self) -> bool {
        self.written() == N
    }

    /// The newest `count` samples, most recent first.
    ///
    /// `count` above capacity is clamped so that no slot is reported twice.
    /// Never writes, blocks or locks.
    pub fn snapshot(&self, count: usize) -> Snapshot<N> {
        let count = count.min(N);
        // Single cursor load; the walk never re-reads it.
        let head = self.cursor.load(Ordering::Acquire);
        let mut samples = Vec::new();
        let mut index = head;
        for _ in 0..count {
            index = index.wrapping_sub(1) & Self::MASK;
            let value = self.slots[index].load(Ordering::Relaxed);
            // count <= N == capacity of `samples`.
            let _ = samples.push(Sample(value));
        }
        Snapshot { samples }
    }

    /// Like [`snapshot`](Self::snapshot) but rejects `count > capacity`.
    pub fn try_snapshot(&self, count: usize) -> Result<Snapshot<N>> {
        if count > N {
            return Err(Error::BufferOverrun {
                requested: count,
                capacity: N,
            });
        }
        Ok(self.snapshot(count))
    }
}

impl<const N: usize> Default for TempHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for TempHistory<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TempHistory")
            .field("capacity", &N)
            .field("cursor", &self.cursor())
            .field("written", &self.written())
            .finish()
    }
}

// ───────────────────────────────────────────────────────────────
// HistoryWriter
// ───────────────────────────────────────────────────────────────

/// The unique producer handle of a [`TempHistory`].
///
/// Not `Clone`: holding it is what makes the holder the single writer.
pub struct HistoryWriter<'a, const N: usize> {
    history: &'a TempHistory<N>,
}

impl<const N: usize> HistoryWriter<'_, N> {
    /// Store `sample` in the cursor slot, then advance the cursor.
    ///
    /// The slot store happens before the Release store of the cursor, so a
    /// reader that observes the new cursor also observes the sample.
    pub fn write(&mut self, sample: Sample) {
        let h = self.history;
        let head = h.cursor.load(Ordering::Relaxed);
        h.slots[head].store(sample.0, Ordering::Relaxed);
        h.cursor
            .store((head + 1) & TempHistory::<N>::MASK, Ordering::Release);

        let written = h.written.load(Ordering::Relaxed);
        if written < N {
            h.written.store(written + 1, Ordering::Release);
        }
    }

    /// Index of the slot the next [`write`](Self::write) fills.
    pub fn cursor(&self) -> usize {
        self.history.cursor.load(Ordering::Relaxed)
    }

    /// The history this handle writes into.
    pub fn history(&self) -> &TempHistory<N> {
        self.history
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
