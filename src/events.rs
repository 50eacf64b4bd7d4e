//! Interrupt-driven event queue.
//!
//! Events are produced by:
//! - the sample callout timer (one `SampleTick` per period)
//! - BLE GAP/GATTS callbacks (connect / disconnect)
//!
//! and consumed by the main loop, which hands them to the
//! [`SamplingService`](crate::app::service::SamplingService) one at a time.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Timer task  │────▶│  Event Queue │────▶│  Main Loop   │
//! │ BLE task    │────▶│  (lock-free) │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo.
const EVENT_QUEUE_CAP: usize = 16;

/// System event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// Sample callout fired.
    SampleTick = 10,
    /// A BLE central connected.
    BleConnected = 30,
    /// The BLE central went away.
    BleDisconnected = 31,
}

impl Event {
    fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            10 => Some(Self::SampleTick),
            30 => Some(Self::BleConnected),
            31 => Some(Self::BleDisconnected),
            _ => None,
        }
    }
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// Callback contexts write (produce), the main loop reads (consume).
// One slot is kept free to tell "full" from "empty".

pub struct EventQueue {
    head: AtomicU8,
    tail: AtomicU8,
    buffer: [AtomicU8; EVENT_QUEUE_CAP],
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            head: AtomicU8::new(0),
            tail: AtomicU8::new(0),
            buffer: [const { AtomicU8::new(0) }; EVENT_QUEUE_CAP],
        }
    }

    /// Push an event into the queue.
    /// Safe to call from callback context (lock-free).
    /// Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: Event) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

        if next_head == tail {
            return false; // Queue full, drop event.
        }

        self.buffer[head as usize].store(event as u8, Ordering::Relaxed);
        self.head.store(next_head, Ordering::Release);
        true
    }

    /// Pop the next event from the queue.
    /// Called from the main loop (single consumer).
    pub fn pop(&self) -> Option<Event> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail == head {
            return None; // Empty.
        }

        let raw = self.buffer[tail as usize].load(Ordering::Relaxed);
        self.tail
            .store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

        Event::from_u8(raw)
    }

    /// Drain all pending events into a callback, in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Relaxed) == self.head.load(Ordering::Acquire)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed) as usize;
        let tail = self.tail.load(Ordering::Relaxed) as usize;
        (head + EVENT_QUEUE_CAP - tail) % EVENT_QUEUE_CAP
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ── Main-task wakeup (ESP-IDF) ────────────────────────────────
//
// Producers push, then notify the main task, which blocks on its task
// notification between drains.  Notifications latch, so a push that lands
// while the loop is busy is picked up on the next wait.

#[cfg(target_os = "espidf")]
pub use wake::{set_main_task_notifier, wake_main_task};

#[cfg(target_os = "espidf")]
mod wake {
    use std::num::NonZeroU32;
    use std::sync::{Arc, OnceLock};

    use esp_idf_hal::task::notification::Notifier;

    static MAIN_TASK: OnceLock<Arc<Notifier>> = OnceLock::new();

    pub fn set_main_task_notifier(notifier: Arc<Notifier>) {
        let _ = MAIN_TASK.set(notifier);
    }

    /// Wake the main loop.  Call from task context only.
    pub fn wake_main_task() {
        if let Some(notifier) = MAIN_TASK.get() {
            // SAFETY: producers are the esp_timer and Bluedroid tasks,
            // never an ISR.
            let _ = unsafe { notifier.notify_and_yield(NonZeroU32::MIN) };
        }
    }
}
