//! Sample callout timer.
//!
//! A one-shot timer that the sampler re-arms at the start of every period.
//! When it expires it pushes [`Event::SampleTick`] into the lock-free
//! [`EventQueue`]; the main loop then runs the period.
//!
//! Re-arms are anchored to the deadline that just expired, not to the
//! moment the main loop got round to the tick, so dispatch latency shows
//! up as jitter and never as a lower sampling rate.
//!
//! - **`target_os = "espidf"`**: [`CalloutTimer`] wraps an `esp_timer`
//!   one-shot.  The callback runs in the ESP timer task (not ISR), touches
//!   only the lock-free queue and wakes the main task.
//! - **all targets**: [`ManualTimer`] advances virtual ticks on demand,
//!   for host tests and simulation.

use log::debug;

use crate::app::ports::{TickTimer, TimerError};
use crate::events::{Event, EventQueue};

// ───────────────────────────────────────────────────────────────
// Manual (virtual time) timer
// ───────────────────────────────────────────────────────────────

/// Virtual-tick callout.  `advance` moves time forward and fires the
/// pending callout if its deadline has passed.
#[derive(Debug, Default)]
pub struct ManualTimer {
    now: u64,
    deadline: Option<u64>,
    /// Deadline of the last callout that fired; the base for `rearm`.
    expired: Option<u64>,
    rearms: u32,
    fail_next: bool,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `arm` / `rearm` fail once.
    pub fn fail_next_rearm(&mut self) {
        self.fail_next = true;
    }

    /// Absolute tick of the pending callout, if armed.
    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    /// Successful arms and re-arms so far.
    pub fn rearms(&self) -> u32 {
        self.rearms
    }

    /// Advance virtual time by `ticks`.  Returns `true` if the callout
    /// fired (and was pushed into `queue`).
    pub fn advance(&mut self, ticks: u64, queue: &EventQueue) -> bool {
        self.now += ticks;
        match self.deadline {
            Some(at) if at <= self.now => {
                self.deadline = None;
                self.expired = Some(at);
                if !queue.push(Event::SampleTick) {
                    debug!("hw_timer(sim): event queue full, tick dropped");
                }
                true
            }
            _ => false,
        }
    }

    fn schedule(&mut self, base: u64, ticks: u32) -> Result<(), TimerError> {
        if core::mem::take(&mut self.fail_next) {
            return Err(TimerError::Rejected(-1));
        }
        self.deadline = Some(base + u64::from(ticks));
        self.rearms += 1;
        Ok(())
    }
}

impl TickTimer for ManualTimer {
    fn arm(&mut self, ticks: u32) -> Result<(), TimerError> {
        self.expired = None;
        self.schedule(self.now, ticks)
    }

    fn rearm(&mut self, ticks: u32) -> Result<(), TimerError> {
        let base = self.expired.take().unwrap_or(self.now);
        self.schedule(base, ticks)
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF one-shot timer
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::CalloutTimer;

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_svc::sys::*;
    use log::info;

    use crate::app::ports::{TickTimer, TimerError};
    use crate::events::{self, Event, EventQueue};

    unsafe extern "C" fn sample_callout_cb(arg: *mut core::ffi::c_void) {
        // SAFETY: `arg` is the `&'static EventQueue` handed to
        // `CalloutTimer::new`; it outlives every callback.
        let queue = unsafe { &*(arg as *const EventQueue) };
        queue.push(Event::SampleTick);
        events::wake_main_task();
    }

    /// One-shot `esp_timer` whose expiry enqueues a sample tick.
    pub struct CalloutTimer {
        handle: esp_timer_handle_t,
        tick_rate_hz: u32,
        /// Absolute expiry (µs since boot) of the last scheduled callout.
        due_us: Option<u64>,
    }

    impl CalloutTimer {
        pub fn new(queue: &'static EventQueue, tick_rate_hz: u32) -> Result<Self, TimerError> {
            let mut handle: esp_timer_handle_t = core::ptr::null_mut();
            let args = esp_timer_create_args_t {
                callback: Some(sample_callout_cb),
                arg: queue as *const EventQueue as *mut core::ffi::c_void,
                dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                name: c"temp_sample".as_ptr(),
                skip_unhandled_events: false,
            };
            // SAFETY: args and the out-handle are valid for the call.
            let ret = unsafe { esp_timer_create(&args, &mut handle) };
            if ret != ESP_OK {
                return Err(TimerError::Rejected(ret));
            }
            info!("hw_timer: sample callout created ({} ticks/s)", tick_rate_hz);
            Ok(Self {
                handle,
                tick_rate_hz,
                due_us: None,
            })
        }

        fn period_us(&self, ticks: u32) -> u64 {
            u64::from(ticks) * 1_000_000 / u64::from(self.tick_rate_hz.max(1))
        }

        /// Start the one-shot so it expires at `due_us`, or immediately if
        /// that moment has already passed.
        fn schedule(&mut self, due_us: u64) -> Result<(), TimerError> {
            if self.handle.is_null() {
                return Err(TimerError::NotInitialised);
            }
            // SAFETY: plain read of the monotonic system timer.
            let now_us = unsafe { esp_timer_get_time() } as u64;
            // SAFETY: handle is valid for the life of `self`.  Stopping an
            // idle timer just returns ESP_ERR_INVALID_STATE.
            unsafe {
                esp_timer_stop(self.handle);
                let ret = esp_timer_start_once(self.handle, due_us.saturating_sub(now_us));
                if ret != ESP_OK {
                    self.due_us = None;
                    return Err(TimerError::Rejected(ret));
                }
            }
            self.due_us = Some(due_us);
            Ok(())
        }
    }

    impl TickTimer for CalloutTimer {
        fn arm(&mut self, ticks: u32) -> Result<(), TimerError> {
            // SAFETY: plain read of the monotonic system timer.
            let now_us = unsafe { esp_timer_get_time() } as u64;
            self.schedule(now_us + self.period_us(ticks))
        }

        fn rearm(&mut self, ticks: u32) -> Result<(), TimerError> {
            let Some(prev) = self.due_us else {
                return self.arm(ticks);
            };
            self.schedule(prev + self.period_us(ticks))
        }
    }
}
