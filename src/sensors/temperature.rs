//! On-die temperature sensor driver.
//!
//! Exposes the peripheral through [`TemperatureSource`]: start a
//! conversion, poll data-ready, read the result in 0.25 °C steps.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: wraps the `temperature_sensor` driver.  The IDF call is
//! synchronous, so `start_conversion` performs the measurement and caches
//! it; `data_ready` reports whether that measurement succeeded.
//! On host/test: [`SimTemperatureSource`] serves an injectable raw value
//! and can be told to stop answering, to exercise the timeout path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use crate::app::ports::TemperatureSource;

/// 25.00 °C in raw quarter-degree units.
pub const ROOM_TEMP_RAW: i32 = 100;

// ───────────────────────────────────────────────────────────────
// Simulation source
// ───────────────────────────────────────────────────────────────

#[derive(Debug)]
struct SimState {
    raw: AtomicI32,
    responsive: AtomicBool,
    converting: AtomicBool,
    conversions: AtomicU32,
}

/// Simulated peripheral.  Clones share state, so a test can keep a handle
/// to inject readings while the sampler owns another.
#[derive(Debug, Clone)]
pub struct SimTemperatureSource {
    state: Arc<SimState>,
}

impl SimTemperatureSource {
    pub fn new(raw: i32) -> Self {
        Self {
            state: Arc::new(SimState {
                raw: AtomicI32::new(raw),
                responsive: AtomicBool::new(true),
                converting: AtomicBool::new(false),
                conversions: AtomicU32::new(0),
            }),
        }
    }

    /// Value returned by the next completed conversion.
    pub fn set_raw(&self, raw: i32) {
        self.state.raw.store(raw, Ordering::Relaxed);
    }

    /// `false` makes every conversion hang (data-ready never set).
    pub fn set_responsive(&self, responsive: bool) {
        self.state.responsive.store(responsive, Ordering::Relaxed);
    }

    /// Conversions started so far.
    pub fn conversions(&self) -> u32 {
        self.state.conversions.load(Ordering::Relaxed)
    }
}

impl Default for SimTemperatureSource {
    fn default() -> Self {
        Self::new(ROOM_TEMP_RAW)
    }
}

impl TemperatureSource for SimTemperatureSource {
    fn start_conversion(&mut self) {
        self.state.conversions.fetch_add(1, Ordering::Relaxed);
        self.state.converting.store(true, Ordering::Relaxed);
    }

    fn data_ready(&mut self) -> bool {
        self.state.converting.load(Ordering::Relaxed)
            && self.state.responsive.load(Ordering::Relaxed)
    }

    fn read_raw(&mut self) -> i32 {
        self.state.converting.store(false, Ordering::Relaxed);
        self.state.raw.load(Ordering::Relaxed)
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF source
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::EspTemperatureSource;

#[cfg(target_os = "espidf")]
mod esp {
    use esp_idf_svc::sys::*;
    use log::{info, warn};

    use crate::app::ports::TemperatureSource;
    use crate::error::Error;

    /// ESP32-S3 internal temperature sensor.
    pub struct EspTemperatureSource {
        handle: temperature_sensor_handle_t,
        pending: Option<i32>,
    }

    impl EspTemperatureSource {
        /// Install and enable the sensor for the -10..80 °C range.
        pub fn new() -> Result<Self, Error> {
            let mut handle: temperature_sensor_handle_t = core::ptr::null_mut();
            // SAFETY: config is fully initialised below; `handle` is an out
            // pointer the driver fills on success.
            unsafe {
                let mut cfg: temperature_sensor_config_t = core::mem::zeroed();
                cfg.range_min = -10;
                cfg.range_max = 80;
                cfg.clk_src = soc_periph_temperature_sensor_clk_src_t_TEMPERATURE_SENSOR_CLK_SRC_DEFAULT;
                if temperature_sensor_install(&cfg, &mut handle) != ESP_OK {
                    return Err(Error::Init("temperature sensor install failed"));
                }
                if temperature_sensor_enable(handle) != ESP_OK {
                    return Err(Error::Init("temperature sensor enable failed"));
                }
            }
            info!("temp sensor: installed (-10..80 C)");
            Ok(Self {
                handle,
                pending: None,
            })
        }
    }

    impl TemperatureSource for EspTemperatureSource {
        fn start_conversion(&mut self) {
            let mut celsius: f32 = 0.0;
            // SAFETY: handle was enabled in `new()` and is never freed.
            let rc = unsafe { temperature_sensor_get_celsius(self.handle, &mut celsius) };
            self.pending = if rc == ESP_OK {
                Some((celsius * 4.0).round() as i32)
            } else {
                warn!("temp sensor: read failed (rc={})", rc);
                None
            };
        }

        fn data_ready(&mut self) -> bool {
            self.pending.is_some()
        }

        fn read_raw(&mut self) -> i32 {
            self.pending.take().unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_is_not_ready_before_start() {
        let mut sim = SimTemperatureSource::default();
        assert!(!sim.data_ready());
        sim.start_conversion();
        assert!(sim.data_ready());
        assert_eq!(sim.read_raw(), ROOM_TEMP_RAW);
        assert!(!sim.data_ready(), "read consumes the conversion");
    }

    #[test]
    fn clones_share_injected_values() {
        let mut sim = SimTemperatureSource::new(0);
        let handle = sim.clone();
        handle.set_raw(-40);
        sim.start_conversion();
        assert_eq!(sim.read_raw(), -40);
        assert_eq!(handle.conversions(), 1);
    }

    #[test]
    fn unresponsive_sim_never_becomes_ready() {
        let mut sim = SimTemperatureSource::default();
        sim.set_responsive(false);
        sim.start_conversion();
        assert!(!sim.data_ready());
    }
}
