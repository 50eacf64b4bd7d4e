//! TempHist Firmware: Main Entry Point
//!
//! One periodic sampler fills a lock-free history ring; a BLE GATT
//! characteristic serves the newest samples on demand.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  TemperatureSource   CalloutTimer   SystemClock   LogEventSink │
//! │  (sensor)            (TickTimer)    (DelayNs)     (EventSink)  │
//! │  BleAdapter ── TemperatureService ── HistoryReader             │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          SamplingService (pure logic)                  │    │
//! │  │  Sampler ──HistoryWriter──▶ TempHistory                │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  EventQueue (timer callout + BLE callbacks → main loop)        │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{error, info, warn};

use temphist::adapters::ble::{BleAdapter, TemperatureService};
use temphist::adapters::log_sink::LogEventSink;
use temphist::adapters::time::SystemClock;
use temphist::app::reader::HistoryReader;
use temphist::app::sampler::Sampler;
use temphist::app::service::SamplingService;
use temphist::config::SamplerConfig;
use temphist::error::Error;
use temphist::events::{Event, EventQueue};
use temphist::history::{HISTORY_CAPACITY, TempHistory};

// ── Shared state ──────────────────────────────────────────────
//
// Both live for the whole program: the history is read from the BLE
// stack's callbacks, the queue is fed by the timer callout.

static HISTORY: TempHistory<HISTORY_CAPACITY> = TempHistory::new();
static EVENTS: EventQueue = EventQueue::new();

const DEVICE_NAME: &str = "TempHist";

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Bootstrap ──────────────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    info!("╔══════════════════════════════════════╗");
    info!("║  TempHist v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Config ─────────────────────────────────────────────
    let config = SamplerConfig::default();
    config.validate(HISTORY_CAPACITY)?;
    info!(
        "Config: {} Hz sampling, {} Hz ticks, report depth {}",
        config.sampling_rate_hz, config.tick_rate_hz, config.report_depth
    );

    // ── 3. Construct adapters ─────────────────────────────────
    #[cfg(target_os = "espidf")]
    let (mut source, mut timer) = (
        temphist::sensors::temperature::EspTemperatureSource::new()?,
        temphist::drivers::hw_timer::CalloutTimer::new(&EVENTS, config.tick_rate_hz)
            .map_err(Error::from)?,
    );
    #[cfg(not(target_os = "espidf"))]
    let (mut source, mut timer) = (
        temphist::sensors::temperature::SimTemperatureSource::default(),
        temphist::drivers::hw_timer::ManualTimer::new(),
    );

    let mut clock = SystemClock::new();
    let mut log_sink = LogEventSink::new();

    // The main loop sleeps on this until a callout or BLE callback fires.
    #[cfg(target_os = "espidf")]
    let notification = esp_idf_hal::task::notification::Notification::new();
    #[cfg(target_os = "espidf")]
    temphist::events::set_main_task_notifier(notification.notifier());

    // ── 4. Sampling service ───────────────────────────────────
    let writer = HISTORY
        .writer()
        .ok_or(Error::Init("history writer already taken"))?;
    let mut service = SamplingService::new(Sampler::new(writer, &config));

    if let Err(e) = service.start(&mut source, &mut timer, &mut clock, &mut log_sink) {
        error!("Sampler start failed: {}, halting", e);
        return Err(e.into());
    }

    // ── 5. BLE ────────────────────────────────────────────────
    #[cfg(target_os = "espidf")]
    temphist::adapters::ble::set_event_queue(&EVENTS);

    let mut name: heapless::String<24> = heapless::String::new();
    name.push_str(DEVICE_NAME)
        .map_err(|_| Error::Init("device name too long"))?;
    let mut ble = BleAdapter::new(name);
    ble.start(TemperatureService::new(HistoryReader::new(&HISTORY, &config)));

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    #[cfg(not(target_os = "espidf"))]
    const SIM_STEP_MS: u32 = 10;

    loop {
        // Simulate the callout on non-espidf targets.
        #[cfg(not(target_os = "espidf"))]
        {
            std::thread::sleep(std::time::Duration::from_millis(u64::from(SIM_STEP_MS)));
            let ticks = u64::from(config.tick_rate_hz) * u64::from(SIM_STEP_MS) / 1_000;
            timer.advance(ticks, &EVENTS);
        }

        // Bounded so a failed restart below is retried.
        #[cfg(target_os = "espidf")]
        let _ = notification.wait(esp_idf_hal::delay::TickType::new_millis(1_000).ticks());

        EVENTS.drain(|event| match event {
            Event::SampleTick => {
                service.handle_event(event, &mut source, &mut timer, &mut clock, &mut log_sink);
            }
            Event::BleConnected => ble.on_central_connected(),
            Event::BleDisconnected => ble.on_central_disconnected(),
        });

        // A rejected re-arm ends the callout chain; start a new one.
        if service.is_stalled() {
            warn!("Sampler stalled, restarting");
            if let Err(e) = service.start(&mut source, &mut timer, &mut clock, &mut log_sink) {
                error!("Sampler restart failed: {}", e);
            }
        }
    }
}
