//! Integration tests for the callout → queue → SamplingService → history
//! pipeline.
//!
//! Virtual time comes from [`ManualTimer`]; every fired callout lands in a
//! real [`EventQueue`] and is drained the way the main loop drains it.

use temphist::app::events::AppEvent;
use temphist::app::sampler::Sampler;
use temphist::app::service::SamplingService;
use temphist::config::SamplerConfig;
use temphist::drivers::hw_timer::ManualTimer;
use temphist::error::Error;
use temphist::events::{Event, EventQueue};
use temphist::history::{HISTORY_CAPACITY, Sample, TempHistory};
use temphist::sensors::temperature::SimTemperatureSource;

use crate::mock_hw::{CountingDelay, RecordingSink, ScriptedSensor};

type History = TempHistory<HISTORY_CAPACITY>;

fn centi(history: &History, count: usize) -> Vec<i16> {
    history
        .snapshot(count)
        .iter()
        .map(Sample::centi_celsius)
        .collect()
}

/// Advance one sampling period and drain the queue into the service.
fn run_period<S: temphist::app::ports::TemperatureSource>(
    service: &mut SamplingService<'_, HISTORY_CAPACITY>,
    source: &mut S,
    timer: &mut ManualTimer,
    queue: &EventQueue,
    delay: &mut CountingDelay,
    sink: &mut RecordingSink,
) {
    let period = u64::from(service.sampler().period_ticks());
    timer.advance(period, queue);
    queue.drain(|event| {
        service.handle_event(event, &mut *source, &mut *timer, &mut *delay, &mut *sink);
    });
}

// ── Normal operation ──────────────────────────────────────────

#[test]
fn three_readings_are_reported_newest_first() {
    let history = History::new();
    let config = SamplerConfig::default();
    let queue = EventQueue::new();
    let mut service = SamplingService::new(Sampler::new(history.writer().unwrap(), &config));

    let mut source = SimTemperatureSource::default();
    let handle = source.clone();
    let mut timer = ManualTimer::new();
    let mut delay = CountingDelay::default();
    let mut sink = RecordingSink::new();

    service
        .start(&mut source, &mut timer, &mut delay, &mut sink)
        .unwrap();
    assert_eq!(sink.events[0], AppEvent::Started { period_ticks: 100 });
    assert_eq!(timer.deadline(), Some(100));

    for raw in [100, 101, 102] {
        handle.set_raw(raw);
        run_period(&mut service, &mut source, &mut timer, &queue, &mut delay, &mut sink);
    }

    assert_eq!(centi(&history, 3), vec![2550, 2525, 2500]);
    assert_eq!(history.cursor(), 3);
    assert_eq!(sink.stored(), 3);
    assert_eq!(service.ticks_handled(), 3);
    assert_eq!(
        sink.events.last(),
        Some(&AppEvent::SampleStored {
            sample: Sample(2550),
            cursor: 3
        })
    );
}

#[test]
fn twenty_periods_wrap_the_ring() {
    let history = History::new();
    let config = SamplerConfig::default();
    let queue = EventQueue::new();
    let mut service = SamplingService::new(Sampler::new(history.writer().unwrap(), &config));

    let mut source = SimTemperatureSource::new(0);
    let handle = source.clone();
    let mut timer = ManualTimer::new();
    let mut delay = CountingDelay::default();
    let mut sink = RecordingSink::new();
    service
        .start(&mut source, &mut timer, &mut delay, &mut sink)
        .unwrap();

    for raw in 0..20 {
        handle.set_raw(raw);
        run_period(&mut service, &mut source, &mut timer, &queue, &mut delay, &mut sink);
    }

    let expected: Vec<i16> = (4..20).rev().map(|raw| raw * 25).collect();
    assert_eq!(centi(&history, HISTORY_CAPACITY), expected);
    assert_eq!(history.cursor(), 20 % HISTORY_CAPACITY);
    assert!(history.is_primed());
    assert_eq!(service.stats().samples_stored, 20);
    assert_eq!(timer.rearms(), 21, "one re-arm at start plus one per period");
}

#[test]
fn no_tick_until_the_period_elapses() {
    let history = History::new();
    let config = SamplerConfig::default();
    let queue = EventQueue::new();
    let mut service = SamplingService::new(Sampler::new(history.writer().unwrap(), &config));
    let mut source = SimTemperatureSource::default();
    let mut timer = ManualTimer::new();
    let mut delay = CountingDelay::default();
    let mut sink = RecordingSink::new();
    service
        .start(&mut source, &mut timer, &mut delay, &mut sink)
        .unwrap();

    assert!(!timer.advance(99, &queue));
    assert!(queue.is_empty());
    assert!(timer.advance(1, &queue));
    assert_eq!(queue.pop(), Some(Event::SampleTick));
}

#[test]
fn late_dispatch_does_not_lower_the_sampling_rate() {
    let history = History::new();
    // 3 Hz on a 1 kHz tick: 333-tick periods, polled every 100 ticks.
    let config = SamplerConfig {
        sampling_rate_hz: 3,
        ..SamplerConfig::default()
    };
    config.validate(HISTORY_CAPACITY).unwrap();
    let queue = EventQueue::new();
    let mut service = SamplingService::new(Sampler::new(history.writer().unwrap(), &config));
    let mut source = SimTemperatureSource::default();
    let mut timer = ManualTimer::new();
    let mut delay = CountingDelay::default();
    let mut sink = RecordingSink::new();
    service
        .start(&mut source, &mut timer, &mut delay, &mut sink)
        .unwrap();
    assert_eq!(service.sampler().period_ticks(), 333);

    // Ten seconds of main-loop iterations, each up to 99 ticks late.
    for _ in 0..100 {
        timer.advance(100, &queue);
        queue.drain(|event| {
            service.handle_event(event, &mut source, &mut timer, &mut delay, &mut sink);
        });
    }

    assert_eq!(service.stats().samples_stored, 30);
    assert_eq!(timer.deadline(), Some(31 * 333));
}

// ── Failure paths ─────────────────────────────────────────────

#[test]
fn hung_conversion_skips_one_slot_and_recovers() {
    let history = History::new();
    let config = SamplerConfig::default();
    let queue = EventQueue::new();
    let mut service = SamplingService::new(Sampler::new(history.writer().unwrap(), &config));

    // Warm-up, tick 1 (100), tick 2 hangs, tick 3 (104).
    let mut source = ScriptedSensor::new(&[Some(100), None, Some(104)]);
    let mut timer = ManualTimer::new();
    let mut delay = CountingDelay::default();
    let mut sink = RecordingSink::new();
    service
        .start(&mut source, &mut timer, &mut delay, &mut sink)
        .unwrap();

    for _ in 0..3 {
        run_period(&mut service, &mut source, &mut timer, &queue, &mut delay, &mut sink);
    }

    assert_eq!(centi(&history, 2), vec![2600, 2500]);
    assert_eq!(history.cursor(), 2, "the timed-out period stores nothing");
    assert_eq!(sink.failures(), vec![Error::HardwareTimeout]);
    assert!(!service.is_stalled(), "a timeout does not break the chain");
    // Warm-up, one per stored sample, and one restart after the timeout.
    assert_eq!(source.conversions, 4);

    let stats = service.stats();
    assert_eq!(stats.samples_stored, 2);
    assert_eq!(stats.hardware_timeouts, 1);
    assert_eq!(stats.last_sample, Some(Sample(2600)));

    // The wait is bounded by the configured timeout.
    assert!(delay.waited_ns >= u64::from(config.ready_timeout_us) * 1_000);
}

#[test]
fn rejected_rearm_stalls_until_restart() {
    let history = History::new();
    let config = SamplerConfig::default();
    let queue = EventQueue::new();
    let mut service = SamplingService::new(Sampler::new(history.writer().unwrap(), &config));
    let mut source = SimTemperatureSource::default();
    let mut timer = ManualTimer::new();
    let mut delay = CountingDelay::default();
    let mut sink = RecordingSink::new();
    service
        .start(&mut source, &mut timer, &mut delay, &mut sink)
        .unwrap();

    timer.fail_next_rearm();
    run_period(&mut service, &mut source, &mut timer, &queue, &mut delay, &mut sink);

    assert!(service.is_stalled());
    assert_eq!(sink.failures(), vec![Error::SchedulingFailure]);
    assert_eq!(history.cursor(), 0, "nothing stored after a failed re-arm");
    assert_eq!(service.stats().scheduling_failures, 1);
    assert_eq!(timer.deadline(), None);

    // Without a callout, time passing produces no ticks.
    assert!(!timer.advance(10_000, &queue));

    service
        .start(&mut source, &mut timer, &mut delay, &mut sink)
        .unwrap();
    assert!(!service.is_stalled());
    run_period(&mut service, &mut source, &mut timer, &queue, &mut delay, &mut sink);
    assert_eq!(centi(&history, 1), vec![2500]);
}

#[test]
fn unresponsive_sensor_is_fatal_at_start() {
    let history = History::new();
    let config = SamplerConfig::default();
    let mut service = SamplingService::new(Sampler::new(history.writer().unwrap(), &config));
    let mut source = ScriptedSensor::new(&[None]);
    let mut timer = ManualTimer::new();
    let mut delay = CountingDelay::default();
    let mut sink = RecordingSink::new();

    let err = service
        .start(&mut source, &mut timer, &mut delay, &mut sink)
        .unwrap_err();
    assert_eq!(err, Error::HardwareTimeout);
    assert!(err.is_startup_fatal());
    assert!(!service.is_started());
    assert!(sink.events.is_empty());
    assert_eq!(timer.deadline(), None, "no callout armed for a dead sensor");
}

#[test]
fn ticks_before_start_and_ble_events_are_ignored() {
    let history = History::new();
    let config = SamplerConfig::default();
    let mut service = SamplingService::new(Sampler::new(history.writer().unwrap(), &config));
    let mut source = SimTemperatureSource::default();
    let mut timer = ManualTimer::new();
    let mut delay = CountingDelay::default();
    let mut sink = RecordingSink::new();

    for event in [Event::SampleTick, Event::BleConnected, Event::BleDisconnected] {
        service.handle_event(event, &mut source, &mut timer, &mut delay, &mut sink);
    }

    assert_eq!(service.ticks_handled(), 0);
    assert_eq!(history.cursor(), 0);
    assert!(sink.events.is_empty());
}

#[test]
fn second_writer_cannot_be_claimed() {
    let history = History::new();
    let _writer = history.writer().unwrap();
    assert!(history.writer().is_none());
}
