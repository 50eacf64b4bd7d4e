//! Integration tests for the GATT read path: history → HistoryReader →
//! TemperatureService → ATT response bytes.

use heapless::Vec as HVec;
use temphist::adapters::ble::{
    ATT_ERR_INSUFFICIENT_RES, ATT_OK, AccessOp, CHAR_TEMPERATURE, MAX_READ_BYTES,
    TemperatureService,
};
use temphist::app::reader::HistoryReader;
use temphist::config::SamplerConfig;
use temphist::history::{HISTORY_CAPACITY, Sample, TempHistory};

type History = TempHistory<HISTORY_CAPACITY>;

fn decode(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect()
}

fn read(svc: &TemperatureService<'_, HISTORY_CAPACITY>) -> (u8, Vec<i16>) {
    let mut out: HVec<u8, MAX_READ_BYTES> = HVec::new();
    let status = svc.access(CHAR_TEMPERATURE, AccessOp::ReadChr, &mut out);
    (status, decode(&out))
}

#[test]
fn fresh_history_reports_zeros() {
    let history = History::new();
    let svc = TemperatureService::new(HistoryReader::new(&history, &SamplerConfig::default()));

    let (status, values) = read(&svc);
    assert_eq!(status, ATT_OK);
    assert_eq!(values, vec![0; 10]);
}

#[test]
fn masked_reader_reports_only_written_slots() {
    let history = History::new();
    let config = SamplerConfig {
        mask_unwritten: true,
        ..SamplerConfig::default()
    };
    let svc = TemperatureService::new(HistoryReader::new(&history, &config));

    assert_eq!(read(&svc), (ATT_OK, vec![]));

    let mut w = history.writer().unwrap();
    w.write(Sample(2500));
    w.write(Sample(2525));
    assert_eq!(read(&svc), (ATT_OK, vec![2525, 2500]));

    for _ in 0..HISTORY_CAPACITY {
        w.write(Sample(1));
    }
    assert_eq!(read(&svc).1.len(), config.report_depth);
}

#[test]
fn report_follows_the_ring_across_wraparound() {
    let history = History::new();
    let svc = TemperatureService::new(HistoryReader::new(&history, &SamplerConfig::default()));
    let mut w = history.writer().unwrap();

    for raw in 0..37 {
        w.write(Sample::from_quarter_degrees(raw));
    }

    let expected: Vec<i16> = (27..37).rev().map(|raw| raw * 25).collect();
    assert_eq!(read(&svc), (ATT_OK, expected));
}

#[test]
fn reads_do_not_move_the_cursor() {
    let history = History::new();
    let svc = TemperatureService::new(HistoryReader::new(&history, &SamplerConfig::default()));
    let mut w = history.writer().unwrap();
    w.write(Sample(1234));

    let first = read(&svc);
    let second = read(&svc);
    assert_eq!(first, second);
    assert_eq!(history.cursor(), 1);
}

#[test]
fn response_buffer_too_small_is_insufficient_resources() {
    let history = History::new();
    let svc = TemperatureService::new(HistoryReader::new(&history, &SamplerConfig::default()));

    let mut out: HVec<u8, 19> = HVec::new();
    assert_eq!(
        svc.access(CHAR_TEMPERATURE, AccessOp::ReadChr, &mut out),
        ATT_ERR_INSUFFICIENT_RES
    );
    assert!(out.is_empty());
}

#[test]
fn reads_during_sampling_stay_consistent() {
    let history = History::new();
    let svc = TemperatureService::new(HistoryReader::new(&history, &SamplerConfig::default()));
    let mut w = history.writer().unwrap();

    std::thread::scope(|s| {
        s.spawn(|| {
            for v in 0..5_000i16 {
                w.write(Sample(v));
            }
        });
        s.spawn(|| {
            for _ in 0..500 {
                let (status, values) = read(&svc);
                assert_eq!(status, ATT_OK);
                assert_eq!(values.len(), 10);
            }
        });
    });

    assert_eq!(read(&svc).1[0], 4_999);
}
