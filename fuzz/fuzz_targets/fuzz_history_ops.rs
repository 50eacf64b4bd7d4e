//! Fuzz target: `TempHistory` write / snapshot sequences
//!
//! Interprets the input as a stream of operations (write a sample, take a
//! snapshot of some depth, serve a GATT read) and checks every snapshot
//! against a plain `Vec` model of the write sequence.
//!
//! cargo fuzz run fuzz_history_ops

#![no_main]

use heapless::Vec as HVec;
use libfuzzer_sys::fuzz_target;
use temphist::app::reader::HistoryReader;
use temphist::config::SamplerConfig;
use temphist::history::{HISTORY_CAPACITY, Sample, TempHistory};

const N: usize = HISTORY_CAPACITY;

fuzz_target!(|data: &[u8]| {
    let history = TempHistory::<N>::new();
    let mut writer = history.writer().expect("fresh history");
    let reader = HistoryReader::new(&history, &SamplerConfig::default());
    let mut model: Vec<i16> = Vec::new();

    for chunk in data.chunks(3) {
        match chunk {
            [0, lo, hi] => {
                let v = i16::from_le_bytes([*lo, *hi]);
                writer.write(Sample(v));
                model.push(v);
            }
            [1, count, ..] => {
                let count = usize::from(*count);
                let snap = history.snapshot(count);
                assert_eq!(snap.len(), count.min(N));
                for (i, s) in snap.iter().enumerate() {
                    let expected = model.len().checked_sub(i + 1).map_or(0, |k| model[k]);
                    assert_eq!(s.centi_celsius(), expected);
                }
                assert_eq!(history.try_snapshot(count).is_ok(), count <= N);
            }
            _ => {
                let mut out: HVec<u8, 64> = HVec::new();
                let n = reader.read_into(&mut out).expect("default report fits");
                assert_eq!(out.len(), n * 2);
            }
        }
        assert_eq!(history.cursor(), model.len() % N);
    }
});
