//! Timing records for queries and pipelines.
//!
//! Each record is one JSON object logged at trace level to [`DEV6_TARGET`]. A thread can also
//! open a [`BenchCapture`] to collect its own records in memory, which keeps assertions on them
//! independent of whichever global logger is installed.

use crate::logger::DEV6_TARGET;
use crate::utils::num::u128_to_u64_saturating;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::time::Instant;

thread_local! {
    static CAPTURED: RefCell<Option<Vec<Value>>> = const { RefCell::new(None) };
}

/// Collects this thread's timing records until dropped.
#[derive(Debug)]
pub struct BenchCapture(());

impl BenchCapture {
    #[must_use]
    pub fn start() -> Self {
        CAPTURED.with(|c| *c.borrow_mut() = Some(Vec::new()));
        Self(())
    }

    /// Takes the records captured so far.
    #[must_use]
    pub fn take(&self) -> Vec<Value> {
        CAPTURED.with(|c| c.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
    }
}

impl Drop for BenchCapture {
    fn drop(&mut self) {
        CAPTURED.with(|c| *c.borrow_mut() = None);
    }
}

/// Emits `{"bench": kind, "op": op, "duration_ms": .., ...fields}` for work started at `started`.
pub fn bench(kind: &str, op: &str, started: Instant, fields: &[(&str, Value)]) {
    let mut record = Map::new();
    record.insert("bench".into(), Value::from(kind));
    record.insert("op".into(), Value::from(op));
    let ms = u128_to_u64_saturating(started.elapsed().as_millis());
    record.insert("duration_ms".into(), Value::from(ms));
    for (key, value) in fields {
        record.insert((*key).to_string(), value.clone());
    }
    let record = Value::Object(record);
    if log::log_enabled!(target: DEV6_TARGET, log::Level::Trace) {
        log::trace!(target: DEV6_TARGET, "{record}");
    }
    CAPTURED.with(|c| {
        if let Some(buf) = c.borrow_mut().as_mut() {
            buf.push(record);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_collects_and_drains() {
        let capture = BenchCapture::start();
        bench("query", "count", Instant::now(), &[("result_count", Value::from(3))]);
        let records = capture.take();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["op"], "count");
        assert_eq!(records[0]["result_count"], 3);
        assert!(capture.take().is_empty());
    }

    #[test]
    fn other_threads_are_not_captured() {
        let capture = BenchCapture::start();
        std::thread::spawn(|| bench("query", "find", Instant::now(), &[]))
            .join()
            .unwrap();
        assert!(capture.take().is_empty());
    }

    #[test]
    fn nothing_is_kept_without_capture() {
        bench("query", "find", Instant::now(), &[]);
        let capture = BenchCapture::start();
        assert!(capture.take().is_empty());
    }
}
