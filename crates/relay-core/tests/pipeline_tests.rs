//! Log pipeline properties: index contiguity under contention, torn-write
//! freedom, and the overflow purge policy at real ring capacity.

use relay_core::{Clock, Level, LogRecord, LogSink, Logger, LOG_RING_CAPACITY};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;

/// Captures emitted records as `(index, label, text)` triples.
#[derive(Clone, Default)]
struct CaptureSink {
    lines: Arc<Mutex<Vec<(u64, String, String)>>>,
}

impl LogSink for CaptureSink {
    fn emit(&mut self, record: &LogRecord) {
        self.lines.lock().unwrap().push((
            record.index,
            record.label().to_owned(),
            record.text().to_owned(),
        ));
    }
}

fn logger(capacity: usize) -> (Arc<Logger>, CaptureSink) {
    let capture = CaptureSink::default();
    let logger = Arc::new(Logger::with_sinks(
        Arc::new(Clock::new()),
        Level::Trace,
        3,
        capacity,
        vec![Box::new(capture.clone())],
    ));
    (logger, capture)
}

#[test]
fn concurrent_producers_contiguous_indexes_no_tearing() {
    const PRODUCERS: usize = 2;
    const PER_PRODUCER: usize = 10_000;
    const TEXTS: [&str; 2] = ["alpha payload", "bravo payload"];

    let (logger, capture) = logger(LOG_RING_CAPACITY);
    logger.set_worker_live(true);

    let mut handles = vec![];
    for producer in 0..PRODUCERS {
        let logger = Arc::clone(&logger);
        handles.push(thread::spawn(move || {
            let label = if producer == 0 { "A" } else { "B" };
            for _ in 0..PER_PRODUCER {
                assert!(logger.log(Level::Info, label, format_args!("{}", TEXTS[producer])));
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    // Drain everything in one pass; the consumer observes exactly N
    // records.
    let drained = logger.drain(usize::MAX);
    assert_eq!(drained, PRODUCERS * PER_PRODUCER);

    let lines = capture.lines.lock().unwrap();
    assert_eq!(lines.len(), PRODUCERS * PER_PRODUCER);

    // Index set is exactly the fetch-add range 1..=N.
    let indexes: HashSet<u64> = lines.iter().map(|(i, _, _)| *i).collect();
    assert_eq!(indexes.len(), lines.len());
    assert_eq!(*indexes.iter().min().unwrap(), 1);
    assert_eq!(*indexes.iter().max().unwrap(), (PRODUCERS * PER_PRODUCER) as u64);

    // No torn messages: every text is one of the two fixed strings, and
    // each matches its producer's label.
    for (_, label, text) in lines.iter() {
        match label.as_str() {
            "A" => assert_eq!(text, TEXTS[0]),
            "B" => assert_eq!(text, TEXTS[1]),
            other => panic!("unexpected label {other}"),
        }
    }
}

#[test]
fn overflow_at_full_capacity_purges_once() {
    // Consumer paused: worker flagged live but nothing drains.
    let (logger, capture) = logger(LOG_RING_CAPACITY);
    logger.set_worker_live(true);

    // Pushes 1..=capacity succeed with no side effects.
    for i in 0..LOG_RING_CAPACITY {
        assert!(logger.log(Level::Info, "P", format_args!("record {i}")));
    }
    assert!(capture.lines.lock().unwrap().is_empty());
    assert_eq!(logger.backlog(), LOG_RING_CAPACITY);

    // The next push trips exactly one purge event and then succeeds.
    assert!(logger.log(Level::Info, "P", format_args!("straw")));
    {
        let lines = capture.lines.lock().unwrap();
        assert_eq!(lines.len(), 5, "marker + 3 purged + marker");
        assert!(lines[0].2.contains("overflow"));
        assert!(lines[4].2.contains("purge complete"));
        for (_, _, text) in &lines[1..4] {
            assert!(text.starts_with("record "), "purged oldest records first");
        }
    }

    // Two more pushes fit in the freed space without another event.
    assert!(logger.log(Level::Info, "P", format_args!("tail 1")));
    assert!(logger.log(Level::Info, "P", format_args!("tail 2")));
    let lines = capture.lines.lock().unwrap();
    let markers = lines.iter().filter(|(_, _, t)| t.contains("overflow")).count();
    assert_eq!(markers, 1, "exactly one overflow marker per purge event");
}

#[test]
fn purged_records_preserve_tail_order() {
    let (logger, capture) = logger(8);
    logger.set_worker_live(true);

    for i in 0..8 {
        assert!(logger.log(Level::Info, "P", format_args!("r{i}")));
    }
    assert!(logger.log(Level::Info, "P", format_args!("trigger")));

    let lines = capture.lines.lock().unwrap();
    let purged: Vec<&str> = lines[1..4].iter().map(|(_, _, t)| t.as_str()).collect();
    assert_eq!(purged, vec!["r0", "r1", "r2"]);
}

#[test]
fn min_level_filter_consumes_no_indexes() {
    let capture = CaptureSink::default();
    let filtered = Logger::with_sinks(
        Arc::new(Clock::new()),
        Level::Warn,
        3,
        16,
        vec![Box::new(capture.clone())],
    );
    filtered.set_worker_live(true);
    filtered.log(Level::Info, "P", format_args!("dropped"));
    filtered.log(Level::Error, "P", format_args!("kept"));
    filtered.drain(usize::MAX);

    let lines = capture.lines.lock().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].0, 1, "dropped record consumed no index");
    assert_eq!(lines[0].2, "kept");
}
