//! Deferred logging pipeline.
//!
//! Producers on any thread hand fixed-size records to the lock-free ring;
//! the logger worker is the single steady-state consumer. The logging
//! mutex guards only the sinks: it is taken for synchronous emission,
//! for the worker's drain batches, and for the whole overflow-purge
//! critical section. It is never held while touching the registry.

mod format;
mod sink;
pub mod worker;

pub use format::Formatter;
pub use sink::{ConsoleSink, FileSink, LogSink};

use crate::clock::Clock;
use crate::config::{Config, LogDestination};
use crate::error::CoreError;
use crate::record::{Level, LogRecord};
use relay_ring::Ring;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Label under which the logger worker registers.
pub const LOGGER_LABEL: &str = "LOGGER";

/// Slot count of the process-wide log ring.
pub const LOG_RING_CAPACITY: usize = 32768;

/// Process-wide logging facade.
///
/// Built once by the launcher and shared by `Arc`; the lifecycle wrapper
/// threads it into every worker's context so the `log_*` macros can reach
/// it without globals.
pub struct Logger {
    ring: Ring<LogRecord>,
    /// Next record index; `fetch_add` hands out 1, 2, 3, … The counter is
    /// bumped *before* the ring reservation so consumption order matches
    /// index order whenever producers are otherwise unordered.
    next_index: AtomicU64,
    min_level: Level,
    purge_count: usize,
    /// True while the logger worker drains the ring. Until then pushes
    /// would accumulate unread, so producers emit synchronously instead.
    worker_live: AtomicBool,
    sinks: Mutex<Vec<Box<dyn LogSink>>>,
    clock: Arc<Clock>,
}

impl Logger {
    /// Builds the logger with sinks derived from configuration. The only
    /// fatal initialization point of the substrate: an unopenable log
    /// file fails construction.
    pub fn from_config(clock: Arc<Clock>, config: &Arc<Config>) -> Result<Self, CoreError> {
        let formatter = Formatter::new(Arc::clone(&clock), config.timestamp_granularity());
        let mut sinks: Vec<Box<dyn LogSink>> = Vec::new();

        match config.log_destination() {
            LogDestination::Console => {
                sinks.push(Box::new(ConsoleSink::new(formatter, config.ansi_colours())));
            }
            LogDestination::File => {
                sinks.push(Box::new(FileSink::new(formatter, Arc::clone(config))?));
            }
            LogDestination::Both => {
                sinks.push(Box::new(FileSink::new(formatter.clone(), Arc::clone(config))?));
                sinks.push(Box::new(ConsoleSink::new(formatter, config.ansi_colours())));
            }
        }

        Ok(Self::with_sinks(
            clock,
            config.log_level(),
            config.ring_purge_count(),
            LOG_RING_CAPACITY,
            sinks,
        ))
    }

    /// Direct constructor for embedders and tests that supply their own
    /// sinks or a reduced ring.
    pub fn with_sinks(
        clock: Arc<Clock>,
        min_level: Level,
        purge_count: usize,
        ring_capacity: usize,
        sinks: Vec<Box<dyn LogSink>>,
    ) -> Self {
        Self {
            ring: Ring::with_capacity(ring_capacity),
            next_index: AtomicU64::new(1),
            min_level,
            purge_count: purge_count.max(1),
            worker_live: AtomicBool::new(false),
            sinks: Mutex::new(sinks),
            clock,
        }
    }

    #[inline]
    pub fn clock(&self) -> &Arc<Clock> {
        &self.clock
    }

    #[inline]
    pub fn min_level(&self) -> Level {
        self.min_level
    }

    /// Ring occupancy snapshot, for monitoring.
    #[inline]
    pub fn backlog(&self) -> usize {
        self.ring.len()
    }

    /// Flips the deferred-emission path on and off. Normally driven by
    /// the logger worker; exposed for embedders that run their own
    /// consumer.
    pub fn set_worker_live(&self, live: bool) {
        self.worker_live.store(live, Ordering::Release);
    }

    #[inline]
    pub fn worker_live(&self) -> bool {
        self.worker_live.load(Ordering::Acquire)
    }

    fn lock_sinks(&self) -> MutexGuard<'_, Vec<Box<dyn LogSink>>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Producer entry point. Records below the minimum level are dropped
    /// with no side effect (and report success). Returns false for the
    /// caller-bug cases: empty label or empty message.
    pub fn log(&self, level: Level, label: &str, args: fmt::Arguments<'_>) -> bool {
        if level < self.min_level {
            return true;
        }
        if label.is_empty() {
            return false;
        }

        let text = args.to_string();
        if text.is_empty() {
            return false;
        }

        // Index before reservation, see `next_index`.
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        let record = LogRecord::new(index, self.clock.now(), level, label, &text);
        self.submit(record)
    }

    fn submit(&self, record: LogRecord) -> bool {
        if !self.worker_live() {
            // Startup and shutdown tails bypass the ring: nobody drains it.
            let mut sinks = self.lock_sinks();
            for sink in sinks.iter_mut() {
                sink.emit(&record);
            }
            return true;
        }

        if self.ring.push(record) {
            return true;
        }
        if self.purge_and_retry(record) {
            return true;
        }

        // Ring still full after the purge (a stampede of producers won the
        // freed slots): fall back to synchronous emission over dropping.
        let mut sinks = self.lock_sinks();
        for sink in sinks.iter_mut() {
            sink.emit(&record);
        }
        true
    }

    /// Overflow policy, serialized under the logging mutex for the whole
    /// block: marker record, `purge_count` oldest records straight to the
    /// sinks, completion marker, then one retry of the original push.
    fn purge_and_retry(&self, record: LogRecord) -> bool {
        {
            let mut sinks = self.lock_sinks();

            let opening = self.synthetic(format!(
                "log ring overflow: purging {} oldest records",
                self.purge_count
            ));
            for sink in sinks.iter_mut() {
                sink.emit(&opening);
            }

            for _ in 0..self.purge_count {
                match self.ring.pop() {
                    Some(purged) => {
                        for sink in sinks.iter_mut() {
                            sink.emit(&purged);
                        }
                    }
                    None => break,
                }
            }

            let closing = self.synthetic("log ring purge complete".to_owned());
            for sink in sinks.iter_mut() {
                sink.emit(&closing);
            }
        }

        self.ring.push(record)
    }

    fn synthetic(&self, text: String) -> LogRecord {
        LogRecord::new(
            self.next_index.fetch_add(1, Ordering::Relaxed),
            self.clock.now(),
            Level::Error,
            LOGGER_LABEL,
            &text,
        )
    }

    /// Consumer-side drain: pops up to `max` records and emits them under
    /// one acquisition of the logging mutex. Returns the number emitted.
    pub fn drain(&self, max: usize) -> usize {
        let mut sinks = self.lock_sinks();
        let mut drained = 0;
        while drained < max {
            match self.ring.pop() {
                Some(record) => {
                    for sink in sinks.iter_mut() {
                        sink.emit(&record);
                    }
                    drained += 1;
                }
                None => break,
            }
        }
        drained
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("min_level", &self.min_level)
            .field("backlog", &self.backlog())
            .field("worker_live", &self.worker_live())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Captures emitted lines for assertions.
    #[derive(Clone, Default)]
    pub(crate) struct CaptureSink {
        pub lines: Arc<StdMutex<Vec<String>>>,
    }

    impl LogSink for CaptureSink {
        fn emit(&mut self, record: &LogRecord) {
            self.lines
                .lock()
                .unwrap()
                .push(format!("{} [{}] #{} {}", record.level, record.label(), record.index, record.text()));
        }
    }

    fn logger_with_capture(min_level: Level, capacity: usize) -> (Logger, CaptureSink) {
        let capture = CaptureSink::default();
        let logger = Logger::with_sinks(
            Arc::new(Clock::new()),
            min_level,
            3,
            capacity,
            vec![Box::new(capture.clone())],
        );
        (logger, capture)
    }

    #[test]
    fn below_threshold_is_dropped_silently() {
        let (logger, capture) = logger_with_capture(Level::Warn, 8);
        assert!(logger.log(Level::Info, "T", format_args!("quiet")));
        assert!(capture.lines.lock().unwrap().is_empty());
        // No index was consumed either.
        assert!(logger.log(Level::Error, "T", format_args!("loud")));
        assert!(capture.lines.lock().unwrap()[0].contains("#1 "));
    }

    #[test]
    fn empty_label_or_text_is_a_caller_bug() {
        let (logger, _capture) = logger_with_capture(Level::Trace, 8);
        assert!(!logger.log(Level::Info, "", format_args!("text")));
        assert!(!logger.log(Level::Info, "LBL", format_args!("")));
    }

    #[test]
    fn synchronous_until_worker_is_live() {
        let (logger, capture) = logger_with_capture(Level::Trace, 8);

        logger.log(Level::Info, "T", format_args!("early"));
        assert_eq!(capture.lines.lock().unwrap().len(), 1);
        assert_eq!(logger.backlog(), 0);

        logger.set_worker_live(true);
        logger.log(Level::Info, "T", format_args!("deferred"));
        assert_eq!(capture.lines.lock().unwrap().len(), 1);
        assert_eq!(logger.backlog(), 1);

        assert_eq!(logger.drain(usize::MAX), 1);
        assert_eq!(capture.lines.lock().unwrap().len(), 2);
    }

    #[test]
    fn overflow_purges_and_recovers() {
        let (logger, capture) = logger_with_capture(Level::Trace, 8);
        logger.set_worker_live(true);

        // Fill the ring, then one more to trip the purge.
        for i in 0..8 {
            assert!(logger.log(Level::Info, "T", format_args!("r{i}")));
        }
        assert_eq!(logger.backlog(), 8);
        assert!(logger.log(Level::Info, "T", format_args!("overflow-trigger")));

        let lines = capture.lines.lock().unwrap().clone();
        // Marker pair around exactly purge_count purged records.
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("overflow"));
        assert!(lines[1].contains("r0"));
        assert!(lines[2].contains("r1"));
        assert!(lines[3].contains("r2"));
        assert!(lines[4].contains("purge complete"));

        // The retried record made it into the ring.
        assert_eq!(logger.backlog(), 8 - 3 + 1);
    }

    #[test]
    fn indexes_are_contiguous_from_one() {
        let (logger, capture) = logger_with_capture(Level::Trace, 32);
        logger.set_worker_live(true);
        for i in 0..10 {
            logger.log(Level::Info, "T", format_args!("m{i}"));
        }
        logger.drain(usize::MAX);

        let lines = capture.lines.lock().unwrap();
        let indexes: Vec<u64> = lines
            .iter()
            .map(|l| {
                let tail = l.split('#').nth(1).unwrap();
                tail.split(' ').next().unwrap().parse().unwrap()
            })
            .collect();
        assert_eq!(indexes, (1..=10).collect::<Vec<u64>>());
    }
}
