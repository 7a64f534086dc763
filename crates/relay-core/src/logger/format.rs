//! Record rendering.

use crate::clock::{Clock, Granularity};
use crate::record::{Level, LogRecord};
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::sync::Arc;

/// Renders records into single output lines.
#[derive(Debug, Clone)]
pub struct Formatter {
    clock: Arc<Clock>,
    granularity: Granularity,
}

impl Formatter {
    pub fn new(clock: Arc<Clock>, granularity: Granularity) -> Self {
        Self { clock, granularity }
    }

    /// One line per record:
    /// `2026-08-01 12:00:00.123 INFO     [DEMO] #42 hello`
    pub fn render(&self, record: &LogRecord, colour: bool) -> String {
        let mut line = String::with_capacity(96 + record.text().len());
        self.write_timestamp(&mut line, record);
        line.push(' ');
        if colour {
            let _ = write!(
                line,
                "{}{:<8}\x1b[0m",
                level_colour(record.level),
                record.level.as_str()
            );
        } else {
            let _ = write!(line, "{:<8}", record.level.as_str());
        }
        let _ = write!(line, " [{}] #{} {}", record.label(), record.index, record.text());
        line
    }

    fn write_timestamp(&self, out: &mut String, record: &LogRecord) {
        let wall = self.clock.to_wall(record.timestamp);
        let datetime = DateTime::<Utc>::from_timestamp(
            wall.seconds_since_epoch as i64,
            wall.nanoseconds,
        )
        .unwrap_or_default();

        let _ = write!(out, "{}", datetime.format("%Y-%m-%d %H:%M:%S"));
        let digits = self.granularity.digits();
        if digits > 0 {
            let frac = u64::from(wall.nanoseconds) / 10u64.pow(9 - digits as u32);
            let _ = write!(out, ".{frac:0width$}", width = digits);
        }
    }

    /// Stamp inserted into rotated file names: `YYYYMMDD_HHMMSS`.
    pub fn rotation_stamp(&self) -> String {
        let wall = self.clock.to_wall(self.clock.now());
        let datetime = DateTime::<Utc>::from_timestamp(wall.seconds_since_epoch as i64, 0)
            .unwrap_or_default();
        datetime.format("%Y%m%d_%H%M%S").to_string()
    }
}

fn level_colour(level: Level) -> &'static str {
    match level {
        Level::Trace => "\x1b[2m",
        Level::Debug => "\x1b[36m",
        Level::Info => "\x1b[32m",
        Level::Notice => "\x1b[34m",
        Level::Warn => "\x1b[33m",
        Level::Error => "\x1b[31m",
        Level::Critical => "\x1b[35m",
        Level::Fatal => "\x1b[1;31m",
    }
}
