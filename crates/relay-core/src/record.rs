//! Log severities and the fixed-size log record.

use crate::clock::Timestamp;
use std::fmt;
use std::str::FromStr;

/// Log severity, ordered least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Notice = 3,
    Warn = 4,
    Error = 5,
    Critical = 6,
    Fatal = 7,
}

impl Level {
    /// Fixed-width name for log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Level::Trace),
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "NOTICE" => Ok(Level::Notice),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" => Ok(Level::Critical),
            "FATAL" => Ok(Level::Fatal),
            _ => Err(()),
        }
    }
}

/// Maximum thread-label length carried in a record.
pub const LABEL_CAP: usize = 64;
/// Maximum message text length carried in a record.
pub const TEXT_CAP: usize = 1024;

/// One log record, sized for the lock-free ring: a plain value with no
/// heap behind it. Label and text are length-prefixed UTF-8, truncated at
/// a character boundary when over capacity.
#[derive(Clone, Copy)]
pub struct LogRecord {
    /// Process-wide sequence index; the facade hands these out
    /// contiguously starting at 1.
    pub index: u64,
    pub timestamp: Timestamp,
    pub level: Level,
    label_len: u8,
    label: [u8; LABEL_CAP],
    text_len: u16,
    text: [u8; TEXT_CAP],
}

impl LogRecord {
    pub fn new(index: u64, timestamp: Timestamp, level: Level, label: &str, text: &str) -> Self {
        let mut record = Self {
            index,
            timestamp,
            level,
            label_len: 0,
            label: [0; LABEL_CAP],
            text_len: 0,
            text: [0; TEXT_CAP],
        };
        let label = truncate_utf8(label, LABEL_CAP);
        record.label[..label.len()].copy_from_slice(label.as_bytes());
        record.label_len = label.len() as u8;

        let text = truncate_utf8(text, TEXT_CAP);
        record.text[..text.len()].copy_from_slice(text.as_bytes());
        record.text_len = text.len() as u16;

        record
    }

    #[inline]
    pub fn label(&self) -> &str {
        // Stored bytes came from a &str prefix cut at a char boundary.
        std::str::from_utf8(&self.label[..usize::from(self.label_len)]).unwrap_or("")
    }

    #[inline]
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.text[..usize::from(self.text_len)]).unwrap_or("")
    }
}

impl fmt::Debug for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogRecord")
            .field("index", &self.index)
            .field("level", &self.level)
            .field("label", &self.label())
            .field("text", &self.text())
            .finish_non_exhaustive()
    }
}

/// Longest prefix of `s` that fits `cap` bytes without splitting a char.
fn truncate_utf8(s: &str, cap: usize) -> &str {
    if s.len() <= cap {
        return s;
    }
    let mut end = cap;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
