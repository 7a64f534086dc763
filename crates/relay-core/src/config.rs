//! Read-only key/value configuration view.
//!
//! The file parser that produces the pairs lives outside this crate; the
//! substrate only consumes lookups. Typed getters fall back to documented
//! defaults on missing or malformed values rather than failing startup.

use crate::clock::Granularity;
use crate::record::Level;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default rotation threshold for log files.
pub const DEFAULT_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default bound on a worker's wait for the logger thread to come up.
pub const DEFAULT_LOGGER_WAIT: Duration = Duration::from_secs(5);

/// Where formatted records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogDestination {
    File,
    #[default]
    Console,
    Both,
}

impl FromStr for LogDestination {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "console" => Ok(Self::Console),
            "both" => Ok(Self::Both),
            _ => Err(()),
        }
    }
}

/// Immutable configuration snapshot.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pairs: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).map_or(default, |v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            )
        })
    }

    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    // -----------------------------------------------------------------
    // logger.* namespace
    // -----------------------------------------------------------------

    /// Minimum severity; records below it are dropped at the facade.
    pub fn log_level(&self) -> Level {
        self.get("logger.log_level")
            .and_then(|v| v.parse().ok())
            .unwrap_or(Level::Info)
    }

    pub fn log_destination(&self) -> LogDestination {
        self.get("logger.log_destination")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn log_file_path(&self) -> PathBuf {
        PathBuf::from(self.get("logger.log_file_path").unwrap_or("."))
    }

    pub fn log_file_name(&self) -> String {
        self.get("logger.log_file_name")
            .unwrap_or("relay.log")
            .to_owned()
    }

    pub fn log_file_size(&self) -> u64 {
        self.get_u64("logger.log_file_size", DEFAULT_LOG_FILE_SIZE)
    }

    pub fn timestamp_granularity(&self) -> Granularity {
        self.get("logger.timestamp_granularity")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    pub fn ansi_colours(&self) -> bool {
        self.get_bool("logger.ansi_colours", false)
    }

    pub fn purge_logs_on_restart(&self) -> bool {
        self.get_bool("logger.purge_logs_on_restart", false)
    }

    /// Records drained synchronously per ring-overflow event.
    pub fn ring_purge_count(&self) -> usize {
        self.get_u64("logger.ring_purge_count", 3) as usize
    }

    /// Per-thread log file resolution: the full label is tried first,
    /// then each dot-trimmed ancestor from longest to shortest, then the
    /// main log file. Longest prefix wins.
    pub fn log_file_name_for(&self, label: &str) -> String {
        let mut candidate = label;
        loop {
            if let Some(name) = self.get(&format!("logger.{candidate}.log_file_name")) {
                return name.to_owned();
            }
            match candidate.rfind('.') {
                Some(dot) => candidate = &candidate[..dot],
                None => return self.log_file_name(),
            }
        }
    }

    // -----------------------------------------------------------------
    // debug.* namespace
    // -----------------------------------------------------------------

    /// Labels suppressed at launch, lowercased and trimmed.
    pub fn suppressed_labels(&self) -> Vec<String> {
        self.get("debug.suppress_threads")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_ascii_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Case-insensitive suppression check.
    pub fn is_suppressed(&self, label: &str) -> bool {
        let needle = label.trim().to_ascii_lowercase();
        self.suppressed_labels().iter().any(|s| *s == needle)
    }

    /// Bound on a worker's startup wait for the logger thread.
    pub fn logger_wait(&self) -> Duration {
        Duration::from_millis(self.get_u64(
            "debug.logger_wait_ms",
            DEFAULT_LOGGER_WAIT.as_millis() as u64,
        ))
    }
}
