//! Log sinks: console and size-rotated files.
//!
//! Sinks are driven exclusively under the logging mutex held by the
//! [`Logger`](super::Logger) facade, so they are plain mutable state.
//! Rotation is serialized with emission by construction.

use super::format::Formatter;
use crate::config::Config;
use crate::error::CoreError;
use crate::record::LogRecord;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Destination for formatted records.
pub trait LogSink: Send {
    fn emit(&mut self, record: &LogRecord);
}

/// Writes rendered records to stdout, optionally with ANSI level colours.
pub struct ConsoleSink {
    formatter: Formatter,
    colour: bool,
}

impl ConsoleSink {
    pub fn new(formatter: Formatter, colour: bool) -> Self {
        Self { formatter, colour }
    }
}

impl LogSink for ConsoleSink {
    fn emit(&mut self, record: &LogRecord) {
        let line = self.formatter.render(record, self.colour);
        // A console that went away must not take the pipeline with it.
        let _ = writeln!(std::io::stdout().lock(), "{line}");
    }
}

/// One open log file with size-based rotation.
struct RotatingFile {
    path: PathBuf,
    file: File,
    written: u64,
    max_size: u64,
}

impl RotatingFile {
    fn open(path: PathBuf, truncate: bool, max_size: u64) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(!truncate)
            .write(true)
            .truncate(truncate)
            .open(&path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            path,
            file,
            written,
            max_size,
        })
    }

    fn write_line(&mut self, line: &str, stamp: &str) {
        let incoming = line.len() as u64 + 1;
        if self.written > 0 && self.written + incoming > self.max_size {
            self.rotate(stamp);
        }
        if writeln!(self.file, "{line}").is_ok() {
            self.written += incoming;
        }
    }

    /// Renames the current file to its stamped name and reopens fresh.
    /// Failures leave the current file in place; the next threshold
    /// crossing retries.
    fn rotate(&mut self, stamp: &str) {
        let _ = self.file.flush();
        let rotated = rotated_name(&self.path, stamp);
        if fs::rename(&self.path, rotated).is_err() {
            return;
        }
        if let Ok(file) = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
        {
            self.file = file;
            self.written = 0;
        }
    }
}

/// `<basename>.YYYYMMDD_HHMMSS<.ext>`: the stamp lands before the last
/// dot of the file name, or is appended when there is none.
fn rotated_name(path: &Path, stamp: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let rotated = match name.rfind('.') {
        Some(dot) => format!("{}.{}{}", &name[..dot], stamp, &name[dot..]),
        None => format!("{name}.{stamp}"),
    };
    path.with_file_name(rotated)
}

/// Routes records to per-label files resolved through configuration.
///
/// Resolution walks the dot-delimited label from longest to shortest
/// prefix before falling back to the main log file; resolved names are
/// cached per label and files are opened lazily on first use.
pub struct FileSink {
    formatter: Formatter,
    config: Arc<Config>,
    dir: PathBuf,
    max_size: u64,
    truncate_on_open: bool,
    routes: HashMap<String, String>,
    files: HashMap<String, RotatingFile>,
}

impl FileSink {
    /// Opens the main log file eagerly so a misconfigured path fails the
    /// logger's construction instead of its first emission.
    pub fn new(formatter: Formatter, config: Arc<Config>) -> Result<Self, CoreError> {
        let mut sink = Self {
            formatter,
            dir: config.log_file_path(),
            max_size: config.log_file_size().max(1),
            truncate_on_open: config.purge_logs_on_restart(),
            routes: HashMap::new(),
            files: HashMap::new(),
            config,
        };
        let main_name = sink.config.log_file_name();
        sink.open_file(&main_name)?;
        Ok(sink)
    }

    fn open_file(&mut self, name: &str) -> Result<(), CoreError> {
        if !self.files.contains_key(name) {
            let file =
                RotatingFile::open(self.dir.join(name), self.truncate_on_open, self.max_size)?;
            self.files.insert(name.to_owned(), file);
        }
        Ok(())
    }

    fn file_name_for(&mut self, label: &str) -> String {
        if let Some(name) = self.routes.get(label) {
            return name.clone();
        }
        let name = self.config.log_file_name_for(label);
        self.routes.insert(label.to_owned(), name.clone());
        name
    }
}

impl LogSink for FileSink {
    fn emit(&mut self, record: &LogRecord) {
        let name = self.file_name_for(record.label());
        if self.open_file(&name).is_err() {
            return;
        }
        let line = self.formatter.render(record, false);
        let stamp = self.formatter.rotation_stamp();
        if let Some(file) = self.files.get_mut(&name) {
            file.write_line(&line, &stamp);
        }
    }
}
