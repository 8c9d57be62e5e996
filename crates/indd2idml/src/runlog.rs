use std::fmt;
use std::fs::OpenOptions;
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::LogError;

/// Severity of a run log entry, ordered by numeric rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Numeric rank used by the threshold filter.
    pub fn rank(self) -> u8 {
        match self {
            LogLevel::Debug => 10,
            LogLevel::Info => 20,
            LogLevel::Warning => 30,
            LogLevel::Error => 40,
            LogLevel::Critical => 50,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// One appended line of the run log.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.message
        )
    }
}

/// Append-only, timestamp-prefixed run log.
///
/// The run log is a product artifact, separate from the `log`/`tracing`
/// console diagnostics: operators read it after a batch run to see what
/// happened to each document. One `RunLog` is opened at the start of a run
/// and closed exactly once at the end; entries below the configured
/// threshold are suppressed.
///
/// `write` never fails from the caller's perspective. An I/O error while
/// appending is counted and mirrored to the console once, so a full disk
/// cannot abort a conversion already in progress.
pub struct RunLog {
    path: PathBuf,
    threshold: LogLevel,
    writer: Mutex<Option<LineWriter<std::fs::File>>>,
    dropped: AtomicU64,
}

impl RunLog {
    /// Opens the log file in append mode, creating parent directories as
    /// needed. Failure here is a setup failure: nothing about the run can
    /// be recorded, so callers must alert the operator directly.
    pub fn open<P: AsRef<Path>>(path: P, threshold: LogLevel) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LogError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LogError::OpenFile {
                path: path.clone(),
                source: e,
            })?;

        Ok(Self {
            path,
            threshold,
            writer: Mutex::new(Some(LineWriter::new(file))),
            dropped: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    /// Appends one line if `level` passes the threshold filter.
    pub fn write(&self, level: LogLevel, message: impl AsRef<str>) {
        if level.rank() < self.threshold.rank() {
            return;
        }

        let entry = LogEntry::new(level, message.as_ref());
        let mut guard = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match guard.as_mut() {
            Some(writer) => {
                if let Err(e) = writeln!(writer, "{}", entry) {
                    self.note_dropped(&e.to_string());
                }
            }
            None => self.note_dropped("log already closed"),
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.write(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.write(LogLevel::Info, message);
    }

    pub fn warning(&self, message: impl AsRef<str>) {
        self.write(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.write(LogLevel::Error, message);
    }

    pub fn critical(&self, message: impl AsRef<str>) {
        self.write(LogLevel::Critical, message);
    }

    /// Number of entries that could not be persisted. Nonzero after a run
    /// means the log is incomplete and the operator should be told.
    pub fn dropped_entries(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Flushes and releases the file handle. Idempotent: the second and
    /// later calls are no-ops, so cleanup paths can close unconditionally.
    pub fn close(&self) -> Result<(), LogError> {
        let mut guard = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(mut writer) = guard.take() {
            writer.flush().map_err(|e| LogError::Flush {
                path: self.path.clone(),
                source: e,
            })?;
        }

        Ok(())
    }

    fn note_dropped(&self, reason: &str) {
        if self.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
            warn!(
                "run log write to '{}' failed ({}); further dropped entries are counted silently",
                self.path.display(),
                reason
            );
        }
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        // Backstop for panic unwinds that bypass close().
        let guard = self
            .writer
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(writer) = guard.as_mut() {
            let _ = writer.flush();
        }
    }
}
