/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::logger
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Provide structured, append-only logging for Tempyr-Core
    operations shared across concurrent package tasks.

  Security / Safety Notes:
    Entries carry package names, slugs and URLs only; archive
    contents and response bodies are never logged.

  Dependencies:
    std::sync::Mutex for the shared writer, chrono for UTC
    stamps, sha2 for the session digest.

  Operational Scope:
    One logger per process session, borrowed by the scanner,
    reconciler and installer.

  Revision History:
    2026-10-19 COD  Adapted Synavera logger for Tempyr.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Append-only logging with UTC timestamps
    - Deterministic formatting for auditability
    - Logging failures never abort package work
============================================================*/

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::error::{Result, TempyrError};

/// Structured log level for Tempyr-Core events.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Shared logger that emits append-only entries in Synavera format.
pub struct Logger {
    file: Option<Mutex<BufWriter<File>>>,
    path: Option<PathBuf>,
    verbose: bool,
}

impl Logger {
    /// Build a logger that writes to stderr and optionally to a file.
    pub fn new(path: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let file = match path.as_deref() {
            Some(file_path) => Some(Mutex::new(BufWriter::new(open_append(file_path)?))),
            None => None,
        };
        Ok(Self {
            file,
            path,
            verbose,
        })
    }

    /// Logger without a backing file; only warnings and errors reach stderr.
    pub fn stderr_only() -> Self {
        Self {
            file: None,
            path: None,
            verbose: false,
        }
    }

    /// Emit a log entry with the given level, code, and message.
    pub fn log<S: AsRef<str>>(&self, level: LogLevel, code: &str, message: S) {
        let payload = format_entry(Utc::now(), level, code, message.as_ref());

        if self.verbose || matches!(level, LogLevel::Error | LogLevel::Warn) {
            eprintln!("{payload}");
        }

        let Some(file) = &self.file else {
            return;
        };
        let Ok(mut guard) = file.lock() else {
            return;
        };
        if writeln!(guard, "{payload}").and_then(|_| guard.flush()).is_err() {
            eprintln!(
                "{}",
                format_entry(
                    Utc::now(),
                    LogLevel::Error,
                    "LOGGER",
                    "Failed to write to log file"
                )
            );
        }
    }

    /// Convenience wrapper for `INFO` level events.
    pub fn info<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Info, code, message);
    }

    /// Convenience wrapper for `WARN` level events.
    pub fn warn<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Warn, code, message);
    }

    /// Convenience wrapper for `ERROR` level events.
    pub fn error<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Error, code, message);
    }

    /// Convenience wrapper for `DEBUG` level events.
    pub fn debug<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Debug, code, message);
    }

    /// Return the path backing this logger, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Compute and persist the SHA-256 digest of the session log.
    pub fn finalize(&self) -> Result<Option<PathBuf>> {
        let Some(path) = self.path() else {
            return Ok(None);
        };
        let data = std::fs::read(path).map_err(|err| {
            TempyrError::Filesystem(format!(
                "Failed to read log for hashing {}: {err}",
                path.display()
            ))
        })?;
        let digest = Sha256::digest(&data);

        let mut hash_os = path.as_os_str().to_os_string();
        hash_os.push(".hash");
        let hash_path = PathBuf::from(hash_os);
        let line = format!(
            "{:x}  {}\n",
            digest,
            path.file_name().unwrap_or_default().to_string_lossy()
        );
        std::fs::write(&hash_path, line).map_err(|err| {
            TempyrError::Filesystem(format!(
                "Failed to write hash file {}: {err}",
                hash_path.display()
            ))
        })?;
        Ok(Some(hash_path))
    }
}

/// Path of the session log inside `log_dir` for a session started at `started`.
pub fn session_log_path(log_dir: &Path, started: DateTime<Utc>) -> PathBuf {
    log_dir.join(format!(
        "tempyr_{}.log",
        started.format("%Y-%m-%d_%H-%M-%S")
    ))
}

fn format_entry(at: DateTime<Utc>, level: LogLevel, code: &str, message: &str) -> String {
    format!(
        "{} [{}] [{}] {}",
        at.to_rfc3339_opts(SecondsFormat::Secs, true),
        level.as_str(),
        code,
        message
    )
}

fn open_append(file_path: &Path) -> Result<File> {
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            TempyrError::Filesystem(format!(
                "Failed to create log directory {}: {err}",
                parent.display()
            ))
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)
        .map_err(|err| {
            TempyrError::Filesystem(format!(
                "Failed to open log file {}: {err}",
                file_path.display()
            ))
        })
}
