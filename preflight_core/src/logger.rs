/*============================================================
  Synavera Project: Syn-Preflight
  Module: preflight_core::logger
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Provide structured, append-only logging for pre-flight
    checks, geolocation probes, and package provisioning.

  Security / Safety Notes:
    Probe endpoints and package names are logged; response
    bodies from geolocation services are never written.

  Dependencies:
    chrono for UTC stamps, sha2 for session digests.

  Operational Scope:
    Shared by every module of the pre-flight run; the binary
    finalises the session digest on success.

  Revision History:
    2025-11-12 COD  Adapted session logger for Syn-Preflight.
    2025-11-19 COD  Added file-only record for reported failures.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Append-only logging with UTC timestamps
    - Warnings always reach the operator console
    - Graceful error propagation on I/O failures
============================================================*/

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::error::{PreflightError, Result};

/// Structured log level for Syn-Preflight events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
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

    fn always_visible(self) -> bool {
        matches!(self, LogLevel::Warn | LogLevel::Error)
    }
}

/// Session logger writing to stderr and, optionally, a log file.
pub struct Logger {
    file: Option<Mutex<BufWriter<File>>>,
    path: Option<PathBuf>,
    verbose: bool,
}

impl Logger {
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

    /// Logger with no file sink; warnings still reach stderr.
    #[cfg(test)]
    pub fn console(verbose: bool) -> Self {
        Self {
            file: None,
            path: None,
            verbose,
        }
    }

    pub fn log<S: AsRef<str>>(&self, level: LogLevel, code: &str, message: S) {
        let payload = format_entry(level, code, message.as_ref());
        if self.verbose || level.always_visible() {
            eprintln!("{payload}");
        }
        self.write_file(&payload);
    }

    /// Write to the log file only; used for failures the binary reports itself.
    pub fn record<S: AsRef<str>>(&self, level: LogLevel, code: &str, message: S) {
        self.write_file(&format_entry(level, code, message.as_ref()));
    }

    fn write_file(&self, payload: &str) {
        let Some(file) = &self.file else {
            return;
        };
        let Ok(mut guard) = file.lock() else {
            return;
        };
        if writeln!(guard, "{payload}").and_then(|_| guard.flush()).is_err() {
            eprintln!(
                "{}",
                format_entry(LogLevel::Error, "LOGGER", "Failed to write log file")
            );
        }
    }

    pub fn info<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Info, code, message);
    }

    pub fn warn<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Warn, code, message);
    }

    pub fn debug<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Debug, code, message);
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write `<log>.hash` holding the SHA-256 digest of the session log.
    pub fn finalize(&self) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        let data = std::fs::read(path).map_err(|err| {
            PreflightError::Filesystem(format!(
                "Failed to read log for hashing {}: {err}",
                path.display()
            ))
        })?;
        let digest = Sha256::digest(&data);

        let mut hash_os = path.as_os_str().to_os_string();
        hash_os.push(".hash");
        let hash_path = PathBuf::from(hash_os);
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        std::fs::write(&hash_path, format!("{digest:x}  {name}\n")).map_err(|err| {
            PreflightError::Filesystem(format!(
                "Failed to write hash file {}: {err}",
                hash_path.display()
            ))
        })
    }
}

fn format_entry(level: LogLevel, code: &str, message: &str) -> String {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    format!("{timestamp} [{}] [{code}] {message}", level.as_str())
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            PreflightError::Filesystem(format!(
                "Failed to create log directory {}: {err}",
                parent.display()
            ))
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| {
            PreflightError::Filesystem(format!(
                "Failed to open log file {}: {err}",
                path.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_appended_with_level_and_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/preflight.log");
        let logger = Logger::new(Some(path.clone()), false).unwrap();
        logger.info("MEMORY", "RAM_SIZE=2G");
        logger.debug("PROBE", "ifconfig.co: no answer");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[INFO] [MEMORY] RAM_SIZE=2G"));
        assert!(lines[1].contains("[DEBUG] [PROBE]"));
    }

    #[test]
    fn recorded_entries_reach_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preflight.log");
        let logger = Logger::new(Some(path.clone()), false).unwrap();
        logger.record(LogLevel::Error, "PREFLIGHT", "Storage folder (/x) not found");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents
            .trim_end()
            .ends_with("[ERROR] [PREFLIGHT] Storage folder (/x) not found"));
    }

    #[test]
    fn finalize_writes_sha256_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preflight.log");
        let logger = Logger::new(Some(path.clone()), false).unwrap();
        logger.info("INIT", "start");
        logger.finalize().unwrap();

        let data = std::fs::read(&path).unwrap();
        let expected = format!("{:x}  preflight.log\n", Sha256::digest(&data));
        let hash = std::fs::read_to_string(dir.path().join("preflight.log.hash")).unwrap();
        assert_eq!(hash, expected);
    }

    #[test]
    fn console_logger_finalizes_without_file() {
        let logger = Logger::console(false);
        assert!(logger.path().is_none());
        assert!(logger.finalize().is_ok());
    }
}
