// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! PII-masked logging.
//!
//! Every message the gateway records goes through [`SecureLogger`], which
//! runs [`mask_pii`] before handing the text to its sinks. Sinks are
//! fire-and-forget: a sink that fails to write is reported at debug level and
//! otherwise ignored, so logging can never fail a request.
//!
//! Log file format (one line per record):
//! `2024-01-15 10:23:45,123 - WARNING - Rejected message: ...`

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::security::locks::resilient_lock;
use crate::security::pii::mask_pii;

/// Severity of a secure log record.
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
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Destination for `(level, message)` log records.
///
/// Messages arrive already masked.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str) -> Result<()>;
}

/// Forwards records to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str) -> Result<()> {
        match level {
            LogLevel::Debug => tracing::debug!(target: "agentguard::secure_log", "{}", message),
            LogLevel::Info => tracing::info!(target: "agentguard::secure_log", "{}", message),
            LogLevel::Warning => tracing::warn!(target: "agentguard::secure_log", "{}", message),
            LogLevel::Error => tracing::error!(target: "agentguard::secure_log", "{}", message),
            LogLevel::Critical => {
                tracing::error!(target: "agentguard::secure_log", critical = true, "{}", message)
            }
        }
        Ok(())
    }
}

/// Appends records to `<log_dir>/app_YYYYmmdd_HHMMSS.log`.
///
/// A new file is started each time a sink is created, so every process run
/// gets its own log.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Create the log directory if needed and open a fresh log file in it.
    pub fn create(log_dir: &Path) -> Result<Self> {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Could not create log directory {}", log_dir.display()))?;

        let file_name = format!("app_{}.log", Local::now().format("%Y%m%d_%H%M%S"));
        let path = log_dir.join(file_name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Could not open log file {}", path.display()))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn log(&self, level: LogLevel, message: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        let mut file = resilient_lock(&self.file);
        writeln!(file, "{} - {} - {}", timestamp, level, message)?;
        Ok(())
    }
}

/// Masks PII and fans records out to every registered sink.
#[derive(Clone)]
pub struct SecureLogger {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl Default for SecureLogger {
    /// A logger writing to `tracing` only.
    fn default() -> Self {
        Self::empty().with_sink(Arc::new(TracingSink))
    }
}

impl std::fmt::Debug for SecureLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureLogger")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl SecureLogger {
    /// A logger with no sinks. Records are masked and dropped.
    pub fn empty() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Secure logging with PII masking.
    pub fn log_secure(&self, level: LogLevel, message: &str) {
        let masked = mask_pii(message);
        for sink in &self.sinks {
            if let Err(e) = sink.log(level, &masked) {
                tracing::debug!(
                    target: "agentguard::secure_log",
                    error = %e,
                    "Log sink write failed"
                );
            }
        }
    }

    pub fn info(&self, message: &str) {
        self.log_secure(LogLevel::Info, message);
    }

    pub fn error(&self, message: &str) {
        self.log_secure(LogLevel::Error, message);
    }
}

/// Install the global `tracing` subscriber. `RUST_LOG` takes precedence
/// over `default_filter`. Calling this twice is harmless.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CaptureSink {
        records: Mutex<Vec<(LogLevel, String)>>,
    }

    impl LogSink for CaptureSink {
        fn log(&self, level: LogLevel, message: &str) -> Result<()> {
            self.records.lock().unwrap().push((level, message.to_string()));
            Ok(())
        }
    }

    struct FailingSink;

    impl LogSink for FailingSink {
        fn log(&self, _level: LogLevel, _message: &str) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn test_log_secure_masks_before_sinks() {
        let capture = Arc::new(CaptureSink::default());
        let logger = SecureLogger::empty().with_sink(capture.clone());

        logger.log_secure(LogLevel::Warning, "user bob@example.com sent 123-45-6789");

        let records = capture.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, LogLevel::Warning);
        assert_eq!(records[0].1, "user [REDACTED] sent [REDACTED]");
    }

    #[test]
    fn test_failing_sink_is_swallowed() {
        let capture = Arc::new(CaptureSink::default());
        let logger = SecureLogger::empty()
            .with_sink(Arc::new(FailingSink))
            .with_sink(capture.clone());

        logger.error("still delivered");

        assert_eq!(capture.records.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_file_sink_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::create(&dir.path().join("logs")).unwrap();
        let logger = SecureLogger::empty().with_sink(Arc::new(sink));

        logger.info("first");
        logger.log_secure(LogLevel::Critical, "card 4111111111111111");

        let log_file = fs::read_dir(dir.path().join("logs"))
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        let name = log_file.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("app_") && name.ends_with(".log"));

        let content = fs::read_to_string(&log_file).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - INFO - first"));
        assert!(lines[1].ends_with(" - CRITICAL - card [REDACTED]"));
    }

    #[test]
    fn test_level_display_and_order() {
        assert_eq!(LogLevel::Warning.to_string(), "WARNING");
        assert!(LogLevel::Critical > LogLevel::Error);
        assert!(LogLevel::Debug < LogLevel::Info);
    }
}
