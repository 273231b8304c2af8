//! Diagnostic log sinks
//!
//! The validator reports transport failures through [`AuthLog`] with the
//! tags `["error", "auth-radius"]`. [`TracingLog`] forwards to `tracing`;
//! [`AuditLog`] additionally appends a JSON line per event to a file for
//! later analysis.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};

/// Tags attached to a failed exchange
pub const TRANSPORT_ERROR_TAGS: [&str; 2] = ["error", "auth-radius"];

/// Receives tagged diagnostic lines
pub trait AuthLog: Send + Sync {
    fn log(&self, tags: &[&str], message: &str);
}

/// Sink that emits through `tracing`
///
/// Lines tagged `error` are logged at error level, everything else at info.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl AuthLog for TracingLog {
    fn log(&self, tags: &[&str], message: &str) {
        if tags.contains(&"error") {
            error!(tags = ?tags, "{}", message);
        } else {
            info!(tags = ?tags, "{}", message);
        }
    }
}

/// One line of the audit file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unix epoch seconds
    pub timestamp: u64,
    /// ISO 8601 formatted timestamp
    pub timestamp_iso: String,
    pub tags: Vec<String>,
    pub message: String,
    pub version: String,
}

impl AuditEntry {
    pub fn new(tags: &[&str], message: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let timestamp_iso = chrono::DateTime::from_timestamp(timestamp as i64, 0)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        AuditEntry {
            timestamp,
            timestamp_iso,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            message: message.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// JSON-lines file sink, also forwarding to [`TracingLog`]
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLog {
    /// Open (or create) `path` for appending
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(AuditLog {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_entry(&self, entry: &AuditEntry) {
        let json = match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize audit entry: {}", e);
                return;
            }
        };

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(file, "{}", json) {
            error!(path = %self.path.display(), "Failed to write audit log: {}", e);
        }
    }
}

impl AuthLog for AuditLog {
    fn log(&self, tags: &[&str], message: &str) {
        TracingLog.log(tags, message);
        self.write_entry(&AuditEntry::new(tags, message));
    }
}
