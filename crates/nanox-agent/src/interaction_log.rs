//! Append-only interaction transcript.
//!
//! Every loop transition is appended to `{dir}/session_{YYYY-MM-DD}.log` as
//!
//! ```text
//! [2026-02-01T10:00:00+01:00] === Iteration 1 Request ===
//! { ...pretty JSON... }
//! ```
//!
//! Failures to write are logged and otherwise ignored.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use nanox_core::utils::{timestamp, today_date};

#[derive(Clone, Debug)]
pub struct InteractionLog {
    dir: Option<PathBuf>,
}

impl InteractionLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// A log that records nothing.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// File the next entry goes to, if enabled.
    pub fn current_file(&self) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|d| d.join(format!("session_{}.log", today_date())))
    }

    /// Append one step. Serialization or I/O failures are only logged.
    pub fn record<T: Serialize + ?Sized>(&self, step: &str, data: &T) {
        let (Some(dir), Some(file)) = (self.dir.as_deref(), self.current_file()) else {
            return;
        };

        let body = match serde_json::to_string_pretty(data) {
            Ok(b) => b,
            Err(e) => {
                warn!(step, error = %e, "failed to serialize interaction log entry");
                return;
            }
        };
        let entry = format!("\n[{}] === {step} ===\n{body}\n", timestamp());

        if let Err(e) = append(dir, &file, &entry) {
            warn!(file = %file.display(), error = %e, "failed to write interaction log");
        }
    }
}

fn append(dir: &Path, file: &Path, entry: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)?;
    f.write_all(entry.as_bytes())
}
