//! Workspace storage — the on-disk tree holding bootstrap documents, skills
//! and memory.
//!
//! ```text
//! workspace/
//! ├── AGENTS.md  SOUL.md  USER.md  TOOLS.md  IDENTITY.md
//! ├── skills/<name>/SKILL.md
//! └── memory/
//!     ├── MEMORY.md
//!     └── daily/YYYY-MM-DD.md
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Handle to the workspace root. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a bootstrap document such as `SOUL.md`.
    pub fn bootstrap(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn skills_dir(&self) -> PathBuf {
        self.root.join("skills")
    }

    pub fn memory_dir(&self) -> PathBuf {
        self.root.join("memory")
    }

    pub fn long_term_file(&self) -> PathBuf {
        self.memory_dir().join("MEMORY.md")
    }

    pub fn daily_dir(&self) -> PathBuf {
        self.memory_dir().join("daily")
    }

    /// `memory/daily/{date}.md`.
    pub fn daily_file(&self, date: &str) -> PathBuf {
        self.daily_dir().join(format!("{date}.md"))
    }

    /// Create root, `skills/`, `memory/` and `memory/daily/`.
    pub fn ensure_layout(&self) -> std::io::Result<()> {
        for dir in [self.root.clone(), self.skills_dir(), self.daily_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                debug!(dir = %dir.display(), "created workspace directory");
            }
        }
        Ok(())
    }

    /// Read a file, `None` when it does not exist or cannot be read.
    /// Failures other than a missing file are logged.
    pub fn read(&self, path: &Path) -> Option<String> {
        match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to read workspace file");
                None
            }
        }
    }

    /// Append text to a file, creating it (and its parent) when missing.
    pub fn append(&self, path: &Path, text: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(text.as_bytes())
    }

    /// Write `text` only if `path` does not exist yet. Returns whether it wrote.
    pub fn write_if_missing(&self, path: &Path, text: &str) -> std::io::Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)?;
        debug!(file = %path.display(), "materialized default file");
        Ok(true)
    }
}
