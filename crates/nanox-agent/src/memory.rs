//! Memory system — long-term memory and daily notes.
//!
//! The agent's memory is file-based:
//! - **Long-term memory**: `workspace/memory/MEMORY.md` — persistent facts, preferences
//! - **Daily notes**: `workspace/memory/daily/YYYY-MM-DD.md` — timestamped progress lines
//!
//! The context builder reads memory on every prompt build (passive read).
//! The agent writes memory through the `remember` tool (active write).
//! Entries are only ever appended.

use nanox_core::utils::{clock_time, today_date};
use tracing::{debug, info};

use crate::workspace::Workspace;

const INITIAL_LONG_TERM: &str =
    "# Long-term Memory\n- User: Developer\n- Project: nanox (self-evolving agent runtime)\n";

/// Which partition a memory entry goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryKind {
    LongTerm,
    Daily,
}

/// Result of a save, rendered as the tool output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    LongTermSaved,
    Duplicate,
    DailySaved { date: String },
}

impl std::fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveOutcome::LongTermSaved => write!(f, "Long-term memory saved."),
            SaveOutcome::Duplicate => write!(f, "Memory already exists (skipped duplicate)."),
            SaveOutcome::DailySaved { date } => write!(f, "Daily memory saved to {date}.md"),
        }
    }
}

// ─────────────────────────────────────────────
// MemoryStore
// ─────────────────────────────────────────────

/// File-based memory store for the agent.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    workspace: Workspace,
}

impl MemoryStore {
    /// Create the memory directories and seed `MEMORY.md` if it is missing.
    pub fn new(workspace: Workspace) -> std::io::Result<Self> {
        std::fs::create_dir_all(workspace.daily_dir())?;
        if workspace.write_if_missing(&workspace.long_term_file(), INITIAL_LONG_TERM)? {
            info!("Initialized MEMORY.md");
        }
        Ok(Self { workspace })
    }

    /// Append an entry to the chosen partition.
    ///
    /// Long-term entries already contained (as a substring) in `MEMORY.md`
    /// are skipped.
    pub fn save(&self, content: &str, kind: MemoryKind) -> std::io::Result<SaveOutcome> {
        let content = content.trim();
        match kind {
            MemoryKind::LongTerm => {
                let path = self.workspace.long_term_file();
                let existing = self.workspace.read(&path).unwrap_or_default();
                if existing.contains(content) {
                    debug!("skipped duplicate long-term memory");
                    return Ok(SaveOutcome::Duplicate);
                }
                self.workspace.append(&path, &format!("\n- {content}"))?;
                Ok(SaveOutcome::LongTermSaved)
            }
            MemoryKind::Daily => {
                let date = today_date();
                let path = self.workspace.daily_file(&date);
                self.workspace
                    .append(&path, &format!("\n- [{}] {content}", clock_time()))?;
                Ok(SaveOutcome::DailySaved { date })
            }
        }
    }

    /// Long-term memory plus today's notes, or `None` when both are empty.
    pub fn memory_context(&self) -> Option<String> {
        let mut parts = Vec::new();

        if let Some(long_term) = self.workspace.read(&self.workspace.long_term_file()) {
            if !long_term.trim().is_empty() {
                parts.push(format!("### Long-term Memory\n{long_term}"));
            }
        }

        let today = today_date();
        if let Some(daily) = self.workspace.read(&self.workspace.daily_file(&today)) {
            if !daily.trim().is_empty() {
                parts.push(format!("### Daily Memory ({today})\n{daily}"));
            }
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
