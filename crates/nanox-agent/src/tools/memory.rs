//! `remember` — the agent's active write path into the memory store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use super::base::{require_bool, require_string, Capability, Tool};
use super::schema::ParamSpec;
use crate::memory::{MemoryKind, MemoryStore};
use crate::workspace::Workspace;

pub struct RememberTool {
    workspace: Workspace,
}

impl RememberTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for RememberTool {
    fn name(&self) -> &str {
        "remember"
    }

    fn description(&self) -> &str {
        "Save information to your permanent memory. Use this for user preferences, important facts, or daily progress."
    }

    fn capability(&self) -> Capability {
        Capability::Memory
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::string(
                "content",
                "The content to remember (fact, preference, decision, etc.)",
            ),
            ParamSpec::boolean(
                "isLongTerm",
                "True for long-term facts/preferences, False for daily progress/notes",
            ),
        ]
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let content = require_string(&params, "content")?;
        if content.trim().is_empty() {
            anyhow::bail!("Content cannot be empty");
        }
        let kind = if require_bool(&params, "isLongTerm")? {
            MemoryKind::LongTerm
        } else {
            MemoryKind::Daily
        };

        // The store is opened per call so the files are (re)seeded if they were removed.
        let store = MemoryStore::new(self.workspace.clone())?;
        Ok(store.save(&content, kind)?.to_string())
    }
}
