//! Tool Registry — holds the capability set and dispatches calls by name.
//!
//! The agent loop hands over the raw JSON argument text from the backend;
//! the registry decodes it, runs the tool and always returns text, even on
//! failure.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use nanox_core::config::schema::{Config, WebToolsConfig};
use nanox_core::types::ToolDefinition;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::base::Tool;
use super::filesystem::{FileMetadataTool, ListTool, ReadFileTool, SmartEditTool, WriteFileTool};
use super::memory::RememberTool;
use super::shell::ExecTool;
use super::spawn::{SpawnSubAgentTool, SubAgentLauncher};
use super::web::{WebFetchTool, WebSearchTool};
use crate::workspace::Workspace;

// ─────────────────────────────────────────────
// Settings for the built-in set
// ─────────────────────────────────────────────

/// Everything the built-in tools need from configuration.
#[derive(Clone, Debug)]
pub struct ToolsSettings {
    /// Directory relative paths resolve against (the process CWD).
    pub base_dir: PathBuf,
    /// Confine filesystem and shell access to `base_dir`.
    pub restrict_to_workspace: bool,
    pub exec_timeout_secs: u64,
    pub web: WebToolsConfig,
    /// Workspace used by the `remember` tool.
    pub workspace: Workspace,
    /// `None` in sub-agent mode: children never spawn children.
    pub sub_agent: Option<SubAgentLauncher>,
}

impl ToolsSettings {
    pub fn from_config(
        config: &Config,
        base_dir: PathBuf,
        workspace: Workspace,
        sub_agent: Option<SubAgentLauncher>,
    ) -> Self {
        Self {
            base_dir,
            restrict_to_workspace: config.tools.restrict_to_workspace,
            exec_timeout_secs: config.tools.exec.timeout,
            web: config.tools.web.clone(),
            workspace,
            sub_agent,
        }
    }
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Ordered tool store. Owns `Arc<dyn Tool>` so calls can run concurrently.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// The standard capability set, in a fixed order.
    pub fn builtin(settings: &ToolsSettings) -> Self {
        let base = settings.base_dir.clone();
        let allowed = settings
            .restrict_to_workspace
            .then(|| settings.base_dir.clone());

        let mut reg = Self::new();
        reg.register(Arc::new(ListTool::new(base.clone(), allowed.clone())));
        reg.register(Arc::new(ReadFileTool::new(base.clone(), allowed.clone())));
        reg.register(Arc::new(WriteFileTool::new(base.clone(), allowed.clone())));
        reg.register(Arc::new(SmartEditTool::new(base.clone(), allowed.clone())));
        reg.register(Arc::new(FileMetadataTool::new(base.clone(), allowed)));
        reg.register(Arc::new(ExecTool::new(
            base,
            settings.exec_timeout_secs,
            settings.restrict_to_workspace,
        )));
        reg.register(Arc::new(RememberTool::new(settings.workspace.clone())));
        reg.register(Arc::new(WebSearchTool::new(settings.web.max_results)));
        reg.register(Arc::new(WebFetchTool::new(
            settings.web.fetch_timeout_secs,
            settings.web.fetch_max_chars,
        )));
        if let Some(launcher) = &settings.sub_agent {
            reg.register(Arc::new(SpawnSubAgentTool::new(launcher.clone())));
        }
        reg
    }

    /// Register a tool. A second tool with an existing name is ignored.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        if self.has(tool.name()) {
            warn!(tool = tool.name(), "duplicate tool name, ignoring");
            return;
        }
        debug!(tool = tool.name(), capability = ?tool.capability(), "registered tool");
        self.tools.push(tool);
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Names in registration order.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Backend-facing definitions, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool by name with its raw JSON argument text.
    ///
    /// The result is always a `String`; failures become error text for the model.
    pub async fn execute(&self, name: &str, raw_arguments: &str) -> String {
        let Some(tool) = self.resolve(name) else {
            warn!(tool = name, "tool not found");
            return format!("Error: Unknown tool '{name}'");
        };

        let params = match parse_arguments(raw_arguments) {
            Ok(p) => p,
            Err(e) => {
                warn!(tool = name, error = %e, "invalid tool arguments");
                return format!("Error: Invalid arguments for {name}: {e}");
            }
        };

        info!(tool = name, "executing tool call");
        match tool.execute(params).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                format!("Error executing {name}: {e}")
            }
        }
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the argument payload into a map. Blank text means "no arguments".
fn parse_arguments(raw: &str) -> Result<HashMap<String, Value>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(raw)
}
