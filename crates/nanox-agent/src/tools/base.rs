//! Tool trait — the interface every agent capability implements.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use nanox_core::types::ToolDefinition;

use super::schema::{derive_parameters, ParamSpec};

// ─────────────────────────────────────────────
// Capability tags
// ─────────────────────────────────────────────

/// The capability family a tool belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Filesystem,
    Shell,
    Memory,
    WebSearch,
    WebFetch,
    SubAgentSpawn,
}

// ─────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────

/// Every agent tool implements this trait.
///
/// The agent loop sends `to_definition()` to the backend and dispatches calls
/// through the registry, which turns any `Err` into text for the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used by the LLM to call this tool (e.g. `"fs_read_file"`).
    fn name(&self) -> &str;

    /// Human-readable description shown to the LLM.
    fn description(&self) -> &str;

    fn capability(&self) -> Capability;

    /// Declared parameters, in order.
    fn params(&self) -> Vec<ParamSpec>;

    /// JSON Schema derived from [`Tool::params`].
    fn parameters(&self) -> Value {
        derive_parameters(&self.params())
    }

    /// Execute the tool with already-decoded arguments.
    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String>;

    /// Build the `ToolDefinition` sent to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

// ─────────────────────────────────────────────
// Param helpers
// ─────────────────────────────────────────────

/// Extract a required `String` param, returning a user-friendly error.
pub fn require_string(params: &HashMap<String, Value>, key: &str) -> anyhow::Result<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {key}"))
}

/// Extract a required boolean param.
pub fn require_bool(params: &HashMap<String, Value>, key: &str) -> anyhow::Result<bool> {
    params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {key}"))
}

/// Extract an optional integer param. JSON numbers with a fractional part are
/// truncated (`"number"` in the schema allows them).
pub fn optional_i64(params: &HashMap<String, Value>, key: &str) -> Option<i64> {
    let v = params.get(key)?;
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

/// Extract an optional boolean param (defaults to `false` if absent).
pub fn optional_bool(params: &HashMap<String, Value>, key: &str) -> bool {
    params
        .get(key)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}
