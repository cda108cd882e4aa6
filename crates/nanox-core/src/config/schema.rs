//! Configuration schema.
//!
//! Hierarchy: `Config` → `ProviderConfig`, `AgentConfig`, `WorkspaceConfig`,
//! `BudgetsConfig`, `ToolsConfig`, `SelfHealConfig`, `LoggingConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration, loaded from `./nanox.json` (or `~/.nanox/config.json`) + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub agent: AgentConfig,
    pub workspace: WorkspaceConfig,
    pub budgets: BudgetsConfig,
    pub tools: ToolsConfig,
    pub self_heal: SelfHealConfig,
    pub logging: LoggingConfig,
}

/// Startup validation failure.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing backend credentials: {0} is not set (OPENAI_API_KEY / OPENAI_BASE_URL)")]
    MissingCredentials(&'static str),
}

impl Config {
    /// Check that the backend can be reached at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredentials("apiKey"));
        }
        if self.provider.api_base.trim().is_empty() {
            return Err(ConfigError::MissingCredentials("apiBase"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────

/// The single OpenAI-compatible backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for bearer authentication.
    pub api_key: String,
    /// Base URL, e.g. `https://api.moonshot.cn/v1`.
    pub api_base: String,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: String::new(),
            model: "moonshot-v1-8k".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Iteration ceiling per run (each backend call, including a self-heal, counts).
    pub max_tool_iterations: u32,
    /// Display name used in the persona and banner.
    pub name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: 10,
            name: "nanox".to_string(),
        }
    }
}

/// Where the persistent workspace lives, relative to the process CWD.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceConfig {
    pub root: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: "workspace".to_string(),
        }
    }
}

/// Character budgets for text re-entering the prompt.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BudgetsConfig {
    /// Budget for every tool result.
    pub tool_result_chars: usize,
    /// Budget for the memory section of the system prompt.
    pub memory_chars: usize,
}

impl Default for BudgetsConfig {
    fn default() -> Self {
        Self {
            tool_result_chars: 5000,
            memory_chars: 3000,
        }
    }
}

// ─────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    /// Web tools configuration (search, fetch).
    pub web: WebToolsConfig,
    /// Shell exec tool configuration.
    pub exec: ExecToolConfig,
    /// Whether to restrict file/exec operations to the base directory.
    pub restrict_to_workspace: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebToolsConfig {
    /// Results returned by `web_search`.
    pub max_results: u32,
    pub fetch_timeout_secs: u64,
    /// Cap on extracted page text returned by `web_fetch`.
    pub fetch_max_chars: usize,
}

impl Default for WebToolsConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            fetch_timeout_secs: 15,
            fetch_max_chars: 5000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecToolConfig {
    /// Command timeout in seconds.
    pub timeout: u64,
}

impl Default for ExecToolConfig {
    fn default() -> Self {
        Self { timeout: 60 }
    }
}

// ─────────────────────────────────────────────
// Self-heal + logging
// ─────────────────────────────────────────────

/// Which backend failures count as context overflow.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelfHealConfig {
    /// HTTP statuses treated as overflow.
    pub statuses: Vec<u16>,
    /// Error codes (`error.code` in the response body) treated as overflow.
    pub error_codes: Vec<String>,
}

impl Default for SelfHealConfig {
    fn default() -> Self {
        Self {
            statuses: vec![400],
            error_codes: vec!["context_length_exceeded".to_string()],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Directory for `session_<date>.log` transcripts.
    pub interaction_dir: String,
    pub interaction_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            interaction_dir: "agent_interaction".to_string(),
            interaction_log: true,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
