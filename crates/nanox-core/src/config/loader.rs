//! Config loader — reads the JSON config file and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file: explicit `--config` path, else `./nanox.json`, else `~/.nanox/config.json`
//! 3. `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL`
//! 4. `NANOX_<SECTION>__<FIELD>` (double underscore as delimiter)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Project-local config file name, looked up in the CWD.
pub const LOCAL_CONFIG_FILE: &str = "nanox.json";

/// Global config file path (`~/.nanox/config.json`).
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Resolve which config file to read.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        local
    } else {
        get_config_path()
    }
}

/// Load configuration from file + process environment.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = resolve_config_path(path);
    let config = read_config_file(&config_path);
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Read a config file without env overrides.
fn read_config_file(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Supported:
/// - `OPENAI_API_KEY` / `NANOX_PROVIDER__API_KEY` → `provider.api_key`
/// - `OPENAI_BASE_URL` / `NANOX_PROVIDER__API_BASE` → `provider.api_base`
/// - `OPENAI_MODEL` / `NANOX_PROVIDER__MODEL` → `provider.model`
/// - `NANOX_PROVIDER__MAX_TOKENS`, `NANOX_PROVIDER__TEMPERATURE`, `NANOX_PROVIDER__TIMEOUT_SECS`
/// - `NANOX_AGENT__MAX_TOOL_ITERATIONS`
/// - `NANOX_WORKSPACE__ROOT`
/// - `NANOX_BUDGETS__TOOL_RESULT_CHARS`, `NANOX_BUDGETS__MEMORY_CHARS`
/// - `NANOX_TOOLS__RESTRICT_TO_WORKSPACE`
/// - `NANOX_LOGGING__INTERACTION_LOG`
fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    // OpenAI-style variables first, namespaced ones win
    if let Some(val) = lookup("OPENAI_API_KEY") {
        config.provider.api_key = val;
    }
    if let Some(val) = lookup("OPENAI_BASE_URL") {
        config.provider.api_base = val;
    }
    if let Some(val) = lookup("OPENAI_MODEL") {
        config.provider.model = val;
    }

    if let Some(val) = lookup("NANOX_PROVIDER__API_KEY") {
        config.provider.api_key = val;
    }
    if let Some(val) = lookup("NANOX_PROVIDER__API_BASE") {
        config.provider.api_base = val;
    }
    if let Some(val) = lookup("NANOX_PROVIDER__MODEL") {
        config.provider.model = val;
    }
    if let Some(n) = parse_var(&lookup, "NANOX_PROVIDER__MAX_TOKENS") {
        config.provider.max_tokens = n;
    }
    if let Some(t) = parse_var(&lookup, "NANOX_PROVIDER__TEMPERATURE") {
        config.provider.temperature = t;
    }
    if let Some(n) = parse_var(&lookup, "NANOX_PROVIDER__TIMEOUT_SECS") {
        config.provider.timeout_secs = n;
    }

    if let Some(n) = parse_var(&lookup, "NANOX_AGENT__MAX_TOOL_ITERATIONS") {
        config.agent.max_tool_iterations = n;
    }
    if let Some(val) = lookup("NANOX_WORKSPACE__ROOT") {
        config.workspace.root = val;
    }
    if let Some(n) = parse_var(&lookup, "NANOX_BUDGETS__TOOL_RESULT_CHARS") {
        config.budgets.tool_result_chars = n;
    }
    if let Some(n) = parse_var(&lookup, "NANOX_BUDGETS__MEMORY_CHARS") {
        config.budgets.memory_chars = n;
    }

    if let Some(val) = lookup("NANOX_TOOLS__RESTRICT_TO_WORKSPACE") {
        config.tools.restrict_to_workspace = is_truthy(&val);
    }
    if let Some(val) = lookup("NANOX_LOGGING__INTERACTION_LOG") {
        config.logging.interaction_log = is_truthy(&val);
    }

    config
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {key}: cannot parse {raw:?}");
            None
        }
    }
}

fn is_truthy(val: &str) -> bool {
    val == "true" || val == "1"
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
