//! Shell tool — run a command through the platform shell.
//!
//! Output is returned untruncated; the agent loop applies the tool-result
//! budget to every result.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tokio::process::Command;
use tracing::{info, warn};

use super::base::{require_string, Capability, Tool};
use super::schema::ParamSpec;

/// Dangerous command patterns that are always refused.
const DENY_PATTERNS: &[&str] = &[
    r"\brm\s+-[rf]{1,2}\b",
    r"\bdel\s+/[fq]\b",
    r"\brmdir\s+/s\b",
    // Only in command position, so `git log --format=...` still runs.
    r"(?:^|[;&|(]|\bsudo)\s*(?:format|mkfs|diskpart|shutdown|reboot|poweroff)\b",
    r"\bdd\s+if=",
    r">\s*/dev/sd",
    r":\(\)\s*\{.*\};\s*:",
];

const SMART_EDIT_REFUSAL: &str =
    "Error: Do not call smart_edit via shell. It is a native tool; call it directly.";

// ─────────────────────────────────────────────
// ExecTool
// ─────────────────────────────────────────────

/// `shell_execute_command`: `sh -c` (or `cmd /C`) in the working directory.
pub struct ExecTool {
    working_dir: PathBuf,
    timeout: Duration,
    /// If true, refuse commands that reach outside `working_dir`.
    restrict_to_workspace: bool,
    deny_regexes: Vec<Regex>,
}

impl ExecTool {
    pub fn new(working_dir: PathBuf, timeout_secs: u64, restrict_to_workspace: bool) -> Self {
        let deny_regexes = DENY_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();

        Self {
            working_dir,
            timeout: Duration::from_secs(timeout_secs),
            restrict_to_workspace,
            deny_regexes,
        }
    }

    /// Refusal text for a command that must not run, if any.
    fn guard_command(&self, command: &str) -> Option<String> {
        if command.contains("smart_edit") {
            return Some(format!("{SMART_EDIT_REFUSAL}\nExit code: 1"));
        }

        let lower = command.to_lowercase();
        if self.deny_regexes.iter().any(|re| re.is_match(&lower)) {
            warn!(command, "command blocked by safety guard");
            return Some("Error: Command blocked by safety guard (dangerous pattern detected)".into());
        }

        if self.restrict_to_workspace {
            if command.contains("../") || command.contains("..\\") {
                return Some(
                    "Error: Command blocked: path traversal (../) not allowed in restricted mode"
                        .into(),
                );
            }

            let root = self
                .working_dir
                .canonicalize()
                .unwrap_or_else(|_| self.working_dir.clone());
            let abs_path_re = Regex::new(r#"(?:^|\s)(/[^\s"']+|[A-Za-z]:\\[^\s"']+)"#).ok();
            let paths = abs_path_re
                .iter()
                .flat_map(|re| re.captures_iter(command))
                .filter_map(|cap| cap.get(1));
            for m in paths {
                let raw = m.as_str();
                let p = PathBuf::from(raw);
                let resolved = p.canonicalize().unwrap_or(p);
                if !resolved.starts_with(&root) {
                    return Some(format!(
                        "Error: Command references path '{raw}' outside workspace"
                    ));
                }
            }
        }

        None
    }
}

/// stdout, then stderr, then the exit code when non-zero.
fn format_output(stdout: &str, stderr: &str, code: i32) -> String {
    let mut parts = Vec::new();
    if !stdout.is_empty() {
        parts.push(stdout.trim_end_matches('\n').to_string());
    }
    if !stderr.is_empty() {
        parts.push(stderr.trim_end_matches('\n').to_string());
    }
    if code != 0 {
        parts.push(format!("Exit code: {code}"));
    }

    if parts.is_empty() {
        "(no output)".to_string()
    } else {
        parts.join("\n")
    }
}

#[async_trait]
impl Tool for ExecTool {
    fn name(&self) -> &str {
        "shell_execute_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return combined stdout+stderr output."
    }

    fn capability(&self) -> Capability {
        Capability::Shell
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::string("command", "The shell command to execute")]
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let command = require_string(&params, "command")?;
        if command.trim().is_empty() {
            anyhow::bail!("Command cannot be empty");
        }

        if let Some(refusal) = self.guard_command(&command) {
            return Ok(refusal);
        }

        info!(command = %command, cwd = %self.working_dir.display(), "executing shell command");

        let (shell, flag) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        let child = Command::new(shell)
            .arg(flag)
            .arg(&command)
            .current_dir(&self.working_dir)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to spawn command: {e}"))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(format_output(
                &String::from_utf8_lossy(&output.stdout),
                &String::from_utf8_lossy(&output.stderr),
                output.status.code().unwrap_or(-1),
            )),
            Ok(Err(e)) => anyhow::bail!("Command failed: {e}"),
            Err(_) => Ok(format!(
                "Error: Command timed out after {} seconds",
                self.timeout.as_secs()
            )),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
