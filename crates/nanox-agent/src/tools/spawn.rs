//! Sub-agent spawning — delegate a task to an isolated child process.
//!
//! The child is the same binary started as `<program> --subagent <instruction>`
//! with `SUB_AGENT_MODE=true`. It shares nothing with the parent but the
//! working directory; its output is streamed line by line over an unbounded
//! channel, and the tool resolves only when the child exits.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::base::{require_string, Capability, Tool};
use super::schema::ParamSpec;

/// Environment flag that puts a child into sub-agent mode.
pub const SUB_AGENT_ENV: &str = "SUB_AGENT_MODE";
/// Characters of child stdout returned to the parent model.
const SUMMARY_TAIL_CHARS: usize = 2000;

// ─────────────────────────────────────────────
// Launcher
// ─────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SubAgentError {
    #[error("instruction cannot be empty")]
    EmptyInstruction,
    #[error("{0}")]
    Spawn(#[source] std::io::Error),
    #[error("sub-agent exited with code {}", exit_label(*.code))]
    NonZeroExit { code: Option<i32>, stderr: String },
    #[error("failed waiting for sub-agent: {0}")]
    Io(#[source] std::io::Error),
}

/// `None` means the child was terminated by a signal.
fn exit_label(code: Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// One line of child output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubAgentOutput {
    Stdout(String),
    Stderr(String),
}

/// Everything a successful child wrote.
#[derive(Clone, Debug)]
pub struct SubAgentCompletion {
    pub stdout: String,
    pub stderr: String,
}

/// How to start a child agent.
#[derive(Clone, Debug)]
pub struct SubAgentLauncher {
    program: PathBuf,
    leading_args: Vec<String>,
    cwd: PathBuf,
}

impl SubAgentLauncher {
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    /// The running executable in the current directory.
    pub fn current() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, std::env::current_dir()?))
    }

    /// Arguments placed before `--subagent` (e.g. a script for an interpreter).
    pub fn with_leading_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Start the child with piped stdout/stderr.
    pub fn spawn(&self, instruction: &str) -> Result<SubAgentTask, SubAgentError> {
        if instruction.trim().is_empty() {
            return Err(SubAgentError::EmptyInstruction);
        }

        let mut child = Command::new(&self.program)
            .args(&self.leading_args)
            .arg("--subagent")
            .arg(instruction)
            .current_dir(&self.cwd)
            .env(SUB_AGENT_ENV, "true")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SubAgentError::Spawn)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let stdout = child
            .stdout
            .take()
            .map(|out| forward_lines(out, tx.clone(), SubAgentOutput::Stdout));
        let stderr = child
            .stderr
            .take()
            .map(|err| forward_lines(err, tx, SubAgentOutput::Stderr));

        Ok(SubAgentTask {
            output: rx,
            handle: SubAgentHandle {
                child,
                stdout,
                stderr,
            },
        })
    }
}

/// Read `stream` line by line, forwarding each line and collecting the text.
fn forward_lines<R>(
    stream: R,
    tx: mpsc::UnboundedSender<SubAgentOutput>,
    wrap: fn(String) -> SubAgentOutput,
) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut collected = String::new();
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            collected.push_str(&line);
            collected.push('\n');
            // The receiver may be gone; the text is still collected.
            let _ = tx.send(wrap(line));
        }
        collected
    })
}

// ─────────────────────────────────────────────
// Running task
// ─────────────────────────────────────────────

/// A started child: its live output and the handle that resolves on exit.
pub struct SubAgentTask {
    pub output: mpsc::UnboundedReceiver<SubAgentOutput>,
    pub handle: SubAgentHandle,
}

pub struct SubAgentHandle {
    child: Child,
    stdout: Option<JoinHandle<String>>,
    stderr: Option<JoinHandle<String>>,
}

impl SubAgentHandle {
    /// Wait for exit and for both streams to drain. A non-zero exit is an
    /// error carrying the child's stderr.
    pub async fn wait(mut self) -> Result<SubAgentCompletion, SubAgentError> {
        let status = self.child.wait().await.map_err(SubAgentError::Io)?;
        let stdout = join_text(self.stdout).await;
        let stderr = join_text(self.stderr).await;
        if status.success() {
            Ok(SubAgentCompletion { stdout, stderr })
        } else {
            Err(SubAgentError::NonZeroExit {
                code: status.code(),
                stderr,
            })
        }
    }
}

async fn join_text(handle: Option<JoinHandle<String>>) -> String {
    match handle {
        Some(h) => h.await.unwrap_or_default(),
        None => String::new(),
    }
}

/// Last `n` characters of `text`.
fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Text returned to the parent model for a finished (or failed) child.
fn render_result(result: Result<SubAgentCompletion, SubAgentError>) -> String {
    match result {
        Ok(done) => format!(
            "Sub-Agent Execution Completed.\n\nOutput Summary:\n{}",
            tail_chars(&done.stdout, SUMMARY_TAIL_CHARS)
        ),
        Err(SubAgentError::NonZeroExit { code, stderr }) => format!(
            "Sub-Agent Failed (Exit Code: {}).\n\nError Log:\n{stderr}",
            exit_label(code)
        ),
        Err(e @ SubAgentError::Spawn(_)) => format!("Failed to spawn sub-agent: {e}"),
        Err(e) => format!("Sub-Agent Failed: {e}"),
    }
}

// ─────────────────────────────────────────────
// spawn_sub_agent tool
// ─────────────────────────────────────────────

pub struct SpawnSubAgentTool {
    launcher: SubAgentLauncher,
}

impl SpawnSubAgentTool {
    pub fn new(launcher: SubAgentLauncher) -> Self {
        Self { launcher }
    }
}

#[async_trait]
impl Tool for SpawnSubAgentTool {
    fn name(&self) -> &str {
        "spawn_sub_agent"
    }

    fn description(&self) -> &str {
        "Spawn a sub-agent to handle a complex task independently. Use this for code analysis, \
         refactoring, or multi-step operations that can be parallelized or isolated."
    }

    fn capability(&self) -> Capability {
        Capability::SubAgentSpawn
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::string(
            "instruction",
            "The detailed instruction for the sub-agent.",
        )]
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let instruction = require_string(&params, "instruction")?;
        let instruction = instruction.trim();
        if instruction.is_empty() {
            anyhow::bail!("Instruction cannot be empty.");
        }

        info!(instruction, "spawning sub-agent");
        let SubAgentTask { mut output, handle } = match self.launcher.spawn(instruction) {
            Ok(task) => task,
            Err(e) => {
                warn!(error = %e, "failed to spawn sub-agent");
                return Ok(render_result(Err(e)));
            }
        };

        let echo = async {
            while let Some(line) = output.recv().await {
                match line {
                    SubAgentOutput::Stdout(l) => println!("[Sub] {l}"),
                    SubAgentOutput::Stderr(l) => eprintln!("[Sub:Err] {l}"),
                }
            }
        };
        let ((), result) = tokio::join!(echo, handle.wait());

        match &result {
            Ok(_) => info!("sub-agent completed"),
            Err(e) => warn!(error = %e, "sub-agent failed"),
        }
        Ok(render_result(result))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
