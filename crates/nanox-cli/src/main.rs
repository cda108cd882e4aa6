//! nanox CLI — entry point.
//!
//! # Modes
//!
//! - `nanox [PROMPT]` — single-shot: run one prompt, print the answer, exit
//! - `nanox --subagent <INSTRUCTION>` — isolated child started by `spawn_sub_agent`
//! - `nanox` — interactive REPL

mod helpers;
mod repl;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use nanox_agent::tools::{SubAgentLauncher, SUB_AGENT_ENV};
use nanox_agent::{
    AgentLoop, ContextBuilder, InteractionLog, LoopSettings, StopReason, ToolRegistry,
    ToolsSettings, Workspace,
};
use nanox_core::config::{load_config, Config};
use nanox_core::utils::expand_home;
use nanox_providers::http_provider::HttpProvider;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// nanox: a tool-calling coding agent for your terminal
#[derive(Parser, Debug)]
#[command(name = "nanox", version, about, long_about = None)]
struct Cli {
    /// Prompt to run once. Omit for the interactive REPL.
    prompt: Option<String>,

    /// Run as an isolated sub-agent on this instruction and print the answer
    #[arg(long, value_name = "INSTRUCTION")]
    subagent: Option<String>,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    logs: bool,

    /// Config file (default: ./nanox.json, then ~/.nanox/config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Child mode is requested by flag or inherited through the environment.
    fn is_sub_agent(&self, env_flag: Option<&str>) -> bool {
        self.subagent.is_some() || env_flag.is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logs);

    let config = load_config(cli.config.as_deref());
    config.validate()?;

    let env_flag = std::env::var(SUB_AGENT_ENV).ok();
    let sub_agent = cli.is_sub_agent(env_flag.as_deref());
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let agent = build_agent_loop(&config, &cwd, sub_agent)?
        .with_observer(Arc::new(helpers::PrintingObserver));

    match cli.subagent.or(cli.prompt) {
        Some(prompt) => run_once(&agent, &prompt, sub_agent).await,
        None if sub_agent => bail!("sub-agent mode requires an instruction"),
        None => {
            helpers::print_banner(&config.agent.name, agent.model(), &cwd);
            repl::run(&agent).await
        }
    }
}

/// Run one prompt to completion and print the final answer.
async fn run_once(agent: &AgentLoop, prompt: &str, sub_agent: bool) -> Result<()> {
    info!(sub_agent, "running single prompt");
    let outcome = agent.run(agent.initial_messages(), Some(prompt)).await;

    match &outcome.stop {
        StopReason::BackendError(e) => bail!("{e}"),
        StopReason::IterationLimit => {
            helpers::print_notice("Stopped: tool iteration limit reached.");
        }
        StopReason::Completed => {
            let answer = outcome.final_text().unwrap_or_default();
            if sub_agent {
                println!("{answer}");
            } else {
                helpers::print_response(answer);
            }
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────
// Wiring
// ─────────────────────────────────────────────

/// Build an `AgentLoop` from the loaded configuration.
///
/// Children get no launcher, so a sub-agent can never spawn another.
fn build_agent_loop(config: &Config, cwd: &Path, sub_agent: bool) -> Result<AgentLoop> {
    let workspace = Workspace::new(cwd.join(expand_home(&config.workspace.root)));
    workspace.ensure_layout().with_context(|| {
        format!("failed to create workspace: {}", workspace.root().display())
    })?;

    let launcher = if sub_agent {
        None
    } else {
        match SubAgentLauncher::current() {
            Ok(launcher) => Some(launcher),
            Err(e) => {
                warn!(error = %e, "cannot locate own executable; sub-agents disabled");
                None
            }
        }
    };

    let settings = ToolsSettings::from_config(config, cwd.to_path_buf(), workspace.clone(), launcher);
    let tools = ToolRegistry::builtin(&settings);
    let context = ContextBuilder::new(
        workspace,
        config.agent.name.clone(),
        config.budgets.memory_chars,
    );
    let provider = HttpProvider::from_config(&config.provider, &config.self_heal);
    let log = if config.logging.interaction_log {
        InteractionLog::new(cwd.join(&config.logging.interaction_dir))
    } else {
        InteractionLog::disabled()
    };

    Ok(AgentLoop::new(
        Arc::new(provider),
        tools,
        context,
        LoopSettings::from_config(config),
        log,
    ))
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("nanox=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
