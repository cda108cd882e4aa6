//! Interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history. The
//! conversation is carried across turns; the system prompt is rebuilt for
//! every input.

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use nanox_agent::{AgentLoop, StopReason};

use crate::helpers;

const PROMPT: &str = "nano-x > ";

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit"];

/// Run the interactive REPL loop.
pub async fn run(agent: &AgentLoop) -> Result<()> {
    let mut editor = create_editor()?;
    let mut messages = agent.initial_messages();

    loop {
        let input = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_exit_command(trimmed) {
            println!("Bye! 👋");
            break;
        }
        let _ = editor.add_history_entry(&input);

        debug!(input = trimmed, "processing input");
        let outcome = agent.run(messages, Some(trimmed)).await;
        match &outcome.stop {
            StopReason::BackendError(e) => helpers::print_error(&e.to_string()),
            StopReason::IterationLimit => {
                helpers::print_notice("Stopped: tool iteration limit reached.");
            }
            StopReason::Completed => {
                helpers::print_response(outcome.final_text().unwrap_or_default());
            }
        }
        messages = outcome.messages;
    }

    save_history(&mut editor);
    Ok(())
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let path = history_path();
    if path.exists() {
        let _ = editor.load_history(&path);
        debug!("loaded REPL history from {}", path.display());
    }
    Ok(editor)
}

fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// `~/.nanox/history/cli_history`
fn history_path() -> std::path::PathBuf {
    nanox_core::utils::get_data_path()
        .join("history")
        .join("cli_history")
}

fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}
