//! Terminal output: banner, responses, and live loop progress.

use std::path::Path;

use colored::Colorize;
use serde_json::Value;

use nanox_agent::LoopObserver;
use nanox_core::types::{Message, ToolCall};
use nanox_core::utils::truncate_string;

/// Tool arguments and results are clipped to this on screen.
const PREVIEW_CHARS: usize = 200;

const LOGO: &str = r"
  _ __   __ _ _ __   ___       __  __
 | '_ \ / _` | '_ \ / _ \ ____ \ \/ /
 | | | | (_| | | | | (_) |____| >  <
 |_| |_|\__,_|_| |_|\___/      /_/\_\
";

/// Print the banner shown at REPL start.
pub fn print_banner(name: &str, model: &str, cwd: &Path) {
    let version = env!("CARGO_PKG_VERSION");
    println!("{}", LOGO.cyan().bold());
    println!("{}  v{}", name.cyan().bold(), version.dimmed());
    println!(
        "{}",
        format!(
            "OS: {} | CWD: {} | Model: {model}",
            std::env::consts::OS,
            cwd.display()
        )
        .dimmed()
    );
    println!("{}", "Type \"exit\" or \"quit\" to leave.".dimmed());
    println!();
}

/// Print an agent response to stdout.
pub fn print_response(response: &str) {
    println!();
    if response.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{response}");
    }
    println!();
}

pub fn print_notice(text: &str) {
    eprintln!("{}", text.yellow());
}

pub fn print_error(text: &str) {
    eprintln!("\n{} {text}\n", "Error:".red().bold());
}

/// Compact single-line JSON when the arguments parse, raw text otherwise.
fn preview_arguments(raw: &str) -> String {
    let compact = serde_json::from_str::<Value>(raw)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| raw.to_string());
    truncate_string(&compact, PREVIEW_CHARS)
}

fn preview_result(result: &str) -> String {
    let first_line = result.lines().next().unwrap_or_default();
    let clipped = truncate_string(first_line, PREVIEW_CHARS);
    if result.lines().nth(1).is_some() {
        format!("{clipped} …")
    } else {
        clipped
    }
}

// ─────────────────────────────────────────────
// Loop observer
// ─────────────────────────────────────────────

/// Echoes intermediate reasoning and tool traffic while a turn runs.
/// The final answer is printed by the caller.
pub struct PrintingObserver;

impl LoopObserver for PrintingObserver {
    fn on_assistant(&self, message: &Message) {
        if message.tool_calls().is_empty() {
            return;
        }
        if let Some(text) = message.text().filter(|t| !t.trim().is_empty()) {
            println!("{}", text.trim().italic().dimmed());
        }
    }

    fn on_tool_call(&self, call: &ToolCall) {
        println!(
            "{} {}",
            format!("→ {}", call.function.name).cyan(),
            preview_arguments(&call.function.arguments).dimmed()
        );
    }

    fn on_tool_result(&self, call: &ToolCall, result: &str) {
        let line = preview_result(result);
        if result.starts_with("Error") {
            println!("{} {}", format!("✗ {}", call.function.name).red(), line.dimmed());
        } else {
            println!("{} {}", format!("✓ {}", call.function.name).green(), line.dimmed());
        }
    }

    fn on_self_heal(&self) {
        print_notice("Context too long; trimming history and retrying.");
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
