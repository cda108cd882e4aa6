//! Utility helpers — path resolution, date formatting, string manipulation.

use std::path::PathBuf;

/// Get the nanox data directory (e.g. `~/.nanox/`).
pub fn get_data_path() -> PathBuf {
    home_dir().join(".nanox")
}

/// Get today's local date as YYYY-MM-DD.
pub fn today_date() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Current local wall-clock time as HH:MM:SS.
pub fn clock_time() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Get current ISO 8601 timestamp.
pub fn timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe. Used for log previews.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Middle-out truncation guard for tool output.
///
/// Text of at most `max_len` characters passes through unchanged. Longer
/// text keeps the first and last `max_len / 2` characters with a notice
/// between them stating how many characters were dropped. Lengths are
/// counted in characters, never bytes.
pub fn truncate_output(text: &str, max_len: usize) -> String {
    let total = text.chars().count();
    if total <= max_len {
        return text.to_string();
    }

    let half = max_len / 2;
    let removed = total - 2 * half;
    let head: String = text.chars().take(half).collect();
    let tail: String = text.chars().skip(total - half).collect();

    format!("{head}{}{tail}", truncation_marker(removed))
}

/// Notice placed between head and tail by [`truncate_output`].
pub fn truncation_marker(removed: usize) -> String {
    format!(
        "\n\n... [Output truncated] ...\n[Warning: {removed} characters removed from middle. \
         Use specialized tools to read specific parts.]\n\n"
    )
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else if path == "~" {
        home_dir()
    } else {
        PathBuf::from(path)
    }
}

fn home_dir() -> PathBuf {
    dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
