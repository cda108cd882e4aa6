//! Filesystem tools — list, read, write, smart edit, metadata.
//!
//! Relative paths resolve against the process working directory (`base_dir`).
//! With `allowed_dir` set, every resolved path must stay underneath it.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::{BoxFuture, FutureExt};
use nanox_core::utils::expand_home;
use serde_json::{json, Value};
use thiserror::Error;

use super::base::{optional_bool, optional_i64, require_string, Capability, Tool};
use super::schema::ParamSpec;

/// Names never shown by `fs_ls`.
const IGNORED_NAMES: &[&str] = &["node_modules", ".git", ".env", "dist", ".DS_Store"];
const LS_MAX_ENTRIES: usize = 100;
const LS_DEFAULT_DEPTH: i64 = 2;
/// Files longer than this must be read in ranges.
const READ_MAX_LINES: usize = 500;

// ─────────────────────────────────────────────
// Shared path helper
// ─────────────────────────────────────────────

/// Resolve a user-supplied path against `base_dir`, optionally restricting it
/// to `allowed_dir`.
fn resolve_path(base_dir: &Path, path: &str, allowed_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let expanded = expand_home(path);
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    };

    let resolved = canonicalize_lenient(&joined);

    if let Some(allowed) = allowed_dir {
        let allowed_canon = allowed
            .canonicalize()
            .unwrap_or_else(|_| allowed.to_path_buf());
        if !resolved.starts_with(&allowed_canon) {
            anyhow::bail!(
                "Access denied: path '{}' is outside allowed directory '{}'",
                resolved.display(),
                allowed_canon.display()
            );
        }
    }

    Ok(resolved)
}

/// Canonicalize the deepest existing ancestor of `path`, then re-append the
/// missing components with `.` and `..` folded lexically.
///
/// The missing tail cannot contain symlinks, so folding it is exact.
fn canonicalize_lenient(path: &Path) -> PathBuf {
    let (mut resolved, rest) = path
        .ancestors()
        .find_map(|ancestor| {
            let canon = ancestor.canonicalize().ok()?;
            let rest = path.strip_prefix(ancestor).ok()?;
            Some((canon, rest.to_path_buf()))
        })
        .unwrap_or_else(|| (PathBuf::new(), path.to_path_buf()));

    for component in rest.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

/// Base-dir handling shared by every filesystem tool.
#[derive(Clone, Debug)]
struct PathScope {
    base_dir: PathBuf,
    allowed_dir: Option<PathBuf>,
}

impl PathScope {
    fn resolve(&self, path: &str) -> anyhow::Result<PathBuf> {
        resolve_path(&self.base_dir, path, self.allowed_dir.as_deref())
    }
}

// ─────────────────────────────────────────────
// fs_ls
// ─────────────────────────────────────────────

/// Lists a directory, optionally recursively, relative to the working directory.
pub struct ListTool {
    scope: PathScope,
}

impl ListTool {
    pub fn new(base_dir: PathBuf, allowed_dir: Option<PathBuf>) -> Self {
        Self {
            scope: PathScope { base_dir, allowed_dir },
        }
    }
}

/// Depth-first listing. `depth` starts at 1 for the target directory itself.
fn collect_entries<'a>(
    dir: PathBuf,
    display_base: &'a Path,
    recursive: bool,
    max_depth: i64,
    depth: i64,
) -> BoxFuture<'a, Vec<String>> {
    async move {
        if depth > max_depth {
            return Vec::new();
        }
        let Ok(mut reader) = tokio::fs::read_dir(&dir).await else {
            return Vec::new();
        };

        let mut items = Vec::new();
        while let Ok(Some(entry)) = reader.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if IGNORED_NAMES.contains(&name.as_str()) {
                continue;
            }
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            items.push((name, entry.path(), is_dir));
        }
        items.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = Vec::new();
        for (_, full, is_dir) in items {
            let shown = full
                .strip_prefix(display_base)
                .unwrap_or(full.as_path())
                .display()
                .to_string();
            if is_dir {
                out.push(format!("{shown}/"));
                if recursive {
                    out.extend(collect_entries(full, display_base, recursive, max_depth, depth + 1).await);
                }
            } else {
                out.push(shown);
            }
        }
        out
    }
    .boxed()
}

#[async_trait]
impl Tool for ListTool {
    fn name(&self) -> &str {
        "fs_ls"
    }

    fn description(&self) -> &str {
        "List files in a directory. Ignores node_modules, .git, etc."
    }

    fn capability(&self) -> Capability {
        Capability::Filesystem
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::string("path", "Directory path"),
            ParamSpec::boolean("recursive", "List recursively?").optional(),
            ParamSpec::number("depth", "Recursion depth (default 2)").optional(),
        ]
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = params
            .get("path")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(".")
            .to_string();
        let recursive = optional_bool(&params, "recursive");
        let depth = optional_i64(&params, "depth").unwrap_or(LS_DEFAULT_DEPTH);
        let path = self.scope.resolve(&path_str)?;

        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list {path_str}: {e}"))?;
        if !meta.is_dir() {
            anyhow::bail!("{path_str} is not a directory");
        }

        let display_base = self
            .scope
            .base_dir
            .canonicalize()
            .unwrap_or_else(|_| self.scope.base_dir.clone());
        let entries = collect_entries(path, &display_base, recursive, depth, 1).await;

        if entries.is_empty() {
            return Ok("(empty directory)".into());
        }
        if entries.len() > LS_MAX_ENTRIES {
            let more = entries.len() - LS_MAX_ENTRIES;
            return Ok(format!(
                "{}\n\n... and {more} more files (Too many files)",
                entries[..LS_MAX_ENTRIES].join("\n")
            ));
        }
        Ok(entries.join("\n"))
    }
}

// ─────────────────────────────────────────────
// fs_read_file
// ─────────────────────────────────────────────

/// Reads a file, whole or by 1-based line range.
pub struct ReadFileTool {
    scope: PathScope,
}

impl ReadFileTool {
    pub fn new(base_dir: PathBuf, allowed_dir: Option<PathBuf>) -> Self {
        Self {
            scope: PathScope { base_dir, allowed_dir },
        }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "fs_read_file"
    }

    fn description(&self) -> &str {
        "Read file content. Files over 500 lines must be read in ranges (startLine, endLine)."
    }

    fn capability(&self) -> Capability {
        Capability::Filesystem
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::string("path", "File path"),
            ParamSpec::number("startLine", "Start line (1-based)").optional(),
            ParamSpec::number("endLine", "End line (1-based)").optional(),
        ]
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = require_string(&params, "path")?;
        let path = self.scope.resolve(&path_str)?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;

        let lines: Vec<&str> = content.split('\n').collect();
        let total = lines.len();
        let start_line = optional_i64(&params, "startLine");

        if total > READ_MAX_LINES && start_line.is_none() {
            anyhow::bail!(
                "File is too large ({total} lines). Please specify a line range (startLine, endLine) to read."
            );
        }

        let start = (start_line.unwrap_or(1) - 1).max(0);
        let end = optional_i64(&params, "endLine")
            .unwrap_or(total as i64)
            .min(total as i64);
        if start >= end {
            anyhow::bail!("Invalid line range {}-{end}", start + 1);
        }

        let selected = lines[start as usize..end as usize].join("\n");
        Ok(format!(
            "{selected}\n\nTotal lines: {total}, Showing lines {}-{end}",
            start + 1
        ))
    }
}

// ─────────────────────────────────────────────
// fs_write_file
// ─────────────────────────────────────────────

/// Creates or overwrites a file; parent directories are created.
pub struct WriteFileTool {
    scope: PathScope,
}

impl WriteFileTool {
    pub fn new(base_dir: PathBuf, allowed_dir: Option<PathBuf>) -> Self {
        Self {
            scope: PathScope { base_dir, allowed_dir },
        }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "fs_write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file (overwrites). Creates directories automatically."
    }

    fn capability(&self) -> Capability {
        Capability::Filesystem
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::string("path", "File path"),
            ParamSpec::string("content", "Full content"),
        ]
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = require_string(&params, "path")?;
        let content = require_string(&params, "content")?;
        let path = self.scope.resolve(&path_str)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                anyhow::anyhow!("Failed to create directory {}: {e}", parent.display())
            })?;
        }

        tokio::fs::write(&path, &content)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
        Ok(format!("File saved successfully ({} bytes)", content.len()))
    }
}

// ─────────────────────────────────────────────
// smart_edit
// ─────────────────────────────────────────────

/// Why a smart edit was not applied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("findText not found in file. Please ensure exact match (including whitespace).")]
    NotFound,
    #[error("findText matches {count} locations. Include more surrounding context so it matches exactly once.")]
    Ambiguous { count: usize },
    #[error("findText must not be empty")]
    EmptyFind,
}

/// Replace the single occurrence of `find` in `content`.
///
/// Matching ignores CRLF/LF differences. The result uses CRLF when the
/// original content did (more `\r\n` than bare `\n`), LF otherwise.
pub fn smart_edit(content: &str, find: &str, replace: &str) -> Result<String, EditError> {
    let find = find.replace("\r\n", "\n");
    if find.is_empty() {
        return Err(EditError::EmptyFind);
    }

    let crlf = content.matches("\r\n").count();
    let bare_lf = content.matches('\n').count() - crlf;
    let uses_crlf = crlf > bare_lf;

    let normalized = content.replace("\r\n", "\n");
    let count = normalized.split(find.as_str()).count() - 1;
    match count {
        0 => return Err(EditError::NotFound),
        1 => {}
        _ => return Err(EditError::Ambiguous { count }),
    }

    let edited = normalized.replacen(find.as_str(), &replace.replace("\r\n", "\n"), 1);
    Ok(if uses_crlf {
        edited.replace('\n', "\r\n")
    } else {
        edited
    })
}

/// Exact-match, single-occurrence text replacement.
pub struct SmartEditTool {
    scope: PathScope,
}

impl SmartEditTool {
    pub fn new(base_dir: PathBuf, allowed_dir: Option<PathBuf>) -> Self {
        Self {
            scope: PathScope { base_dir, allowed_dir },
        }
    }
}

#[async_trait]
impl Tool for SmartEditTool {
    fn name(&self) -> &str {
        "smart_edit"
    }

    fn description(&self) -> &str {
        "Replace one exact snippet in a file. findText must match exactly once (line endings are \
         normalized); include surrounding context to make it unique. Use this for small changes \
         instead of rewriting large files."
    }

    fn capability(&self) -> Capability {
        Capability::Filesystem
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::string("path", "File path"),
            ParamSpec::string("findText", "Exact text to find (must occur exactly once)"),
            ParamSpec::string("replaceText", "Replacement text"),
        ]
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = require_string(&params, "path")?;
        let find = require_string(&params, "findText")?;
        let replace = require_string(&params, "replaceText")?;
        let path = self.scope.resolve(&path_str)?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;

        let updated = smart_edit(&content, &find, &replace)?;
        tokio::fs::write(&path, updated)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;

        Ok(format!("Successfully edited {path_str}"))
    }
}

// ─────────────────────────────────────────────
// get_file_metadata
// ─────────────────────────────────────────────

/// Size, kind and modification time of a path.
pub struct FileMetadataTool {
    scope: PathScope,
}

impl FileMetadataTool {
    pub fn new(base_dir: PathBuf, allowed_dir: Option<PathBuf>) -> Self {
        Self {
            scope: PathScope { base_dir, allowed_dir },
        }
    }
}

#[async_trait]
impl Tool for FileMetadataTool {
    fn name(&self) -> &str {
        "get_file_metadata"
    }

    fn description(&self) -> &str {
        "Get file metadata (size, lastModified, etc.). USE THIS instead of guessing size from ls."
    }

    fn capability(&self) -> Capability {
        Capability::Filesystem
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::string("path", "File or directory path")]
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = require_string(&params, "path")?;
        let path = self.scope.resolve(&path_str)?;

        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to stat {}: {e}", path.display()))?;
        let modified: DateTime<Utc> = meta.modified()?.into();

        let info = json!({
            "size": meta.len(),
            "isDirectory": meta.is_dir(),
            "lastModified": modified.to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        Ok(serde_json::to_string_pretty(&info)?)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
