//! Context builder — assembles the system prompt from ordered sections.
//!
//! Section order: identity, memory, skills summary, active skills, bootstrap
//! documents, permission constraint. The prompt is rebuilt from scratch on
//! every refresh; nothing is cached between calls.

use chrono::Local;
use nanox_core::utils::truncate_output;
use tracing::{debug, warn};

use crate::memory::MemoryStore;
use crate::skills::SkillsLoader;
use crate::workspace::Workspace;

/// Separator between sections of the system prompt.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Files injected wholesale into every prompt when present.
const BOOTSTRAP_FILES: &[&str] = &["AGENTS.md", "SOUL.md", "USER.md", "TOOLS.md", "IDENTITY.md"];

// ─────────────────────────────────────────────
// Default bootstrap documents
// ─────────────────────────────────────────────

const DEFAULT_SOUL: &str = "# Core Philosophy
You are a minimalist, high-efficiency coding agent.
- **Precision**: skip pleasantries and go straight to the solution.
- **Impact**: prefer small, high-leverage changes.
- **Verification**: never assume code works; check it.

# Tone
- Direct and professional.
- No emojis unless requested.";

const DEFAULT_USER: &str = "# User Context
- **Role**: Developer / Architect
- **Goal**: Build a robust, self-improving agent runtime (nanox).
- **Preferences**:
    - Rust for this project.
    - Small, composable modules over clever abstractions.";

const DEFAULT_AGENTS: &str = "# Tool Usage Guidelines

## Editing Code
- **Use `smart_edit`** to modify existing files.
    - It is a native tool, not a shell command. Never run it through `shell_execute_command`.
    - Give a `findText` block with enough surrounding lines to be unique.
    - Do not rewrite a whole file with `fs_write_file` to change a few lines.

## File Operations
- **Listing**: `fs_ls` explores directories (skips node_modules, .git, dist).
- **Reading**: `fs_read_file`. Files over 500 lines require `startLine` and `endLine`.
  Do not use `cat` or pipes through the shell for reading.
- **Writing**: `fs_write_file` only for new files or very small ones.
- **Metadata**: `get_file_metadata` for size and modification time. Do not guess.

## Shell Execution
- `shell_execute_command` for git, cargo, mkdir and other system tasks with no dedicated tool.

## Sub-Agents
- `spawn_sub_agent` runs an independent agent process with a fresh context on the same filesystem.
- Use it for large, self-contained tasks (audits, wide refactors) or risky operations.
- Give a complete, self-contained instruction; you receive a summary of its output.

## Web
- `web_search(query)` searches DuckDuckGo (no API key) and returns the top results.
- `web_fetch(url)` reads one page as plain text.
- Search first, then fetch when a snippet is not enough.

## Output Handling
- Tool output over 5000 characters is truncated in the middle. Read large files in ranges.";

const DEFAULT_IDENTITY: &str = "# Identity
You are nanox, an autonomous coding agent.";

const DEFAULT_BOOTSTRAP: &[(&str, &str)] = &[
    ("SOUL.md", DEFAULT_SOUL),
    ("USER.md", DEFAULT_USER),
    ("AGENTS.md", DEFAULT_AGENTS),
    ("IDENTITY.md", DEFAULT_IDENTITY),
];

const PERMISSION_CONSTRAINT: &str = "Your cognition and memory are stored in ./workspace/. \
Unless the user explicitly says otherwise, make self-updates and records inside workspace/.

## Record Instinct
Your context window is expensive and temporary; written storage is cheap and permanent.
Whenever you learn a new user preference, fix a complex bug, or settle an architecture decision, \
call the `remember` tool to persist it.

## Skill Usage (Progressive Loading)
Only the skill fragments most relevant to the current task are loaded.
If they are not enough, check `## Available Skills`, ask the user for more specific keywords, \
or read the full documents under `workspace/skills/` with `fs_read_file`.";

// ─────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────

/// Kind of a system prompt section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionKind {
    Identity,
    Memory,
    SkillsSummary,
    ActiveSkill,
    BootstrapDocs,
    PermissionConstraint,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContextSection {
    pub kind: SectionKind,
    pub body: String,
}

impl ContextSection {
    fn new(kind: SectionKind, body: String) -> Self {
        Self { kind, body }
    }
}

// ─────────────────────────────────────────────
// Context builder
// ─────────────────────────────────────────────

/// Builds the system prompt for the agent loop.
pub struct ContextBuilder {
    workspace: Workspace,
    agent_name: String,
    memory: Option<MemoryStore>,
    skills: SkillsLoader,
    memory_budget: usize,
}

impl ContextBuilder {
    /// Prepare the workspace (directories, default bootstrap documents, default
    /// skill) and load skills. I/O failures are logged, never fatal.
    pub fn new(workspace: Workspace, agent_name: impl Into<String>, memory_budget: usize) -> Self {
        if let Err(e) = workspace.ensure_layout() {
            warn!(root = %workspace.root().display(), error = %e, "failed to create workspace layout");
        }

        let memory = match MemoryStore::new(workspace.clone()) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(error = %e, "memory store unavailable");
                None
            }
        };

        let skills = SkillsLoader::new(workspace.skills_dir());

        for (name, content) in DEFAULT_BOOTSTRAP {
            if let Err(e) = workspace.write_if_missing(&workspace.bootstrap(name), content) {
                warn!(file = name, error = %e, "failed to create bootstrap file");
            }
        }

        Self {
            workspace,
            agent_name: agent_name.into(),
            memory,
            skills,
            memory_budget,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn skills(&self) -> &SkillsLoader {
        &self.skills
    }

    // ────────────── System prompt ──────────────

    /// Ordered prompt sections for the given (optional) user input.
    pub fn build_sections(&self, user_input: Option<&str>) -> Vec<ContextSection> {
        let mut sections = vec![ContextSection::new(SectionKind::Identity, self.identity())];

        if let Some(memory) = self.memory.as_ref().and_then(MemoryStore::memory_context) {
            let truncated = truncate_output(&memory, self.memory_budget);
            sections.push(ContextSection::new(
                SectionKind::Memory,
                format!("## Memory (Second Brain)\n\n{truncated}"),
            ));
        }

        sections.push(ContextSection::new(
            SectionKind::SkillsSummary,
            format!("## Available Skills\n{}", self.skills.summary()),
        ));

        if let Some(matched) = user_input.and_then(|input| self.skills.match_skills(input)) {
            sections.push(ContextSection::new(
                SectionKind::ActiveSkill,
                format!("# Active Skill Context\n\n{matched}"),
            ));
        }

        if let Some(docs) = self.bootstrap_docs() {
            sections.push(ContextSection::new(SectionKind::BootstrapDocs, docs));
        }

        sections.push(ContextSection::new(
            SectionKind::PermissionConstraint,
            PERMISSION_CONSTRAINT.to_string(),
        ));

        sections
    }

    /// Full system prompt: sections joined by [`SECTION_SEPARATOR`].
    pub fn build_system_prompt(&self, user_input: Option<&str>) -> String {
        self.build_sections(user_input)
            .into_iter()
            .map(|s| s.body)
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR)
    }

    fn identity(&self) -> String {
        let now = Local::now().format("%A, %Y-%m-%d %H:%M");
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| ".".to_string());
        let workspace = self.workspace.root().display();

        format!(
            "# {name}\n\n\
             You are {name}, a lightweight coding agent built for efficiency and precision.\n\n\
             ## Current Time\n{now}\n\n\
             ## Runtime\n\
             OS: {os}/{arch}\n\
             CWD: {cwd}\n\n\
             ## Workspace Status\n\
             Your home base is: {workspace}\n\
             Your cognitive sandbox (memory/config) is strictly confined to this directory.",
            name = self.agent_name,
        )
    }

    fn bootstrap_docs(&self) -> Option<String> {
        let mut parts = Vec::new();
        for filename in BOOTSTRAP_FILES {
            let path = self.workspace.bootstrap(filename);
            if !path.is_file() {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    debug!(file = filename, "loaded bootstrap file");
                    parts.push(format!("## {filename}\n\n{content}"));
                }
                Err(e) => warn!(file = filename, error = %e, "failed to read bootstrap file"),
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKind;
    use nanox_core::utils::truncation_marker;

    fn make_builder(tmp: &tempfile::TempDir) -> ContextBuilder {
        ContextBuilder::new(Workspace::new(tmp.path().join("workspace")), "nanox", 3000)
    }

    fn kinds(sections: &[ContextSection]) -> Vec<SectionKind> {
        sections.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_materializes_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let builder = make_builder(&tmp);
        let ws = builder.workspace();
        for name in ["SOUL.md", "USER.md", "AGENTS.md", "IDENTITY.md"] {
            assert!(ws.bootstrap(name).is_file(), "{name} missing");
        }
        assert!(!ws.bootstrap("TOOLS.md").exists());
        assert!(ws.long_term_file().is_file());
        assert_eq!(builder.skills().skills().len(), 1);
    }

    #[test]
    fn test_keeps_user_edited_bootstrap() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path().join("workspace"));
        std::fs::create_dir_all(ws.root()).unwrap();
        std::fs::write(ws.bootstrap("SOUL.md"), "my soul").unwrap();

        let builder = ContextBuilder::new(ws, "nanox", 3000);
        let prompt = builder.build_system_prompt(None);
        assert!(prompt.contains("## SOUL.md\n\nmy soul"));
    }

    #[test]
    fn test_section_order_without_input() {
        let tmp = tempfile::tempdir().unwrap();
        let sections = make_builder(&tmp).build_sections(None);
        assert_eq!(
            kinds(&sections),
            vec![
                SectionKind::Identity,
                SectionKind::Memory,
                SectionKind::SkillsSummary,
                SectionKind::BootstrapDocs,
                SectionKind::PermissionConstraint,
            ]
        );
    }

    #[test]
    fn test_active_skill_only_on_match() {
        let tmp = tempfile::tempdir().unwrap();
        let builder = make_builder(&tmp);

        let sections = builder.build_sections(Some("please write a haiku"));
        assert!(!kinds(&sections).contains(&SectionKind::ActiveSkill));

        let sections = builder.build_sections(Some("Please REVIEW src/main.rs"));
        let active = sections
            .iter()
            .find(|s| s.kind == SectionKind::ActiveSkill)
            .unwrap();
        assert!(active.body.starts_with("# Active Skill Context\n\n## Skill: Code Reviewer"));
        assert_eq!(sections[3].kind, SectionKind::ActiveSkill);
    }

    #[test]
    fn test_prompt_joins_with_separator() {
        let tmp = tempfile::tempdir().unwrap();
        let builder = make_builder(&tmp);
        let prompt = builder.build_system_prompt(None);
        let sections = builder.build_sections(None);
        assert!(prompt.matches(SECTION_SEPARATOR).count() >= sections.len() - 1);
        assert!(prompt.starts_with("# nanox"));
        assert!(prompt.contains("## Available Skills\n- **Code Reviewer**"));
        assert!(prompt.contains("## Record Instinct"));
        assert!(prompt.ends_with("with `fs_read_file`."));
    }

    #[test]
    fn test_bootstrap_order() {
        let tmp = tempfile::tempdir().unwrap();
        let builder = make_builder(&tmp);
        let docs = builder.bootstrap_docs().unwrap();
        let agents = docs.find("## AGENTS.md").unwrap();
        let soul = docs.find("## SOUL.md").unwrap();
        let identity = docs.find("## IDENTITY.md").unwrap();
        assert!(agents < soul && soul < identity);
    }

    #[test]
    fn test_memory_is_truncated() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path().join("workspace"));
        let builder = ContextBuilder::new(ws, "nanox", 200);
        let store = MemoryStore::new(builder.workspace().clone()).unwrap();
        store.save(&"x".repeat(1000), MemoryKind::LongTerm).unwrap();

        let memory = builder
            .build_sections(None)
            .into_iter()
            .find(|s| s.kind == SectionKind::Memory)
            .unwrap();
        assert!(memory.body.starts_with("## Memory (Second Brain)\n\n### Long-term Memory"));
        assert!(memory.body.contains("[Output truncated]"));
    }

    /// Drop the clock line so two builds a minute apart still compare equal.
    fn without_clock(body: &str) -> String {
        let mut after_heading = false;
        body.lines()
            .filter(|line| {
                let keep = !after_heading;
                after_heading = *line == "## Current Time";
                keep
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn section(sections: &[ContextSection], kind: SectionKind) -> String {
        sections
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.body.clone())
            .unwrap()
    }

    #[test]
    fn test_large_memory_is_bounded_and_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        let builder = make_builder(&tmp);
        let before = builder.build_sections(None);

        let store = MemoryStore::new(builder.workspace().clone()).unwrap();
        store.save(&"m".repeat(5000), MemoryKind::LongTerm).unwrap();
        let after = builder.build_sections(None);

        let memory = section(&after, SectionKind::Memory);
        let body = memory
            .strip_prefix("## Memory (Second Brain)\n\n")
            .unwrap();
        assert!(body.contains("[Output truncated]"));
        let raw_len = builder.memory.as_ref().unwrap().memory_context().unwrap().chars().count();
        let marker_len = truncation_marker(raw_len - 2 * 1500).chars().count();
        assert!(body.chars().count() <= 3000 + marker_len);

        assert_eq!(
            without_clock(&section(&before, SectionKind::Identity)),
            without_clock(&section(&after, SectionKind::Identity))
        );
        assert_eq!(
            section(&before, SectionKind::SkillsSummary),
            section(&after, SectionKind::SkillsSummary)
        );
    }

    #[test]
    fn test_unwritable_workspace_still_builds() {
        let tmp = tempfile::tempdir().unwrap();
        // A file where the workspace directory should be
        let blocker = tmp.path().join("workspace");
        std::fs::write(&blocker, "not a dir").unwrap();

        let builder = ContextBuilder::new(Workspace::new(&blocker), "nanox", 3000);
        let sections = builder.build_sections(None);
        let k = kinds(&sections);
        assert_eq!(k.first(), Some(&SectionKind::Identity));
        assert!(!k.contains(&SectionKind::Memory));
        assert!(!k.contains(&SectionKind::BootstrapDocs));
        assert_eq!(k.last(), Some(&SectionKind::PermissionConstraint));
    }
}
