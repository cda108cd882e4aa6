//! Skills loader — discovers, parses and matches skill documents.
//!
//! Skills are **Markdown files** (`skills/<name>/SKILL.md`) that teach the
//! agent a procedure for a domain. They never register new tools.
//!
//! ## Progressive loading
//!
//! 1. Every prompt carries a one-line summary per skill.
//! 2. A skill's full body is injected only when one of its keywords appears
//!    in the user's input.
//!
//! ## SKILL.md format
//!
//! ```text
//! ---
//! Name: Code Reviewer
//! Description: Expert code analysis for security, performance, and maintainability.
//! Keywords: [review, audit, security]
//! ---
//!
//! # Code Review Standard
//! ...
//! ```
//!
//! Directories whose `SKILL.md` lacks any of the three fields are skipped.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info, warn};

const DEFAULT_SKILL_DIR: &str = "code_reviewer";

const DEFAULT_SKILL: &str = "---
Name: Code Reviewer
Description: Expert code analysis for security, performance, and maintainability.
Keywords: [review, audit, security, refactor, code quality]
---

# Code Review Standard

## 1. Security
- **Injection**: check shell commands, SQL and HTML built from external input.
- **Secrets**: no hardcoded API keys or tokens.
- **Input validation**: every external input is validated before use.

## 2. Performance
- **Loops**: avoid O(n^2) or worse on hot paths.
- **I/O**: file and network operations are async and bounded by timeouts.
- **Allocation**: avoid needless clones of large buffers.

## 3. Maintainability
- **Naming**: descriptive identifiers (`user_age`, not `x`).
- **Functions**: one responsibility each, under 50 lines where practical.
- **Errors**: propagate with `?`; no `unwrap()` outside tests.

## 4. Workflow
1. Read the file(s) with `fs_read_file` (use line ranges for large files).
2. Check them against the list above.
3. Summarize Critical, High and Medium issues.
4. Propose concrete fixes and apply them with `smart_edit`.
";

// ─────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────

/// A loaded skill.
#[derive(Clone, Debug, PartialEq)]
pub struct Skill {
    pub name: String,
    pub description: String,
    /// Lowercased, trimmed.
    pub keywords: Vec<String>,
    /// Full file content, front-matter included.
    pub content: String,
    pub path: PathBuf,
}

// ─────────────────────────────────────────────
// SkillsLoader
// ─────────────────────────────────────────────

pub struct SkillsLoader {
    skills_dir: PathBuf,
    skills: Vec<Skill>,
}

impl SkillsLoader {
    /// Create the skills directory (seeding the default skill when it is
    /// empty) and scan it.
    pub fn new(skills_dir: impl Into<PathBuf>) -> Self {
        let mut loader = Self {
            skills_dir: skills_dir.into(),
            skills: Vec::new(),
        };
        if let Err(e) = loader.ensure_skills_dir() {
            warn!(dir = %loader.skills_dir.display(), error = %e, "failed to prepare skills directory");
        }
        loader.scan();
        loader
    }

    fn ensure_skills_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.skills_dir)?;
        let is_empty = std::fs::read_dir(&self.skills_dir)?.next().is_none();
        if is_empty {
            let dir = self.skills_dir.join(DEFAULT_SKILL_DIR);
            std::fs::create_dir_all(&dir)?;
            std::fs::write(dir.join("SKILL.md"), DEFAULT_SKILL)?;
            info!("Created default skill: {DEFAULT_SKILL_DIR}");
        }
        Ok(())
    }

    /// Re-read every `<dir>/SKILL.md`, in directory-name order.
    pub fn scan(&mut self) {
        self.skills.clear();

        let Ok(entries) = std::fs::read_dir(&self.skills_dir) else {
            return;
        };
        let mut dirs: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let file = dir.join("SKILL.md");
            if !file.is_file() {
                continue;
            }
            match load_skill(&file) {
                Some(skill) => {
                    debug!(name = %skill.name, "loaded skill");
                    self.skills.push(skill);
                }
                None => debug!(file = %file.display(), "skipped skill without front-matter"),
            }
        }
        info!("Loaded {} skills", self.skills.len());
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    /// One line per skill, or `"No skills available."`.
    pub fn summary(&self) -> String {
        if self.skills.is_empty() {
            return "No skills available.".to_string();
        }
        self.skills
            .iter()
            .map(|s| {
                let first: Vec<&str> = s.keywords.iter().take(3).map(String::as_str).collect();
                format!(
                    "- **{}**: {} (Keywords: {}...)",
                    s.name,
                    s.description,
                    first.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full bodies of every skill with a keyword contained in `input`
    /// (case-insensitive), in load order. `None` when nothing matches.
    pub fn match_skills(&self, input: &str) -> Option<String> {
        if input.trim().is_empty() {
            return None;
        }
        let normalized = input.to_lowercase();

        let matched: Vec<String> = self
            .skills
            .iter()
            .filter(|s| s.keywords.iter().any(|k| normalized.contains(k.as_str())))
            .map(|s| format!("## Skill: {}\n{}", s.name, s.content))
            .collect();

        if matched.is_empty() {
            None
        } else {
            Some(matched.join("\n\n---\n\n"))
        }
    }
}

// ─────────────────────────────────────────────
// Helper functions
// ─────────────────────────────────────────────

fn load_skill(path: &Path) -> Option<Skill> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "failed to read skill");
            return None;
        }
    };
    let (name, description, keywords) = parse_front_matter(&content)?;
    Some(Skill {
        name,
        description,
        keywords,
        content,
        path: path.to_path_buf(),
    })
}

/// Extract `(name, description, keywords)` from the leading `---` block.
fn parse_front_matter(content: &str) -> Option<(String, String, Vec<String>)> {
    let block_re = Regex::new(r"(?s)\A---\r?\n(.*?)\r?\n---").ok()?;
    let block = block_re.captures(content)?.get(1)?.as_str();

    let field = |pattern: &str| -> Option<String> {
        let re = Regex::new(pattern).ok()?;
        Some(re.captures(block)?.get(1)?.as_str().trim().to_string())
    };

    let name = field(r"Name:\s*(.+)")?;
    let description = field(r"Description:\s*(.+)")?;
    let keywords_raw = field(r"Keywords:\s*\[(.*?)\]")?;

    let keywords = keywords_raw
        .split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    Some((name, description, keywords))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Create a temp skill directory with a SKILL.md file.
    fn create_skill(base: &Path, name: &str, content: &str) {
        let skill_dir = base.join(name);
        fs::create_dir_all(&skill_dir).unwrap();
        fs::write(skill_dir.join("SKILL.md"), content).unwrap();
    }

    const DEPLOY: &str = "---\nName: Deployer\nDescription: Ship releases.\nKeywords: [Deploy, release, rollout, canary]\n---\n\n# Deploy steps";

    #[test]
    fn parse_front_matter_valid() {
        let (name, desc, kw) = parse_front_matter(DEPLOY).unwrap();
        assert_eq!(name, "Deployer");
        assert_eq!(desc, "Ship releases.");
        assert_eq!(kw, vec!["deploy", "release", "rollout", "canary"]);
    }

    #[test]
    fn parse_front_matter_crlf() {
        let content = "---\r\nName: X\r\nDescription: Y\r\nKeywords: [a]\r\n---\r\nbody";
        let (name, desc, kw) = parse_front_matter(content).unwrap();
        assert_eq!(name, "X");
        assert_eq!(desc, "Y");
        assert_eq!(kw, vec!["a"]);
    }

    #[test]
    fn parse_front_matter_missing_field() {
        let content = "---\nName: X\nKeywords: [a]\n---\nbody";
        assert!(parse_front_matter(content).is_none());
        assert!(parse_front_matter("# no front-matter").is_none());
    }

    #[test]
    fn new_creates_default_skill_when_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let loader = SkillsLoader::new(tmp.path().join("skills"));
        assert_eq!(loader.skills().len(), 1);
        assert_eq!(loader.skills()[0].name, "Code Reviewer");
        assert!(tmp.path().join("skills/code_reviewer/SKILL.md").is_file());
    }

    #[test]
    fn new_does_not_seed_non_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        create_skill(tmp.path(), "deploy", DEPLOY);
        let loader = SkillsLoader::new(tmp.path());
        assert_eq!(loader.skills().len(), 1);
        assert_eq!(loader.skills()[0].name, "Deployer");
    }

    #[test]
    fn scan_skips_invalid_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        create_skill(tmp.path(), "zeta", DEPLOY);
        create_skill(tmp.path(), "broken", "# just markdown");
        create_skill(
            tmp.path(),
            "alpha",
            "---\nName: Alpha\nDescription: First.\nKeywords: [alpha]\n---\nA",
        );
        let loader = SkillsLoader::new(tmp.path());
        let names: Vec<&str> = loader.skills().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Deployer"]);
    }

    #[test]
    fn summary_lists_first_three_keywords() {
        let tmp = tempfile::tempdir().unwrap();
        create_skill(tmp.path(), "deploy", DEPLOY);
        let loader = SkillsLoader::new(tmp.path());
        assert_eq!(
            loader.summary(),
            "- **Deployer**: Ship releases. (Keywords: deploy, release, rollout...)"
        );
    }

    #[test]
    fn summary_when_no_skills() {
        let tmp = tempfile::tempdir().unwrap();
        create_skill(tmp.path(), "broken", "no metadata");
        let loader = SkillsLoader::new(tmp.path());
        assert_eq!(loader.summary(), "No skills available.");
    }

    #[test]
    fn match_is_case_insensitive_substring() {
        let tmp = tempfile::tempdir().unwrap();
        create_skill(tmp.path(), "deploy", DEPLOY);
        let loader = SkillsLoader::new(tmp.path());

        let matched = loader.match_skills("Please DEPLOY the service").unwrap();
        assert!(matched.starts_with("## Skill: Deployer\n---\nName: Deployer"));
        assert!(loader.match_skills("write a poem").is_none());
        assert!(loader.match_skills("").is_none());
    }

    #[test]
    fn match_multiple_joined_in_load_order() {
        let tmp = tempfile::tempdir().unwrap();
        create_skill(tmp.path(), "b_deploy", DEPLOY);
        create_skill(
            tmp.path(),
            "a_review",
            "---\nName: Reviewer\nDescription: Review.\nKeywords: [review]\n---\nR",
        );
        let loader = SkillsLoader::new(tmp.path());
        let matched = loader.match_skills("review then release").unwrap();
        let parts: Vec<&str> = matched.split("\n\n---\n\n").collect();
        assert!(parts[0].starts_with("## Skill: Reviewer"));
        assert!(matched.contains("## Skill: Deployer"));
    }

    #[test]
    fn empty_keyword_list_never_matches() {
        let tmp = tempfile::tempdir().unwrap();
        create_skill(
            tmp.path(),
            "empty",
            "---\nName: Empty\nDescription: None.\nKeywords: []\n---\nE",
        );
        let loader = SkillsLoader::new(tmp.path());
        assert_eq!(loader.skills().len(), 1);
        assert!(loader.match_skills("anything at all").is_none());
    }
}
