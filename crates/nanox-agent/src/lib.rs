//! nanox agent — conversation loop, tools, and context assembly.
//!
//! This crate contains:
//! - **tools**: Tool trait, registry, and built-in tools (filesystem, shell, memory, web, spawn)
//! - **context**: System prompt assembly from workspace, memory and skills
//! - **agent_loop**: The LLM ↔ tool-calling state machine with self-healing
//! - **interaction_log**: Per-day transcript of every loop transition

pub mod tools;
pub mod workspace;
pub mod memory;
pub mod skills;
pub mod context;
pub mod interaction_log;
pub mod agent_loop;

pub use agent_loop::{AgentLoop, LoopObserver, LoopSettings, RunOutcome, StopReason};
pub use context::ContextBuilder;
pub use interaction_log::InteractionLog;
pub use memory::MemoryStore;
pub use skills::SkillsLoader;
pub use tools::{Tool, ToolRegistry, ToolsSettings};
pub use workspace::Workspace;
