//! Tool modules for the nanox agent.

pub mod base;
pub mod schema;
pub mod registry;
pub mod filesystem;
pub mod shell;
pub mod memory;
pub mod web;
pub mod spawn;

pub use base::{Capability, Tool};
pub use filesystem::{smart_edit, EditError};
pub use registry::{ToolRegistry, ToolsSettings};
pub use schema::{ParamKind, ParamSpec};
pub use spawn::{SubAgentLauncher, SUB_AGENT_ENV};
