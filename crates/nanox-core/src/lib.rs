//! nanox core — message types, configuration, and shared utilities.
//!
//! Everything here is backend- and tool-agnostic; the provider and agent
//! crates build on these types.

pub mod config;
pub mod types;
pub mod utils;
