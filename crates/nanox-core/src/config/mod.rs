//! Configuration system — schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use nanox_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("Model: {}", cfg.provider.model);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{get_config_path, load_config, resolve_config_path};
pub use schema::{Config, ConfigError};
