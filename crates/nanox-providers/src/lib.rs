//! Backend layer for nanox.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`] — trait the agent loop talks to
//! - [`error::ProviderError`] — classified backend failure (context overflow vs. the rest)
//! - [`http_provider::HttpProvider`] — OpenAI-compatible `/chat/completions` client

pub mod error;
pub mod http_provider;
pub mod traits;

pub use error::{OverflowPolicy, ProviderError, ProviderErrorKind};
pub use http_provider::HttpProvider;
pub use traits::{LlmProvider, LlmRequestConfig};
