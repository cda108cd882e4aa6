//! Classified backend errors.
//!
//! The loop only needs one distinction: context overflow (recoverable by
//! resetting the history) versus everything else (terminal for the run).
//! The finer kinds exist for logging and user-facing messages.

use thiserror::Error;

/// Why an LLM call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The request exceeded what the model can take; self-heal applies.
    ContextOverflow,
    /// 401/403: bad API key or permissions.
    Auth,
    /// 429.
    RateLimit,
    /// 404: bad model name or endpoint.
    NotFound,
    /// Request took longer than the configured timeout.
    Timeout,
    /// Connection refused, DNS failure, reset, etc.
    Network,
    /// 5xx: provider-side outage.
    ServerError,
    /// Successful status but a body we could not use.
    Decode,
    Unknown,
}

/// Classified provider error.
#[derive(Debug, Error)]
#[error("backend error ({kind:?}, status {status:?}): {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub status: Option<u16>,
    /// `error.code` from the response body, when present.
    pub code: Option<String>,
    pub message: String,
}

/// Which failures count as context overflow.
#[derive(Clone, Debug, PartialEq)]
pub struct OverflowPolicy {
    pub statuses: Vec<u16>,
    pub error_codes: Vec<String>,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        Self {
            statuses: vec![400],
            error_codes: vec!["context_length_exceeded".to_string()],
        }
    }
}

impl OverflowPolicy {
    fn matches(&self, status: u16, code: Option<&str>) -> bool {
        code.is_some_and(|c| self.error_codes.iter().any(|e| e == c))
            || self.statuses.contains(&status)
    }
}

impl ProviderError {
    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, body: &str, policy: &OverflowPolicy) -> Self {
        let code = extract_error_code(body);

        let kind = if policy.matches(status, code.as_deref()) {
            ProviderErrorKind::ContextOverflow
        } else {
            match status {
                401 | 403 => ProviderErrorKind::Auth,
                404 => ProviderErrorKind::NotFound,
                408 => ProviderErrorKind::Timeout,
                429 => ProviderErrorKind::RateLimit,
                500..=599 => ProviderErrorKind::ServerError,
                _ => ProviderErrorKind::Unknown,
            }
        };

        Self {
            kind,
            status: Some(status),
            code,
            message: truncate_body(body),
        }
    }

    /// Transport-level failure (no HTTP status).
    pub fn network(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Timeout
        } else {
            ProviderErrorKind::Network
        };
        Self {
            kind,
            status: None,
            code: None,
            message: err.to_string(),
        }
    }

    /// A 2xx response whose body was unusable.
    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Decode,
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn is_context_overflow(&self) -> bool {
        self.kind == ProviderErrorKind::ContextOverflow
    }
}

/// `{"error": {"code": "..."}}`, with `error.type` as a fallback.
fn extract_error_code(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    v["error"]["code"]
        .as_str()
        .or_else(|| v["error"]["type"].as_str())
        .map(String::from)
}

fn truncate_body(body: &str) -> String {
    nanox_core::utils::truncate_string(body, 300)
}
