//! Error types for the App Store Connect client library.

use std::time::Duration;

use thiserror::Error;

use crate::url_guard::SecurityError;

/// Maximum number of characters of server-supplied text kept in an error message.
pub const MAX_ERROR_TEXT_CHARS: usize = 256;

/// The main error type for all App Store Connect client operations.
#[derive(Error, Debug)]
pub enum AscError {
    /// Network or connection failure before any response was received
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    /// Reading the response failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Reading a local file (config, private key) failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The API answered 429 or 503
    #[error("{0}")]
    Retryable(RetryableError),

    /// The API answered with any other non-2xx status
    #[error("App Store Connect API error: {0}")]
    Api(ApiError),

    /// A URL was refused by the trust policy
    #[error("Untrusted URL: {0}")]
    Security(#[from] SecurityError),

    /// Minting the bearer token failed
    #[error("Token signing failed: {0}")]
    Signing(String),

    /// Invalid client or environment configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request could not be built from the given arguments
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The call's cancellation token fired
    #[error("Request cancelled")]
    Cancelled,

    /// The call's deadline passed
    #[error("Request timed out")]
    Timeout,

    /// Missing required credentials
    #[error("Missing credentials: issuer id, key id and private key are required")]
    MissingCredentials,
}

impl AscError {
    /// Whether this is a 429/503 failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AscError::Retryable(_))
    }

    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            AscError::Retryable(e) => Some(e.status),
            AscError::Api(e) => Some(e.status),
            _ => None,
        }
    }
}

/// A transient failure (429 or 503) that may succeed when repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryableError {
    /// HTTP status code (429 or 503)
    pub status: u16,
    /// Best available message from the response body
    pub message: String,
    /// Server-provided wait hint from `Retry-After`
    pub retry_after: Option<Duration>,
    /// Number of attempts made before giving up
    pub attempts: u32,
}

impl RetryableError {
    /// Create a retryable error for a single attempt.
    pub fn new(status: u16, message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after,
            attempts: 1,
        }
    }

    /// Whether the server reported rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

impl std::fmt::Display for RetryableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_rate_limited() {
            "rate limited"
        } else {
            "service unavailable"
        };
        write!(f, "HTTP {} ({kind}): {}", self.status, self.message)?;
        if let Some(retry_after) = self.retry_after {
            write!(f, "; server asked to retry after {retry_after:?}")?;
        }
        if self.attempts > 1 {
            write!(f, "; giving up after {} attempts", self.attempts)?;
        }
        Ok(())
    }
}

/// A permanent API failure.
///
/// Built from the first entry of the JSON:API `errors` array when the body has
/// one, otherwise from a sanitized excerpt of the raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Machine-readable error code (e.g. `NOT_FOUND`)
    pub code: Option<String>,
    /// Short summary
    pub title: Option<String>,
    /// Human-readable explanation
    pub detail: Option<String>,
    /// Further error objects in the same response
    pub additional_errors: usize,
    /// Sanitized body excerpt, used when the body was not a JSON:API error document
    pub raw: Option<String>,
}

impl ApiError {
    /// Create an API error from a status and raw excerpt.
    pub fn from_raw(status: u16, raw: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            title: None,
            detail: None,
            additional_errors: 0,
            raw: Some(raw.into()),
        }
    }

    /// Check if this is an authentication failure.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Check if the key lacks the role required for the endpoint.
    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }

    /// Check if the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Check if the request conflicts with the resource's current state.
    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(code) = &self.code {
            write!(f, " {code}")?;
        }
        match (&self.title, &self.detail) {
            (Some(title), Some(detail)) => write!(f, ": {title} - {detail}")?,
            (Some(text), None) | (None, Some(text)) => write!(f, ": {text}")?,
            (None, None) => {
                if let Some(raw) = self.raw.as_deref().filter(|r| !r.is_empty()) {
                    write!(f, ": {raw}")?;
                }
            }
        }
        if self.additional_errors > 0 {
            write!(f, " (+{} more)", self.additional_errors)?;
        }
        Ok(())
    }
}

/// Make untrusted text safe to print on a terminal.
///
/// Control characters (including ESC) are dropped, runs of whitespace collapse
/// to one space, and the result is capped at `max_chars` characters with a
/// trailing ellipsis when truncated.
pub fn sanitize_for_display(input: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_chars + 3));
    let mut count = 0;
    let mut pending_space = false;

    for c in input.chars() {
        if c.is_whitespace() {
            pending_space = count > 0;
            continue;
        }
        if c.is_control() {
            continue;
        }
        if pending_space {
            if count >= max_chars {
                out.push_str("...");
                return out;
            }
            out.push(' ');
            count += 1;
            pending_space = false;
        }
        if count >= max_chars {
            out.push_str("...");
            return out;
        }
        out.push(c);
        count += 1;
    }
    out
}
