//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Every upstream failure keeps its HTTP status and response body so that
//! batch results can report exactly what the remote side said.
//!
//! ## Error Categories
//!
//! - **RateLimit**: Upstream quota hit (retry after backoff)
//! - **Transient**: Temporary server or timeout issues (retry)
//! - **Network**: Connectivity issues (retry with backoff)
//! - **Auth**: Credential or permission failures (fail fast)
//! - **BadRequest**: Request rejected as invalid (fail fast)
//! - **ParseError**: Response could not be understood
//! - **Config**: Local setup problem (fatal)

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories used for retry decisions and log tagging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    RateLimit,
    Transient,
    Network,
    Auth,
    BadRequest,
    ParseError,
    Config,
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Network => write!(f, "NETWORK"),
            Self::Auth => write!(f, "AUTH"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Config => write!(f, "CONFIG"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if this category is worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Transient | Self::Network)
    }

    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimit,
            408 | 500..=599 => Self::Transient,
            401 | 403 => Self::Auth,
            400..=499 => Self::BadRequest,
            _ => Self::Unknown,
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum SeoError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    // -------------------------------------------------------------------------
    // Text Generation
    // -------------------------------------------------------------------------
    /// Non-2xx answer from a generation provider (one attempt)
    #[error("{provider} API error ({status}): {body}")]
    ProviderApi {
        provider: String,
        status: u16,
        body: String,
    },

    /// Provider kept failing until the retry policy gave up
    #[error("Generation failed with {provider} after {attempts} attempt(s): {last_error}")]
    GenerationFailed {
        provider: String,
        attempts: usize,
        last_error: String,
    },

    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String, excerpt: String },

    // -------------------------------------------------------------------------
    // Google APIs
    // -------------------------------------------------------------------------
    #[error("Credentials missing: {0}")]
    CredentialsMissing(String),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Token request failed: {status} - {body}")]
    TokenExchangeFailed { status: u16, body: String },

    #[error("Indexing API error: {status} - {body}")]
    IndexingRequestFailed { status: u16, body: String },

    #[error("Search Console API error: {status} - {body}")]
    AnalyticsRequestFailed { status: u16, body: String },

    // -------------------------------------------------------------------------
    // Pipeline
    // -------------------------------------------------------------------------
    #[error("Unit '{unit}' failed during {phase}: {source}")]
    UnitGenerationFailed {
        unit: String,
        phase: String,
        source: Box<SeoError>,
    },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Setup / Control
    // -------------------------------------------------------------------------
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

pub type Result<T> = std::result::Result<T, SeoError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl SeoError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Wrap a phase failure for one unit
    pub fn unit_failed(unit: impl Into<String>, phase: impl Into<String>, source: SeoError) -> Self {
        Self::UnitGenerationFailed {
            unit: unit.into(),
            phase: phase.into(),
            source: Box::new(source),
        }
    }

    /// Build a malformed-response error keeping a short excerpt of the content
    pub fn malformed(reason: impl Into<String>, content: &str) -> Self {
        let excerpt: String = content
            .chars()
            .take(crate::constants::generation::EXCERPT_CHARS)
            .collect();
        Self::MalformedResponse {
            reason: reason.into(),
            excerpt,
        }
    }

    /// Upstream HTTP status, when the error came from a non-2xx response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ProviderApi { status, .. }
            | Self::TokenExchangeFailed { status, .. }
            | Self::IndexingRequestFailed { status, .. }
            | Self::AnalyticsRequestFailed { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::UnitGenerationFailed { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderApi { status, .. }
            | Self::TokenExchangeFailed { status, .. }
            | Self::IndexingRequestFailed { status, .. }
            | Self::AnalyticsRequestFailed { status, .. } => ErrorCategory::from_status(*status),
            Self::Http(e) => {
                if e.is_decode() {
                    ErrorCategory::ParseError
                } else if e.is_timeout() {
                    ErrorCategory::Transient
                } else if let Some(status) = e.status() {
                    ErrorCategory::from_status(status.as_u16())
                } else {
                    ErrorCategory::Network
                }
            }
            Self::Timeout { .. } => ErrorCategory::Transient,
            Self::Io(_) => ErrorCategory::Network,
            Self::Json(_) | Self::MalformedResponse { .. } => ErrorCategory::ParseError,
            Self::CredentialsMissing(_) | Self::InvalidCredential(_) => ErrorCategory::Auth,
            Self::Config(_) => ErrorCategory::Config,
            Self::InvalidInput(_) => ErrorCategory::BadRequest,
            Self::UnitGenerationFailed { source, .. } => source.category(),
            Self::GenerationFailed { .. }
            | Self::Render(_)
            | Self::Storage(_)
            | Self::Cancelled(_) => ErrorCategory::Unknown,
        }
    }

    /// Check if another attempt might succeed
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::Transient.to_string(), "TRANSIENT");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(ErrorCategory::from_status(429), ErrorCategory::RateLimit);
        assert_eq!(ErrorCategory::from_status(503), ErrorCategory::Transient);
        assert_eq!(ErrorCategory::from_status(408), ErrorCategory::Transient);
        assert_eq!(ErrorCategory::from_status(401), ErrorCategory::Auth);
        assert_eq!(ErrorCategory::from_status(404), ErrorCategory::BadRequest);
    }

    #[test]
    fn test_upstream_errors_keep_status_and_body() {
        let err = SeoError::IndexingRequestFailed {
            status: 403,
            body: "Permission denied".to_string(),
        };
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.to_string(), "Indexing API error: 403 - Permission denied");
        assert!(!err.is_retryable());

        let err = SeoError::AnalyticsRequestFailed {
            status: 500,
            body: "backend".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unit_failure_wraps_cause() {
        let cause = SeoError::Render("template exploded".to_string());
        let err = SeoError::unit_failed("dentist", "render", cause);
        let message = err.to_string();
        assert!(message.contains("dentist"));
        assert!(message.contains("template exploded"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_malformed_excerpt_is_bounded() {
        let content = "x".repeat(1000);
        match SeoError::malformed("no json", &content) {
            SeoError::MalformedResponse { excerpt, .. } => {
                assert_eq!(excerpt.len(), crate::constants::generation::EXCERPT_CHARS)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_setup_errors_are_not_retryable() {
        assert!(!SeoError::CredentialsMissing("none".into()).is_retryable());
        assert!(!SeoError::Config("bad".into()).is_retryable());
        assert!(SeoError::timeout("call", Duration::from_secs(1)).is_retryable());
    }
}
