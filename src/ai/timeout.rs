//! Unified Timeout Configuration
//!
//! Every upstream call is bounded: HTTP clients get an explicit request and
//! connect timeout, and arbitrary futures can be wrapped with [`with_timeout`].
//!
//! ## Usage
//!
//! ```ignore
//! use seoforge::ai::timeout::{TimeoutConfig, with_timeout};
//!
//! let config = TimeoutConfig::default();
//! let client = config.llm_client()?;
//! let result = with_timeout(config.llm_request, async { /* call */ }, "LLM request").await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::constants::network as net_constants;
use crate::types::{Result, SeoError};

/// Timeout configuration for upstream calls
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for one text generation request
    pub llm_request: Duration,
    /// Timeout for one Google API request (token exchange included)
    pub google_request: Duration,
    /// Timeout for establishing a connection
    pub connection: Duration,
    /// Timeout for handing one artifact to the persistence sink
    pub sink_write: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_request: Duration::from_secs(net_constants::LLM_TIMEOUT_SECS),
            google_request: Duration::from_secs(net_constants::GOOGLE_TIMEOUT_SECS),
            connection: Duration::from_secs(net_constants::CONNECTION_TIMEOUT_SECS),
            sink_write: Duration::from_secs(net_constants::SINK_WRITE_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    /// Short timeouts, used by tests and health checks
    pub fn fast() -> Self {
        Self {
            llm_request: Duration::from_secs(10),
            google_request: Duration::from_secs(5),
            connection: Duration::from_secs(2),
            sink_write: Duration::from_secs(5),
        }
    }

    /// HTTP client for generation providers
    pub fn llm_client(&self) -> Result<reqwest::Client> {
        build_client(self.llm_request, self.connection)
    }

    /// HTTP client for Google APIs
    pub fn google_client(&self) -> Result<reqwest::Client> {
        build_client(self.google_request, self.connection)
    }
}

fn build_client(request: Duration, connect: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(request)
        .connect_timeout(connect)
        .build()
        .map_err(|e| SeoError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Execute an async operation with a timeout
///
/// Returns [`SeoError::Timeout`] if the operation doesn't complete in time.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(SeoError::timeout(operation_name, timeout)),
    }
}
