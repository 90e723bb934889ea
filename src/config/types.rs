//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/seoforge/) and project (.seoforge/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ai::{GenerationDefaults, ProviderConfig, ProviderKind, RetryPolicy, TimeoutConfig};
use crate::constants::{auth, generation, google, network, pipeline, retry};
use crate::google::{FeedbackPolicy, GoogleEndpoints};
use crate::types::{Result, SeoError};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Published site settings
    pub site: SiteConfig,

    /// Text generation provider settings
    pub llm: LlmConfig,

    /// Indexing API and Search Console settings
    pub google: GoogleConfig,

    /// Batch orchestration settings
    pub pipeline: PipelineConfig,

    /// Page health classification thresholds
    pub feedback: FeedbackPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            site: SiteConfig::default(),
            llm: LlmConfig::default(),
            google: GoogleConfig::default(),
            pipeline: PipelineConfig::default(),
            feedback: FeedbackPolicy::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `SeoError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        match url::Url::parse(&self.site.base_url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            _ => {
                return Err(SeoError::Config(format!(
                    "site.base_url must be an absolute http(s) URL, got '{}'",
                    self.site.base_url
                )));
            }
        }

        if !(0.0..=generation::MAX_TEMPERATURE).contains(&self.llm.temperature) {
            return Err(SeoError::Config(format!(
                "LLM temperature must be between 0.0 and {}, got {}",
                generation::MAX_TEMPERATURE,
                self.llm.temperature
            )));
        }

        if self.llm.max_tokens == 0 {
            return Err(SeoError::Config(
                "LLM max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.llm.timeout_secs == 0 || self.google.timeout_secs == 0 {
            return Err(SeoError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.retry_attempts == 0 || self.google.retry_attempts == 0 {
            return Err(SeoError::Config(
                "retry_attempts must be at least 1".to_string(),
            ));
        }

        if self.google.window_days == 0 {
            return Err(SeoError::Config(
                "google.window_days must be greater than 0".to_string(),
            ));
        }

        let fb = &self.feedback;
        if !(0.0..=1.0).contains(&fb.min_ctr) {
            return Err(SeoError::Config(format!(
                "feedback.min_ctr must be a fraction between 0 and 1, got {}",
                fb.min_ctr
            )));
        }
        if fb.underperforming_position < fb.attention_position {
            return Err(SeoError::Config(format!(
                "feedback.underperforming_position ({}) must not be below attention_position ({})",
                fb.underperforming_position, fb.attention_position
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Site Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Public base URL; pages live at `{base_url}/{slug}`
    pub base_url: String,

    pub site_name: String,

    /// Directory receiving rendered pages and their metadata
    pub output_dir: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://example.com".to_string(),
            site_name: "SEOForge".to_string(),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl SiteConfig {
    pub fn page_url(&self, slug: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), slug)
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider: anthropic, openai, gemini, fixture
    pub provider: ProviderKind,

    /// Model name (provider default when unset)
    pub model: Option<String>,

    /// API key; falls back to the provider's environment variable
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL override (proxies)
    pub api_base: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Total attempts per call, first one included
    pub retry_attempts: usize,

    pub retry_base_delay_ms: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            api_key: None,
            api_base: None,
            timeout_secs: network::LLM_TIMEOUT_SECS,
            temperature: generation::DEFAULT_TEMPERATURE,
            max_tokens: generation::DEFAULT_MAX_TOKENS,
            retry_attempts: retry::DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_ms: retry::BASE_DELAY_MS,
        }
    }
}

impl LlmConfig {
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            kind: self.provider,
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    pub fn generation_defaults(&self) -> GenerationDefaults {
        GenerationDefaults {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

// =============================================================================
// Google Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// Service account JSON file; takes precedence over `credentials_env`
    pub credentials_path: Option<PathBuf>,

    /// Environment variable holding the service account JSON
    pub credentials_env: String,

    /// Search Console property (`https://...` or `sc-domain:...`);
    /// defaults to the site base URL
    pub site_url: Option<String>,

    /// Submit generated pages to the Indexing API after a batch
    pub indexing_enabled: bool,

    /// Allow feedback loop runs against Search Console
    pub feedback_enabled: bool,

    pub timeout_secs: u64,

    /// Pause between Indexing API requests
    pub batch_delay_ms: u64,

    /// Pause between per-page analyses
    pub analyze_delay_ms: u64,

    /// Analytics window in days
    pub window_days: u32,

    pub retry_attempts: usize,

    pub retry_base_delay_ms: u64,

    pub endpoints: GoogleEndpoints,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            credentials_path: None,
            credentials_env: auth::CREDENTIALS_ENV.to_string(),
            site_url: None,
            indexing_enabled: false,
            feedback_enabled: false,
            timeout_secs: network::GOOGLE_TIMEOUT_SECS,
            batch_delay_ms: google::BATCH_DELAY_MS,
            analyze_delay_ms: google::ANALYZE_DELAY_MS,
            window_days: google::DEFAULT_WINDOW_DAYS,
            retry_attempts: retry::DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_ms: retry::BASE_DELAY_MS,
            endpoints: GoogleEndpoints::default(),
        }
    }
}

impl GoogleConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    pub fn timeouts(&self) -> TimeoutConfig {
        TimeoutConfig {
            google_request: Duration::from_secs(self.timeout_secs),
            ..TimeoutConfig::default()
        }
    }

    /// Search Console property for `site`
    pub fn property(&self, site: &SiteConfig) -> String {
        self.site_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("{}/", site.base_url.trim_end_matches('/')))
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pause between units to respect provider rate limits
    pub delay_between_units_ms: u64,

    /// Stop launching new units after this many seconds
    pub deadline_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            delay_between_units_ms: pipeline::DELAY_BETWEEN_UNITS_MS,
            deadline_secs: None,
        }
    }
}
