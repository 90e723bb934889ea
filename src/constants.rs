//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Retry/backoff constants shared by every upstream client
pub mod retry {
    /// Total attempts (first call included) before giving up
    pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 1000;
}

/// Text generation defaults
pub mod generation {
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    pub const DEFAULT_MAX_TOKENS: u32 = 4096;

    /// Upper bound accepted for temperature
    pub const MAX_TEMPERATURE: f32 = 2.0;

    /// Characters of a malformed response kept in error messages
    pub const EXCERPT_CHARS: usize = 200;
}

/// HTTP/Network constants
pub mod network {
    /// Request timeout for generation providers (seconds)
    pub const LLM_TIMEOUT_SECS: u64 = 120;

    /// Request timeout for Google APIs (seconds)
    pub const GOOGLE_TIMEOUT_SECS: u64 = 30;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;

    /// Wait for one artifact to reach the persistence sink (seconds)
    pub const SINK_WRITE_TIMEOUT_SECS: u64 = 30;
}

/// Service account authentication
pub mod auth {
    /// Cached tokens are refreshed this long before they expire
    pub const TOKEN_SAFETY_MARGIN_SECS: u64 = 60;

    /// Lifetime requested for a signed assertion
    pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

    pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

    pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

    pub const INDEXING_SCOPE: &str = "https://www.googleapis.com/auth/indexing";

    pub const WEBMASTERS_SCOPE: &str = "https://www.googleapis.com/auth/webmasters.readonly";

    /// Environment variable holding the service account JSON
    pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS_JSON";
}

/// Google endpoints and quotas
pub mod google {
    pub const INDEXING_BASE: &str = "https://indexing.googleapis.com/v3/urlNotifications";

    pub const WEBMASTERS_BASE: &str = "https://www.googleapis.com/webmasters/v3";

    pub const URL_INSPECTION_URL: &str =
        "https://searchconsole.googleapis.com/v1/urlInspection/index:inspect";

    /// Delay between Indexing API requests (burst limit is 600/min)
    pub const BATCH_DELAY_MS: u64 = 100;

    /// Delay between per-page analyses
    pub const ANALYZE_DELAY_MS: u64 = 200;

    /// Default analytics window (days)
    pub const DEFAULT_WINDOW_DAYS: u32 = 28;

    pub const DEFAULT_ROW_LIMIT: u32 = 1000;

    /// Row limit for top-N queries and pages
    pub const TOP_ROW_LIMIT: u32 = 10;
}

/// Health classification thresholds
pub mod feedback {
    /// CTR below this suggests a weak title/snippet
    pub const MIN_CTR: f64 = 0.02;

    /// Average position beyond this needs attention
    pub const ATTENTION_POSITION: f64 = 10.0;

    /// Average position beyond this is underperforming
    pub const UNDERPERFORMING_POSITION: f64 = 20.0;

    /// Impressions above this with few clicks flag the snippet
    pub const HIGH_IMPRESSIONS: u64 = 100;

    pub const SNIPPET_MIN_CLICKS: u64 = 5;

    /// Clicks below this on a well-ranked page flag search volume
    pub const LOW_TRAFFIC_CLICKS: u64 = 10;
}

/// Pipeline constants
pub mod pipeline {
    /// Delay between units to respect LLM rate limits (milliseconds)
    pub const DELAY_BETWEEN_UNITS_MS: u64 = 1000;

    pub const MAX_KEYWORDS: usize = 20;

    pub const MAX_INSIGHTS: usize = 7;

    pub const MAX_OBJECTIONS: usize = 5;

    /// Word count model for the strategy brief
    pub const WORDS_PER_SECTION: usize = 350;
    pub const INTRO_WORDS: usize = 200;
    pub const CONCLUSION_WORDS: usize = 150;
    pub const READING_WORDS_PER_MINUTE: usize = 200;

    /// Longest slug accepted in a page URL
    pub const MAX_SLUG_LEN: usize = 80;

    /// Search snippet limits (characters)
    pub const META_TITLE_MAX: usize = 60;
    pub const META_DESCRIPTION_MAX: usize = 160;
    pub const H1_MAX: usize = 70;
    pub const SUBHEADLINE_MAX: usize = 160;

    /// Comparison table rows kept
    pub const MAX_COMPARISON_ROWS: usize = 8;
}

/// Request tags attached to every generation call
///
/// Tags identify the step a request belongs to. Logs carry them and the
/// fixture provider keys its scripted replies on them.
pub mod tags {
    pub const ARCHITECT_KEYWORDS: &str = "architect.keywords";
    pub const ARCHITECT_INSIGHTS: &str = "architect.insights";
    pub const ARCHITECT_HOOK: &str = "architect.hook";
    pub const ARCHITECT_OBJECTIONS: &str = "architect.objections";
    pub const ARCHITECT_OUTLINE: &str = "architect.outline";
    pub const ARCHITECT_CTA: &str = "architect.cta";

    pub const WRITER_META: &str = "writer.meta";
    pub const WRITER_HERO: &str = "writer.hero";
    pub const WRITER_DEFINITION: &str = "writer.definition";
    pub const WRITER_PAIN: &str = "writer.pain";
    pub const WRITER_COMPARISON: &str = "writer.comparison";
    pub const WRITER_SOLUTION: &str = "writer.solution";
    pub const WRITER_FAQ: &str = "writer.faq";
    pub const WRITER_CTA: &str = "writer.cta";
    pub const WRITER_LINKS: &str = "writer.links";

    pub const CONNECTION_TEST: &str = "connection.test";

    /// Key used for requests that carry no tag
    pub const UNTAGGED: &str = "untagged";
}
