//! Google API Integration
//!
//! Service-account authentication plus clients for the Indexing API and
//! Search Console, and the page health classifier fed by the latter.

pub mod auth;
pub mod credentials;
pub mod feedback;
pub mod indexing;
pub mod search_console;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{AccessToken, CredentialedClient, TokenManager};
pub use credentials::{JwtAssertion, JwtClaims, ServiceCredential};
pub use feedback::{
    FeedbackAnalysis, FeedbackLoopResult, FeedbackPolicy, HealthStatus, HealthSummary,
    PageMetrics, SuggestedAction,
};
pub use indexing::{BatchIndexOptions, IndexingClient, ProgressFn};
pub use search_console::SearchConsoleClient;
pub use types::{
    AnalyticsQuery, AnalyticsResponse, AnalyticsRow, BatchIndexingResult, DateRange, Dimension,
    DimensionFilter, DimensionFilterGroup, FilterOperator, GoogleEndpoints, IndexingFailure,
    IndexingOutcome, IndexingResponse, NotificationType, PagePerformance, Site, SiteSummary,
    UrlInspection,
};
