//! Google API Types
//!
//! Wire shapes for the Indexing API and Search Console, plus the result types
//! built from them.

use serde::{Deserialize, Serialize};

use crate::constants::google;

// =============================================================================
// Endpoints
// =============================================================================

/// Base URLs for the Google APIs (overridable for proxies and tests)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleEndpoints {
    /// `{indexing_base}:publish` and `{indexing_base}/metadata`
    pub indexing_base: String,
    /// Search Console (webmasters v3) base
    pub webmasters_base: String,
    pub url_inspection_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            indexing_base: google::INDEXING_BASE.to_string(),
            webmasters_base: google::WEBMASTERS_BASE.to_string(),
            url_inspection_url: google::URL_INSPECTION_URL.to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// Every endpoint rooted at one base URL
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            indexing_base: format!("{}/v3/urlNotifications", base),
            webmasters_base: format!("{}/webmasters/v3", base),
            url_inspection_url: format!("{}/v1/urlInspection/index:inspect", base),
        }
    }
}

// =============================================================================
// Indexing API
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    UrlUpdated,
    UrlDeleted,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::UrlUpdated => write!(f, "URL_UPDATED"),
            NotificationType::UrlDeleted => write!(f, "URL_DELETED"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NotificationRequest<'a> {
    pub url: &'a str,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEntry {
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
    #[serde(default)]
    pub notify_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlNotificationMetadata {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub latest_update: Option<NotificationEntry>,
    #[serde(default)]
    pub latest_remove: Option<NotificationEntry>,
}

/// Publish/metadata response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingResponse {
    pub url_notification_metadata: UrlNotificationMetadata,
}

/// Per-URL result of one publish/remove request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingOutcome {
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<IndexingResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingFailure {
    pub url: String,
    pub error: String,
}

/// Partition of a URL batch into successes and failures, in input order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchIndexingResult {
    pub successful: Vec<String>,
    pub failed: Vec<IndexingFailure>,
    pub total_requests: usize,
    /// successful / total, 0 for an empty batch
    pub success_rate: f64,
    #[serde(default)]
    pub cancelled: bool,
}

impl BatchIndexingResult {
    pub fn finish(mut self) -> Self {
        self.total_requests = self.successful.len() + self.failed.len();
        self.success_rate = if self.total_requests == 0 {
            0.0
        } else {
            self.successful.len() as f64 / self.total_requests as f64
        };
        self
    }
}

// =============================================================================
// Search Console
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Date,
    Query,
    Page,
    Country,
    Device,
    SearchAppearance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    IncludingRegex,
    ExcludingRegex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionFilter {
    pub dimension: Dimension,
    pub operator: FilterOperator,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionFilterGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    pub filters: Vec<DimensionFilter>,
}

impl DimensionFilterGroup {
    /// Single filter on the `page` dimension
    pub fn page(operator: FilterOperator, expression: impl Into<String>) -> Self {
        Self {
            group_type: None,
            filters: vec![DimensionFilter {
                dimension: Dimension::Page,
                operator,
                expression: expression.into(),
            }],
        }
    }
}

/// Search analytics query; dates are `YYYY-MM-DD`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub start_date: String,
    pub end_date: String,
    pub dimensions: Vec<Dimension>,
    pub row_limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_row: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimension_filter_groups: Vec<DimensionFilterGroup>,
}

impl AnalyticsQuery {
    /// Query over `range` with the default row limit
    pub fn new(range: &DateRange, dimensions: Vec<Dimension>) -> Self {
        Self {
            start_date: range.start.clone(),
            end_date: range.end.clone(),
            dimensions,
            row_limit: google::DEFAULT_ROW_LIMIT,
            start_row: None,
            search_type: None,
            dimension_filter_groups: Vec::new(),
        }
    }

    pub fn row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit;
        self
    }

    pub fn filter(mut self, group: DimensionFilterGroup) -> Self {
        self.dimension_filter_groups.push(group);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRow {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub clicks: f64,
    #[serde(default)]
    pub impressions: f64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

impl AnalyticsRow {
    pub fn first_key(&self) -> String {
        self.keys.first().cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    #[serde(default)]
    pub rows: Vec<AnalyticsRow>,
    #[serde(default)]
    pub response_aggregation_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

impl DateRange {
    /// `[today - days, today]` in UTC
    pub fn last_days(days: u32) -> Self {
        let today = chrono::Utc::now().date_naive();
        let start = today - chrono::Duration::days(i64::from(days));
        Self {
            start: start.format("%Y-%m-%d").to_string(),
            end: today.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPerformance {
    pub query: String,
    pub clicks: u64,
    pub impressions: u64,
    pub position: f64,
}

/// Page-level metrics over a date window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePerformance {
    pub url: String,
    pub clicks: u64,
    pub impressions: u64,
    /// Derived from clicks/impressions; 0 when there are no impressions
    pub ctr: f64,
    pub avg_position: f64,
    #[serde(default)]
    pub top_queries: Vec<QueryPerformance>,
    pub date_range: Option<DateRange>,
}

impl PagePerformance {
    /// Metrics with CTR derived from clicks and impressions
    pub fn new(url: impl Into<String>, clicks: u64, impressions: u64, avg_position: f64) -> Self {
        Self {
            url: url.into(),
            clicks,
            impressions,
            ctr: derive_ctr(clicks, impressions),
            avg_position,
            top_queries: Vec::new(),
            date_range: None,
        }
    }

    /// CTR recomputed from the counts; the reported value is not trusted
    pub fn effective_ctr(&self) -> f64 {
        derive_ctr(self.clicks, self.impressions)
    }
}

pub fn derive_ctr(clicks: u64, impressions: u64) -> f64 {
    if impressions == 0 {
        0.0
    } else {
        clicks as f64 / impressions as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    Neutral,
    Fail,
    #[serde(other)]
    VerdictUnspecified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatusResult {
    pub verdict: Option<Verdict>,
    #[serde(default)]
    pub coverage_state: Option<String>,
    #[serde(default)]
    pub robots_txt_state: Option<String>,
    #[serde(default)]
    pub indexing_state: Option<String>,
    #[serde(default)]
    pub last_crawl_time: Option<String>,
    #[serde(default)]
    pub page_fetch_state: Option<String>,
    #[serde(default)]
    pub google_canonical: Option<String>,
    #[serde(default)]
    pub user_canonical: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileUsabilityIssue {
    #[serde(default)]
    pub issue_type: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileUsabilityResult {
    pub verdict: Option<Verdict>,
    #[serde(default)]
    pub issues: Vec<MobileUsabilityIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedItems {
    #[serde(default)]
    pub rich_result_type: String,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichResultsResult {
    pub verdict: Option<Verdict>,
    #[serde(default)]
    pub detected_items: Vec<DetectedItems>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionResult {
    #[serde(default)]
    pub index_status_result: Option<IndexStatusResult>,
    #[serde(default)]
    pub mobile_usability_result: Option<MobileUsabilityResult>,
    #[serde(default)]
    pub rich_results_result: Option<RichResultsResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlInspection {
    pub url: String,
    pub inspection_result: InspectionResult,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InspectionResponse {
    #[serde(default)]
    pub inspection_result: InspectionResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub site_url: String,
    #[serde(default)]
    pub permission_level: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SiteList {
    #[serde(default)]
    pub site_entry: Vec<Site>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyTotals {
    pub key: String,
    pub clicks: u64,
    pub impressions: u64,
}

/// Aggregate site metrics; no classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSummary {
    pub total_clicks: u64,
    pub total_impressions: u64,
    pub avg_ctr: f64,
    pub avg_position: f64,
    pub top_pages: Vec<KeyTotals>,
    pub top_queries: Vec<KeyTotals>,
    pub date_range: DateRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_success_rate() {
        let result = BatchIndexingResult {
            successful: vec!["a".into(), "c".into()],
            failed: vec![IndexingFailure {
                url: "b".into(),
                error: "403".into(),
            }],
            ..Default::default()
        }
        .finish();
        assert_eq!(result.total_requests, 3);
        assert!((result.success_rate - 2.0 / 3.0).abs() < 1e-12);

        let empty = BatchIndexingResult::default().finish();
        assert_eq!(empty.success_rate, 0.0);
        assert!(!empty.success_rate.is_nan());
    }

    #[test]
    fn test_ctr_derived() {
        assert_eq!(PagePerformance::new("u", 5, 0, 0.0).ctr, 0.0);
        assert!((PagePerformance::new("u", 50, 500, 3.0).ctr - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_query_serializes_like_the_api() {
        let range = DateRange {
            start: "2024-01-01".into(),
            end: "2024-01-29".into(),
        };
        let query = AnalyticsQuery::new(&range, vec![Dimension::Page])
            .filter(DimensionFilterGroup::page(FilterOperator::Equals, "https://x.test/a"));
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["startDate"], "2024-01-01");
        assert_eq!(value["rowLimit"], 1000);
        assert_eq!(value["dimensions"][0], "page");
        assert_eq!(value["dimensionFilterGroups"][0]["filters"][0]["operator"], "equals");
    }

    #[test]
    fn test_unknown_verdict_tolerated() {
        let status: IndexStatusResult =
            serde_json::from_str(r#"{"verdict": "SOMETHING_NEW"}"#).unwrap();
        assert_eq!(status.verdict, Some(Verdict::VerdictUnspecified));
    }

    #[test]
    fn test_date_range_window() {
        let range = DateRange::last_days(28);
        assert_eq!(range.start.len(), 10);
        assert!(range.start < range.end);
    }
}
