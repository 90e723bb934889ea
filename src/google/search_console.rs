//! Search Console Client
//!
//! Search analytics queries, URL inspection, and the per-page health analysis
//! built on top of them.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::auth::CredentialedClient;
use super::credentials::ServiceCredential;
use super::feedback::{FeedbackAnalysis, FeedbackPolicy};
use super::types::{
    AnalyticsQuery, AnalyticsResponse, AnalyticsRow, DateRange, Dimension, DimensionFilterGroup,
    FilterOperator, GoogleEndpoints, InspectionResponse, KeyTotals, PagePerformance,
    QueryPerformance, Site, SiteList, SiteSummary, UrlInspection,
};
use crate::ai::retry::RetryPolicy;
use crate::constants::{auth, google};
use crate::types::{CANCELLED_BEFORE_START, CancelSignal, Result, SeoError};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyticsRequest<'a> {
    site_url: &'a str,
    #[serde(flatten)]
    query: &'a AnalyticsQuery,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectionRequest<'a> {
    inspection_url: &'a str,
    site_url: &'a str,
}

/// Client for one Search Console property
#[derive(Debug)]
pub struct SearchConsoleClient {
    api: CredentialedClient,
    webmasters_base: String,
    inspection_url: String,
    site_url: String,
    policy: FeedbackPolicy,
    analyze_delay: Duration,
    window_days: u32,
}

impl SearchConsoleClient {
    pub fn new(
        credential: Option<Arc<ServiceCredential>>,
        http: reqwest::Client,
        endpoints: &GoogleEndpoints,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            api: CredentialedClient::new(credential, auth::WEBMASTERS_SCOPE, http),
            webmasters_base: endpoints.webmasters_base.trim_end_matches('/').to_string(),
            inspection_url: endpoints.url_inspection_url.clone(),
            site_url: site_url.into(),
            policy: FeedbackPolicy::default(),
            analyze_delay: Duration::from_millis(google::ANALYZE_DELAY_MS),
            window_days: google::DEFAULT_WINDOW_DAYS,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.api = self.api.with_retry(retry);
        self
    }

    pub fn with_policy(mut self, policy: FeedbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_analyze_delay(mut self, delay: Duration) -> Self {
        self.analyze_delay = delay;
        self
    }

    /// Analytics window used by [`analyze_page`](Self::analyze_page)
    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn policy(&self) -> &FeedbackPolicy {
        &self.policy
    }

    pub fn has_credentials(&self) -> bool {
        self.api.tokens().has_credential()
    }

    /// Raw dimensioned analytics query against the configured property
    pub async fn query_analytics(&self, query: &AnalyticsQuery) -> Result<AnalyticsResponse> {
        let endpoint = format!(
            "{}/sites/{}/searchAnalytics/query",
            self.webmasters_base,
            encode_site(&self.site_url)
        );
        let body = AnalyticsRequest {
            site_url: &self.site_url,
            query,
        };
        debug!(
            start = %query.start_date,
            end = %query.end_date,
            dimensions = ?query.dimensions,
            "Querying search analytics"
        );

        self.api
            .send_json(
                "search_console.query",
                |http, token| http.post(&endpoint).bearer_auth(token).json(&body),
                analytics_error,
            )
            .await
    }

    /// Page and top-query metrics for one URL over the last `days`
    pub async fn get_page_performance(&self, url: &str, days: u32) -> Result<PagePerformance> {
        let range = DateRange::last_days(days);
        let only_this_page = DimensionFilterGroup::page(FilterOperator::Equals, url);

        let page = self
            .query_analytics(
                &AnalyticsQuery::new(&range, vec![Dimension::Page]).filter(only_this_page.clone()),
            )
            .await?;
        let queries = self
            .query_analytics(
                &AnalyticsQuery::new(&range, vec![Dimension::Query])
                    .row_limit(google::TOP_ROW_LIMIT)
                    .filter(only_this_page),
            )
            .await?;

        let mut performance = match page.rows.first() {
            Some(row) => PagePerformance::new(url, count(row.clicks), count(row.impressions), row.position),
            None => PagePerformance::new(url, 0, 0, 0.0),
        };
        performance.top_queries = queries
            .rows
            .iter()
            .map(|row| QueryPerformance {
                query: row.first_key(),
                clicks: count(row.clicks),
                impressions: count(row.impressions),
                position: row.position,
            })
            .collect();
        performance.date_range = Some(range);
        Ok(performance)
    }

    /// Index, mobile usability and rich result verdicts for a URL
    pub async fn inspect_url(&self, url: &str) -> Result<UrlInspection> {
        let body = InspectionRequest {
            inspection_url: url,
            site_url: &self.site_url,
        };
        let response: InspectionResponse = self
            .api
            .send_json(
                "search_console.inspect",
                |http, token| {
                    http.post(&self.inspection_url)
                        .bearer_auth(token)
                        .json(&body)
                },
                analytics_error,
            )
            .await?;

        Ok(UrlInspection {
            url: url.to_string(),
            inspection_result: response.inspection_result,
        })
    }

    /// Properties the service account can access
    pub async fn list_sites(&self) -> Result<Vec<Site>> {
        let endpoint = format!("{}/sites", self.webmasters_base);
        let sites: SiteList = self
            .api
            .send_json(
                "search_console.sites",
                |http, token| http.get(&endpoint).bearer_auth(token),
                analytics_error,
            )
            .await?;
        Ok(sites.site_entry)
    }

    /// Metrics for every page whose URL contains `prefix`
    pub async fn pages_under_prefix(&self, prefix: &str, days: u32) -> Result<Vec<PagePerformance>> {
        let range = DateRange::last_days(days);
        let response = self
            .query_analytics(
                &AnalyticsQuery::new(&range, vec![Dimension::Page])
                    .filter(DimensionFilterGroup::page(FilterOperator::Contains, prefix)),
            )
            .await?;

        Ok(response
            .rows
            .iter()
            .map(|row| {
                let mut page = PagePerformance::new(
                    row.first_key(),
                    count(row.clicks),
                    count(row.impressions),
                    row.position,
                );
                page.date_range = Some(range.clone());
                page
            })
            .collect())
    }

    /// Fetch metrics for a page and classify its health
    pub async fn analyze_page(&self, url: &str) -> Result<FeedbackAnalysis> {
        let performance = self
            .get_page_performance(url, self.window_days)
            .await?;
        Ok(self.policy.classify(&performance))
    }

    /// Analyze pages one at a time
    ///
    /// A page whose metrics cannot be fetched is reported as not indexed with
    /// the error as its recommendation.
    #[instrument(skip(self, urls, cancel), fields(total = urls.len()))]
    pub async fn analyze_pages(
        &self,
        urls: &[String],
        cancel: Option<&CancelSignal>,
    ) -> Vec<FeedbackAnalysis> {
        let mut analyses = Vec::with_capacity(urls.len());

        for (i, url) in urls.iter().enumerate() {
            if i > 0 && !self.analyze_delay.is_zero() {
                tokio::time::sleep(self.analyze_delay).await;
            }

            if cancel.is_some_and(CancelSignal::is_cancelled) {
                warn!(remaining = urls.len() - i, "Analysis cancelled");
                analyses.extend(
                    urls[i..]
                        .iter()
                        .map(|url| FeedbackAnalysis::from_error(url.clone(), CANCELLED_BEFORE_START)),
                );
                break;
            }

            match self.analyze_page(url).await {
                Ok(analysis) => {
                    debug!(url = %url, status = %analysis.status, "Page analyzed");
                    analyses.push(analysis);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Page analysis failed");
                    analyses.push(FeedbackAnalysis::from_error(url.clone(), e));
                }
            }
        }

        info!(analyzed = analyses.len(), "Page analysis complete");
        analyses
    }

    /// Site totals plus top pages and queries over the last `days`
    pub async fn get_site_summary(&self, days: u32) -> Result<SiteSummary> {
        let range = DateRange::last_days(days);

        let overall = self
            .query_analytics(&AnalyticsQuery::new(&range, Vec::new()))
            .await?;
        let pages = self
            .query_analytics(
                &AnalyticsQuery::new(&range, vec![Dimension::Page]).row_limit(google::TOP_ROW_LIMIT),
            )
            .await?;
        let queries = self
            .query_analytics(
                &AnalyticsQuery::new(&range, vec![Dimension::Query])
                    .row_limit(google::TOP_ROW_LIMIT),
            )
            .await?;

        let totals = overall.rows.first();
        Ok(SiteSummary {
            total_clicks: totals.map(|r| count(r.clicks)).unwrap_or(0),
            total_impressions: totals.map(|r| count(r.impressions)).unwrap_or(0),
            avg_ctr: totals.map(|r| r.ctr).unwrap_or(0.0),
            avg_position: totals.map(|r| r.position).unwrap_or(0.0),
            top_pages: pages.rows.iter().map(key_totals).collect(),
            top_queries: queries.rows.iter().map(key_totals).collect(),
            date_range: range,
        })
    }
}

fn analytics_error(status: u16, body: String) -> SeoError {
    SeoError::AnalyticsRequestFailed { status, body }
}

/// Property identifiers (`https://...` or `sc-domain:...`) go in the path encoded
fn encode_site(site_url: &str) -> String {
    url::form_urlencoded::byte_serialize(site_url.as_bytes()).collect()
}

fn count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

fn key_totals(row: &AnalyticsRow) -> KeyTotals {
    KeyTotals {
        key: row.first_key(),
        clicks: count(row.clicks),
        impressions: count(row.impressions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::feedback::{HealthStatus, SuggestedAction};
    use crate::google::test_support::credential_json;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::time::Instant;
    use wiremock::matchers::{body_partial_json, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SITE: &str = "https://site.test/";
    const QUERY_PATH: &str = r"^/webmasters/v3/sites/[^/]+/searchAnalytics/query$";

    async fn server_with_token() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gsc-token",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;
        server
    }

    fn client(server: &MockServer) -> SearchConsoleClient {
        let credential =
            ServiceCredential::from_json(&credential_json(&format!("{}/token", server.uri())))
                .unwrap();
        SearchConsoleClient::new(
            Some(Arc::new(credential)),
            reqwest::Client::new(),
            &GoogleEndpoints::rooted_at(&server.uri()),
            SITE,
        )
        .with_retry(RetryPolicy::new(2, Duration::from_millis(1)))
        .with_analyze_delay(Duration::ZERO)
    }

    fn rows(rows: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "rows": rows }))
    }

    async fn mount_page(server: &MockServer, url: &str, page_rows: Value, query_rows: Value) {
        let filter = json!([{ "filters": [{ "expression": url }] }]);
        Mock::given(method("POST"))
            .and(path_regex(QUERY_PATH))
            .and(body_partial_json(json!({
                "dimensions": ["page"],
                "dimensionFilterGroups": filter
            })))
            .respond_with(rows(page_rows))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(QUERY_PATH))
            .and(body_partial_json(json!({
                "dimensions": ["query"],
                "rowLimit": 10,
                "dimensionFilterGroups": filter
            })))
            .respond_with(rows(query_rows))
            .mount(server)
            .await;
    }

    #[test]
    fn test_site_url_encoded_for_path() {
        assert_eq!(encode_site("https://site.test/"), "https%3A%2F%2Fsite.test%2F");
        assert_eq!(encode_site("sc-domain:site.test"), "sc-domain%3Asite.test");
    }

    #[tokio::test]
    async fn test_page_performance_derives_ctr() {
        let server = server_with_token().await;
        let url = "https://site.test/dentist";
        mount_page(
            &server,
            url,
            json!([{ "keys": [url], "clicks": 50.0, "impressions": 500.0, "ctr": 0.9, "position": 7.5 }]),
            json!([
                { "keys": ["dentist near me"], "clicks": 30.0, "impressions": 200.0, "ctr": 0.15, "position": 4.0 },
                { "keys": ["emergency dentist"], "clicks": 20.0, "impressions": 300.0, "ctr": 0.07, "position": 9.0 }
            ]),
        )
        .await;

        let performance = client(&server).get_page_performance(url, 28).await.unwrap();
        assert_eq!(performance.clicks, 50);
        assert_eq!(performance.impressions, 500);
        assert!((performance.ctr - 0.1).abs() < 1e-12);
        assert_eq!(performance.avg_position, 7.5);
        assert_eq!(performance.top_queries.len(), 2);
        assert_eq!(performance.top_queries[0].query, "dentist near me");
        assert!(performance.date_range.is_some());
    }

    #[tokio::test]
    async fn test_page_without_rows_is_not_indexed() {
        let server = server_with_token().await;
        let url = "https://site.test/new";
        mount_page(&server, url, json!([]), json!([])).await;

        let analysis = client(&server).analyze_page(url).await.unwrap();
        assert_eq!(analysis.status, HealthStatus::NotIndexed);
        assert!(analysis.suggested_actions.contains(&SuggestedAction::WaitForIndexing));
    }

    #[tokio::test]
    async fn test_analyze_pages_paces_urls() {
        let server = server_with_token().await;
        let arrivals = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&arrivals);
        Mock::given(method("POST"))
            .and(path_regex(QUERY_PATH))
            .and(body_partial_json(json!({ "dimensions": ["page"] })))
            .respond_with(move |_: &wiremock::Request| {
                seen.lock().unwrap().push(Instant::now());
                rows(json!([]))
            })
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(QUERY_PATH))
            .and(body_partial_json(json!({ "dimensions": ["query"] })))
            .respond_with(rows(json!([])))
            .mount(&server)
            .await;

        let delay = Duration::from_millis(150);
        let client = client(&server).with_analyze_delay(delay);
        // Keep the token exchange out of the measured window
        client.api.get_token().await.unwrap();

        let pages: Vec<String> = ["a", "b", "c"]
            .iter()
            .map(|p| format!("https://site.test/{p}"))
            .collect();
        let started = Instant::now();
        let analyses = client.analyze_pages(&pages, None).await;
        let elapsed = started.elapsed();

        assert_eq!(analyses.len(), 3);
        assert!(elapsed >= delay * 2, "analysis took {elapsed:?}");

        let arrivals = arrivals.lock().unwrap();
        assert!(
            arrivals[0].duration_since(started) < delay,
            "first page was delayed"
        );
        for pair in arrivals.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= delay);
        }
    }

    #[tokio::test]
    async fn test_analyze_pages_isolates_errors() {
        let server = server_with_token().await;
        let good = "https://site.test/good";
        let bad = "https://site.test/bad";
        Mock::given(method("POST"))
            .and(path_regex(QUERY_PATH))
            .and(body_partial_json(json!({
                "dimensionFilterGroups": [{ "filters": [{ "expression": bad }] }]
            })))
            .respond_with(ResponseTemplate::new(403).set_body_string("User does not have sufficient permission"))
            .mount(&server)
            .await;
        mount_page(
            &server,
            good,
            json!([{ "keys": [good], "clicks": 100.0, "impressions": 1000.0, "ctr": 0.1, "position": 5.0 }]),
            json!([]),
        )
        .await;

        let analyses = client(&server)
            .analyze_pages(&[bad.to_string(), good.to_string()], None)
            .await;

        assert_eq!(analyses.len(), 2);
        assert_eq!(analyses[0].url, bad);
        assert_eq!(analyses[0].status, HealthStatus::NotIndexed);
        assert_eq!(analyses[0].recommendations.len(), 1);
        assert!(analyses[0].recommendations[0].contains("403"));
        assert_eq!(analyses[0].suggested_actions, vec![SuggestedAction::Reindex]);
        assert_eq!(analyses[1].status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_analyze_pages_cancelled() {
        let server = MockServer::start().await;
        let cancel = CancelSignal::new();
        cancel.cancel();

        let analyses = client(&server)
            .analyze_pages(&["https://site.test/a".to_string()], Some(&cancel))
            .await;
        assert_eq!(analyses.len(), 1);
        assert!(analyses[0].recommendations[0].contains(CANCELLED_BEFORE_START));
    }

    #[tokio::test]
    async fn test_site_summary_runs_three_queries() {
        let server = server_with_token().await;
        Mock::given(method("POST"))
            .and(path_regex(QUERY_PATH))
            .and(body_partial_json(json!({ "dimensions": ["page"], "rowLimit": 10 })))
            .respond_with(rows(json!([
                { "keys": ["https://site.test/a"], "clicks": 7.0, "impressions": 70.0, "ctr": 0.1, "position": 3.0 }
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(QUERY_PATH))
            .and(body_partial_json(json!({ "dimensions": ["query"], "rowLimit": 10 })))
            .respond_with(rows(json!([
                { "keys": ["seo"], "clicks": 4.0, "impressions": 40.0, "ctr": 0.1, "position": 2.0 }
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(QUERY_PATH))
            .and(body_partial_json(json!({ "dimensions": [], "siteUrl": SITE })))
            .respond_with(rows(json!([
                { "clicks": 12.0, "impressions": 340.0, "ctr": 0.035, "position": 8.2 }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let summary = client(&server).get_site_summary(7).await.unwrap();
        assert_eq!(summary.total_clicks, 12);
        assert_eq!(summary.total_impressions, 340);
        assert_eq!(summary.avg_position, 8.2);
        assert_eq!(summary.top_pages[0].key, "https://site.test/a");
        assert_eq!(summary.top_queries[0].key, "seo");
    }

    #[tokio::test]
    async fn test_inspect_and_list_sites() {
        let server = server_with_token().await;
        Mock::given(method("POST"))
            .and(path("/v1/urlInspection/index:inspect"))
            .and(body_partial_json(json!({
                "inspectionUrl": "https://site.test/a",
                "siteUrl": SITE
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "inspectionResult": {
                    "indexStatusResult": {
                        "verdict": "PASS",
                        "coverageState": "Submitted and indexed",
                        "lastCrawlTime": "2024-05-01T10:00:00Z"
                    },
                    "mobileUsabilityResult": { "verdict": "PASS", "issues": [] }
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/webmasters/v3/sites"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "siteEntry": [{ "siteUrl": SITE, "permissionLevel": "siteOwner" }]
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let inspection = client.inspect_url("https://site.test/a").await.unwrap();
        let status = inspection.inspection_result.index_status_result.unwrap();
        assert_eq!(status.verdict, Some(crate::google::types::Verdict::Pass));
        assert_eq!(status.coverage_state.as_deref(), Some("Submitted and indexed"));

        let sites = client.list_sites().await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].permission_level, "siteOwner");
    }

    #[tokio::test]
    async fn test_pages_under_prefix_uses_contains_filter() {
        let server = server_with_token().await;
        Mock::given(method("POST"))
            .and(path_regex(QUERY_PATH))
            .and(body_partial_json(json!({
                "dimensionFilterGroups": [{ "filters": [{
                    "dimension": "page",
                    "operator": "contains",
                    "expression": "/services/"
                }] }]
            })))
            .respond_with(rows(json!([
                { "keys": ["https://site.test/services/a"], "clicks": 3.0, "impressions": 0.0, "ctr": 0.0, "position": 0.0 },
                { "keys": ["https://site.test/services/b"], "clicks": 9.0, "impressions": 90.0, "ctr": 0.1, "position": 11.0 }
            ])))
            .mount(&server)
            .await;

        let pages = client(&server).pages_under_prefix("/services/", 28).await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].ctr, 0.0);
        assert_eq!(pages[1].impressions, 90);
    }

    #[tokio::test]
    async fn test_upstream_error_keeps_status_and_body() {
        let server = server_with_token().await;
        Mock::given(method("GET"))
            .and(path("/webmasters/v3/sites"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let err = client(&server).list_sites().await.unwrap_err();
        match err {
            SeoError::AnalyticsRequestFailed { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
