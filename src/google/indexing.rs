//! Indexing API Client
//!
//! Publishes URL_UPDATED / URL_DELETED notifications and reads notification
//! metadata. Batches run sequentially with a delay between requests to stay
//! under the publish burst quota.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use url::Url;

use super::auth::CredentialedClient;
use super::credentials::ServiceCredential;
use super::types::{
    BatchIndexingResult, GoogleEndpoints, IndexingFailure, IndexingOutcome, IndexingResponse,
    NotificationRequest, NotificationType,
};
use crate::ai::retry::RetryPolicy;
use crate::constants::{auth, google};
use crate::types::{CANCELLED_BEFORE_START, CancelSignal, Result, SeoError};

/// Progress callback: `(completed, total)`
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Knobs for [`IndexingClient::batch_index`]
#[derive(Clone)]
pub struct BatchIndexOptions {
    /// Pause between consecutive requests
    pub delay: Duration,
    pub on_progress: Option<ProgressFn>,
    pub cancel: Option<CancelSignal>,
}

impl Default for BatchIndexOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(google::BATCH_DELAY_MS),
            on_progress: None,
            cancel: None,
        }
    }
}

impl std::fmt::Debug for BatchIndexOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchIndexOptions")
            .field("delay", &self.delay)
            .field("on_progress", &self.on_progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl BatchIndexOptions {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelSignal::is_cancelled)
    }
}

/// Client for the Indexing API
#[derive(Debug)]
pub struct IndexingClient {
    api: CredentialedClient,
    base: String,
}

impl IndexingClient {
    pub fn new(
        credential: Option<Arc<ServiceCredential>>,
        http: reqwest::Client,
        endpoints: &GoogleEndpoints,
    ) -> Self {
        Self {
            api: CredentialedClient::new(credential, auth::INDEXING_SCOPE, http),
            base: endpoints.indexing_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.api = self.api.with_retry(retry);
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.api.tokens().has_credential()
    }

    /// Publish one notification
    pub async fn notify(&self, url: &str, kind: NotificationType) -> Result<IndexingResponse> {
        validate_url(url)?;
        let endpoint = format!("{}:publish", self.base);
        let body = NotificationRequest {
            url,
            notification_type: kind,
        };
        debug!(url, kind = %kind, "Publishing URL notification");

        self.api
            .send_json(
                "indexing.publish",
                |http, token| http.post(&endpoint).bearer_auth(token).json(&body),
                indexing_error,
            )
            .await
    }

    /// Like [`notify`](Self::notify), but folds failures into the outcome
    pub async fn notify_outcome(&self, url: &str, kind: NotificationType) -> IndexingOutcome {
        match self.notify(url, kind).await {
            Ok(response) => IndexingOutcome {
                url: url.to_string(),
                success: true,
                response: Some(response),
                error: None,
            },
            Err(e) => IndexingOutcome {
                url: url.to_string(),
                success: false,
                response: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub async fn index_url(&self, url: &str) -> Result<IndexingResponse> {
        self.notify(url, NotificationType::UrlUpdated).await
    }

    pub async fn remove_url(&self, url: &str) -> Result<IndexingResponse> {
        self.notify(url, NotificationType::UrlDeleted).await
    }

    /// Latest notifications Google has recorded for `url`
    pub async fn get_status(&self, url: &str) -> Result<IndexingResponse> {
        validate_url(url)?;
        let mut endpoint = Url::parse(&format!("{}/metadata", self.base))
            .map_err(|e| SeoError::Config(format!("invalid indexing endpoint: {}", e)))?;
        endpoint.query_pairs_mut().append_pair("url", url);

        self.api
            .send_json(
                "indexing.metadata",
                |http, token| http.get(endpoint.clone()).bearer_auth(token),
                indexing_error,
            )
            .await
    }

    /// Request indexing for every URL, one at a time
    ///
    /// Failures are recorded per URL and never stop the batch. Once the
    /// cancel signal trips, the remaining URLs are recorded as failed without
    /// being sent.
    #[instrument(skip(self, urls, options), fields(total = urls.len()))]
    pub async fn batch_index(
        &self,
        urls: &[String],
        options: &BatchIndexOptions,
    ) -> BatchIndexingResult {
        let total = urls.len();
        let mut result = BatchIndexingResult::default();

        for (i, url) in urls.iter().enumerate() {
            if i > 0 && !options.delay.is_zero() {
                tokio::time::sleep(options.delay).await;
            }

            if options.is_cancelled() {
                warn!(remaining = total - i, "Batch cancelled, skipping remaining URLs");
                result.cancelled = true;
                result
                    .failed
                    .extend(urls[i..].iter().map(|url| IndexingFailure {
                        url: url.clone(),
                        error: CANCELLED_BEFORE_START.to_string(),
                    }));
                break;
            }

            match self.index_url(url).await {
                Ok(_) => result.successful.push(url.clone()),
                Err(e) => {
                    warn!(url = %url, error = %e, "Indexing request failed");
                    result.failed.push(IndexingFailure {
                        url: url.clone(),
                        error: e.to_string(),
                    });
                }
            }

            if let Some(callback) = &options.on_progress {
                callback(i + 1, total);
            }
        }

        let result = result.finish();
        info!(
            successful = result.successful.len(),
            failed = result.failed.len(),
            success_rate = result.success_rate,
            "Batch indexing complete"
        );
        result
    }
}

fn indexing_error(status: u16, body: String) -> SeoError {
    SeoError::IndexingRequestFailed { status, body }
}

fn validate_url(url: &str) -> Result<()> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(SeoError::InvalidInput(format!("not an absolute http(s) URL: {}", url))),
    }
}
