//! Generation Pipeline
//!
//! Drives units of work through strategy, content, render and persist, then
//! optionally submits the pages for indexing and classifies their search
//! performance.
//!
//! ## Flow
//!
//! ```text
//! generate_batch
//!   └─ for each unit (sequential, delayed, cancellable)
//!        architect → writer → render + store      → GenerationResult
//!   └─ request_indexing (successful URLs, when enabled)
//! run_feedback_loop (separate call, after pages had time to be crawled)
//! ```
//!
//! One unit's failure is recorded in its [`GenerationResult`] and never stops
//! the batch.

pub mod agents;
pub mod events;
pub mod render;
pub mod setup;
pub mod sink;
pub mod slug;
pub mod status;
pub mod types;

pub use agents::{ArchitectAgent, WriterAgent};
pub use events::{ObserverList, PipelineEvent, PipelineObserver};
pub use render::{HtmlRenderer, RenderContext, Renderer};
pub use setup::SetupOptions;
pub use sink::{ArtifactMetadata, FileSink, PersistenceSink, StoredArtifact};
pub use slug::{is_valid_slug, slugify};
pub use status::{PipelinePhase, Progress, RunStatus, StatusTracker};
pub use types::*;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::ai::{TextGenerationClient, TimeoutConfig, with_timeout};
use crate::constants::{google, pipeline as defaults};
use crate::google::{
    BatchIndexOptions, BatchIndexingResult, FeedbackLoopResult, IndexingClient,
    SearchConsoleClient,
};
use crate::types::{CANCELLED_BEFORE_START, CancelSignal, Result, SeoError};

/// Site and pacing settings for a pipeline
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub base_url: String,
    pub site_name: String,
    /// Pause between consecutive units
    pub delay_between_units: Duration,
    /// Submit successful pages to the Indexing API after a batch
    pub index_after_generation: bool,
    /// Pause between Indexing API requests
    pub batch_delay: Duration,
}

impl PipelineSettings {
    pub fn new(base_url: impl Into<String>, site_name: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            site_name: site_name.into(),
            delay_between_units: Duration::from_millis(defaults::DELAY_BETWEEN_UNITS_MS),
            index_after_generation: false,
            batch_delay: Duration::from_millis(google::BATCH_DELAY_MS),
        }
    }

    pub fn page_url(&self, slug: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), slug)
    }
}

/// Everything a successful unit produced
struct UnitOutput {
    brief: StrategyBrief,
    page: LandingPage,
    stored: StoredArtifact,
}

pub struct Pipeline {
    settings: PipelineSettings,
    architect: ArchitectAgent,
    writer: WriterAgent,
    renderer: Arc<dyn Renderer>,
    sink: Arc<dyn PersistenceSink>,
    indexing: Option<Arc<IndexingClient>>,
    search_console: Option<Arc<SearchConsoleClient>>,
    observers: ObserverList,
    status: Arc<StatusTracker>,
    timeouts: TimeoutConfig,
    cancel: CancelSignal,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", &self.settings)
            .field("indexing", &self.indexing.is_some())
            .field("search_console", &self.search_console.is_some())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        client: TextGenerationClient,
        sink: Arc<dyn PersistenceSink>,
    ) -> Self {
        Self {
            settings,
            architect: ArchitectAgent::new(client.clone()),
            writer: WriterAgent::new(client),
            renderer: Arc::new(HtmlRenderer::default()),
            sink,
            indexing: None,
            search_console: None,
            observers: ObserverList::default(),
            status: Arc::new(StatusTracker::default()),
            timeouts: TimeoutConfig::default(),
            cancel: CancelSignal::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_indexing(mut self, client: Arc<IndexingClient>) -> Self {
        self.indexing = Some(client);
        self
    }

    pub fn with_search_console(mut self, client: Arc<SearchConsoleClient>) -> Self {
        self.search_console = Some(client);
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Signal that stops the pipeline from launching further work
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    pub fn indexing(&self) -> Option<&Arc<IndexingClient>> {
        self.indexing.as_ref()
    }

    pub fn search_console(&self) -> Option<&Arc<SearchConsoleClient>> {
        self.search_console.as_ref()
    }

    /// Register an observer for every subsequent event
    pub fn on_event(&self, observer: impl PipelineObserver + 'static) {
        self.observers.register(Arc::new(observer));
    }

    pub fn status(&self) -> RunStatus {
        self.status.snapshot()
    }

    pub fn status_tracker(&self) -> Arc<StatusTracker> {
        Arc::clone(&self.status)
    }

    /// Slugs of the pages currently held by the sink
    pub async fn generated_pages(&self) -> Result<Vec<String>> {
        self.sink.list().await
    }

    /// Generate, render and store one page
    ///
    /// Never fails: errors end up in the returned result.
    pub async fn generate_unit(&self, unit: &GenerationUnit) -> GenerationResult {
        let slug = unit.resolved_slug();
        self.start_unit(unit, &slug, 0, 1);
        let result = self.run_unit(unit, &slug).await;
        self.status.finish();
        result
    }

    /// Generate every unit in order
    ///
    /// Units run one at a time with a pause in between. Duplicate slugs get a
    /// numeric suffix. Once the cancel signal trips, remaining units are
    /// recorded as failed without being started.
    #[instrument(skip(self, units), fields(total = units.len()))]
    pub async fn generate_batch(&self, units: &[GenerationUnit]) -> BatchResult {
        let started = Instant::now();
        let total = units.len();
        self.emit(PipelineEvent::Start { total_units: total });

        let mut taken = HashSet::with_capacity(total);
        let slugs: Vec<String> = units
            .iter()
            .map(|unit| slug::claim_unique(&mut taken, unit.resolved_slug()))
            .collect();

        let mut results = Vec::with_capacity(total);
        let mut cancelled = false;

        for (i, unit) in units.iter().enumerate() {
            if i > 0 && !self.settings.delay_between_units.is_zero() {
                tokio::time::sleep(self.settings.delay_between_units).await;
            }

            if self.cancel.is_cancelled() {
                warn!(remaining = total - i, "Batch cancelled, skipping remaining units");
                cancelled = true;
                results.extend(units[i..].iter().zip(&slugs[i..]).map(|(unit, slug)| {
                    GenerationResult::failed(
                        unit,
                        slug,
                        &self.settings.page_url(slug),
                        PhaseTimings::default(),
                        CANCELLED_BEFORE_START,
                    )
                }));
                break;
            }

            let slug = &slugs[i];
            self.start_unit(unit, slug, i, total);
            results.push(self.run_unit(unit, slug).await);
        }

        let mut batch = BatchResult::from_results(results, elapsed_ms(started), cancelled);

        if self.settings.index_after_generation && batch.successful > 0 {
            match self.request_indexing(&batch.successful_urls()).await {
                Ok(indexing) => batch.indexing_result = Some(indexing),
                Err(e) => warn!(error = %e, "Automatic indexing skipped"),
            }
        }

        let total_ms = elapsed_ms(started);
        self.emit(PipelineEvent::Complete {
            successful: batch.successful,
            failed: batch.failed,
            total_ms,
        });
        self.status.finish();

        info!(
            successful = batch.successful,
            failed = batch.failed,
            cancelled,
            total_ms,
            "Batch complete"
        );
        batch
    }

    /// Submit `urls` to the Indexing API
    pub async fn request_indexing(&self, urls: &[String]) -> Result<BatchIndexingResult> {
        let client = self.indexing.as_ref().ok_or_else(|| {
            SeoError::Config("indexing is not configured (no service account)".to_string())
        })?;

        self.status.set_phase(PipelinePhase::Indexing);
        self.status.set_progress(0, urls.len());
        self.emit(PipelineEvent::IndexingStart { total: urls.len() });

        let status = Arc::clone(&self.status);
        let options = BatchIndexOptions::default()
            .with_delay(self.settings.batch_delay)
            .with_cancel(self.cancel.clone())
            .on_progress(move |done, total| status.set_progress(done, total));
        let result = client.batch_index(urls, &options).await;

        self.emit(PipelineEvent::IndexingComplete {
            successful: result.successful.len(),
            failed: result.failed.len(),
            success_rate: result.success_rate,
        });
        self.status.finish();
        Ok(result)
    }

    /// Fetch metrics for `urls` and classify each page
    pub async fn run_feedback_loop(&self, urls: &[String]) -> Result<FeedbackLoopResult> {
        let client = self.search_console.as_ref().ok_or_else(|| {
            SeoError::Config("Search Console is not configured (no service account)".to_string())
        })?;

        self.status.set_phase(PipelinePhase::Feedback);
        self.status.set_progress(0, urls.len());
        self.emit(PipelineEvent::FeedbackStart { total: urls.len() });

        let analyses = client.analyze_pages(urls, Some(&self.cancel)).await;
        let result = FeedbackLoopResult::from_analyses(analyses);

        self.status.set_progress(result.pages_analyzed, urls.len());
        self.emit(PipelineEvent::FeedbackComplete {
            summary: result.summary,
        });
        self.status.finish();
        Ok(result)
    }

    fn start_unit(&self, unit: &GenerationUnit, slug: &str, index: usize, total: usize) {
        self.status.start_unit(&unit.label, index + 1, total);
        self.emit(PipelineEvent::UnitStart {
            index,
            total,
            label: unit.label.clone(),
            slug: slug.to_string(),
        });
    }

    async fn run_unit(&self, unit: &GenerationUnit, slug: &str) -> GenerationResult {
        let started = Instant::now();
        let url = self.settings.page_url(slug);
        let mut timing = PhaseTimings::default();

        match self.produce(unit, slug, &url, &mut timing).await {
            Ok(output) => {
                timing.total_ms = elapsed_ms(started);
                info!(slug, total_ms = timing.total_ms, "Unit complete");
                self.emit(PipelineEvent::UnitComplete {
                    slug: slug.to_string(),
                    url: url.clone(),
                    total_ms: timing.total_ms,
                });
                GenerationResult {
                    label: unit.label.clone(),
                    slug: slug.to_string(),
                    url,
                    success: true,
                    stored_id: Some(output.stored.id),
                    output_path: output.stored.path,
                    timing,
                    error: None,
                    brief: Some(output.brief),
                    page: Some(output.page),
                }
            }
            Err((phase, cause)) => {
                timing.total_ms = elapsed_ms(started);
                let error = SeoError::unit_failed(&unit.label, phase.name(), cause).to_string();
                warn!(slug, %phase, error = %error, "Unit failed");
                self.status.record_error(error.clone());
                self.emit(PipelineEvent::UnitError {
                    slug: slug.to_string(),
                    phase,
                    error: error.clone(),
                });
                GenerationResult::failed(unit, slug, &url, timing, error)
            }
        }
    }

    async fn produce(
        &self,
        unit: &GenerationUnit,
        slug: &str,
        url: &str,
        timing: &mut PhaseTimings,
    ) -> std::result::Result<UnitOutput, (PipelinePhase, SeoError)> {
        unit.validate().map_err(|e| (PipelinePhase::Architect, e))?;

        let phase_start = Instant::now();
        let brief = self
            .architect
            .plan(unit)
            .await
            .map_err(|e| (PipelinePhase::Architect, e))?;
        timing.architect_ms = self.phase_done(slug, PipelinePhase::Architect, phase_start);

        self.status.set_phase(PipelinePhase::Writer);
        let phase_start = Instant::now();
        let related = self.link_targets(slug).await;
        let page = self
            .writer
            .write(&brief, slug, &related)
            .await
            .map_err(|e| (PipelinePhase::Writer, e))?;
        timing.writer_ms = self.phase_done(slug, PipelinePhase::Writer, phase_start);

        self.status.set_phase(PipelinePhase::Render);
        let phase_start = Instant::now();
        let stored = self
            .render_and_store(unit, &brief, &page, url)
            .await
            .map_err(|e| (PipelinePhase::Render, e))?;
        timing.render_ms = self.phase_done(slug, PipelinePhase::Render, phase_start);

        Ok(UnitOutput {
            brief,
            page,
            stored,
        })
    }

    async fn render_and_store(
        &self,
        unit: &GenerationUnit,
        brief: &StrategyBrief,
        page: &LandingPage,
        url: &str,
    ) -> Result<StoredArtifact> {
        let ctx = RenderContext {
            site_name: self.settings.site_name.clone(),
            base_url: self.settings.base_url.clone(),
            url: url.to_string(),
        };
        let html = self.renderer.render(page, brief, &ctx)?;

        let metadata = ArtifactMetadata {
            slug: page.slug.clone(),
            url: url.to_string(),
            label: unit.label.clone(),
            meta_title: page.meta.meta_title.clone(),
            meta_description: page.meta.meta_description.clone(),
            keywords: brief.keywords.clone(),
            target_word_count: brief.target_word_count,
            generated_at: brief.generated_at,
            page: page.clone(),
        };

        with_timeout(
            self.timeouts.sink_write,
            self.sink.store(&page.slug, &html, &metadata),
            "store page",
        )
        .await
    }

    /// Pages already held by the sink, so links never point at a page that
    /// failed or was never started
    async fn link_targets(&self, slug: &str) -> Vec<String> {
        match self.sink.list().await {
            Ok(mut slugs) => {
                slugs.retain(|s| s != slug);
                slugs
            }
            Err(e) => {
                warn!(error = %e, "Cannot list stored pages, skipping internal links");
                Vec::new()
            }
        }
    }

    fn phase_done(&self, slug: &str, phase: PipelinePhase, started: Instant) -> u64 {
        let elapsed_ms = elapsed_ms(started);
        self.emit(PipelineEvent::PhaseComplete {
            slug: slug.to_string(),
            phase,
            elapsed_ms,
        });
        elapsed_ms
    }

    fn emit(&self, event: PipelineEvent) {
        self.observers.emit(&event);
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{FixtureProvider, FixtureReply, Provider, RetryPolicy};
    use crate::constants::tags;
    use crate::google::test_support::credential_json;
    use crate::google::{GoogleEndpoints, ServiceCredential};
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Renders normally except for one slug
    struct FailingRenderer {
        slug: &'static str,
    }

    impl Renderer for FailingRenderer {
        fn render(
            &self,
            page: &LandingPage,
            brief: &StrategyBrief,
            ctx: &RenderContext,
        ) -> Result<String> {
            if page.slug == self.slug {
                return Err(SeoError::Render("template exploded".to_string()));
            }
            HtmlRenderer::default().render(page, brief, ctx)
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            delay_between_units: Duration::ZERO,
            batch_delay: Duration::ZERO,
            ..PipelineSettings::new("https://site.test", "Forge")
        }
    }

    fn fixture_client(fixture: FixtureProvider) -> TextGenerationClient {
        TextGenerationClient::new(Provider::Fixture(fixture))
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)))
    }

    fn pipeline(dir: &TempDir, settings: PipelineSettings) -> Pipeline {
        Pipeline::new(
            settings,
            fixture_client(FixtureProvider::landing_page_defaults()),
            Arc::new(FileSink::new(dir.path())),
        )
    }

    fn units() -> Vec<GenerationUnit> {
        vec![
            GenerationUnit::new("Dental clinic", "clinic owners", "empty calendar"),
            GenerationUnit::new("Beauty salon", "salon owners", "no-shows"),
            GenerationUnit::new("Veterinary clinic", "vets", "price shoppers"),
        ]
    }

    fn record_events(pipeline: &Pipeline) -> Arc<Mutex<Vec<PipelineEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        pipeline.on_event(move |event: &PipelineEvent| -> anyhow::Result<()> {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        });
        events
    }

    fn kinds(events: &Mutex<Vec<PipelineEvent>>) -> Vec<&'static str> {
        events.lock().unwrap().iter().map(|e| e.kind()).collect()
    }

    #[tokio::test]
    async fn test_generate_unit_writes_page() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, settings());
        let events = record_events(&pipeline);

        let result = pipeline.generate_unit(&units()[0]).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.slug, "dental-clinic");
        assert_eq!(result.url, "https://site.test/dental-clinic");
        assert_eq!(result.stored_id.as_deref(), Some("dental-clinic"));
        assert!(result.brief.is_some() && result.page.is_some());
        assert!(result.timing.total_ms >= result.timing.architect_ms);

        let html = std::fs::read_to_string(dir.path().join("dental-clinic.html")).unwrap();
        assert!(html.contains("<link rel=\"canonical\" href=\"https://site.test/dental-clinic\">"));
        assert_eq!(
            kinds(&events),
            vec![
                "unit_start",
                "phase_complete",
                "phase_complete",
                "phase_complete",
                "unit_complete"
            ]
        );

        let status = pipeline.status();
        assert_eq!(status.phase, PipelinePhase::Complete);
        assert_eq!(status.current_unit, None);
        assert_eq!(status.progress.percentage, 100);
    }

    #[tokio::test]
    async fn test_generate_unit_failure_still_finishes_run() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, settings())
            .with_renderer(Arc::new(FailingRenderer { slug: "dental-clinic" }));

        let result = pipeline.generate_unit(&units()[0]).await;

        assert!(!result.success);
        let status = pipeline.status();
        assert_eq!(status.phase, PipelinePhase::Complete);
        assert_eq!(status.last_error, result.error);
    }

    #[tokio::test]
    async fn test_internal_links_only_target_stored_pages() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, settings())
            .with_renderer(Arc::new(FailingRenderer { slug: "beauty-salon" }));
        let units = vec![
            GenerationUnit::new("Beauty salon", "salon owners", "no-shows"),
            GenerationUnit::new("Veterinary clinic", "vets", "price shoppers"),
            GenerationUnit::new("Dental clinic", "clinic owners", "empty calendar"),
        ];

        let batch = pipeline.generate_batch(&units).await;

        assert!(!batch.results[0].success);
        let links = |i: usize| -> Vec<String> {
            batch.results[i]
                .page
                .as_ref()
                .unwrap()
                .internal_links
                .iter()
                .map(|l| l.slug.clone())
                .collect()
        };
        // Nothing stored yet when the veterinary page was written
        assert!(links(1).is_empty());
        // The failed salon page is offered by the model but never linked
        assert_eq!(links(2), vec!["veterinary-clinic"]);
    }

    #[tokio::test]
    async fn test_render_failure_is_isolated_to_one_unit() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, settings())
            .with_renderer(Arc::new(FailingRenderer { slug: "beauty-salon" }));
        let events = record_events(&pipeline);

        let batch = pipeline.generate_batch(&units()).await;

        assert_eq!(batch.total_pages, 3);
        assert_eq!(batch.successful, 2);
        assert_eq!(batch.failed, 1);
        assert!(!batch.cancelled);

        let failed = &batch.results[1];
        assert!(!failed.success);
        assert_eq!(failed.slug, "beauty-salon");
        let error = failed.error.as_deref().unwrap();
        assert!(error.contains("render"), "{error}");
        assert!(error.contains("template exploded"), "{error}");
        assert!(batch.results[2].success);

        let events = events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::UnitError { slug, phase: PipelinePhase::Render, .. } if slug == "beauty-salon"
        )));
        assert!(matches!(
            events.last(),
            Some(PipelineEvent::Complete { successful: 2, failed: 1, .. })
        ));
        drop(events);

        assert_eq!(
            pipeline.generated_pages().await.unwrap(),
            vec!["dental-clinic", "veterinary-clinic"]
        );
    }

    #[tokio::test]
    async fn test_generation_failure_records_architect_phase() {
        let dir = TempDir::new().unwrap();
        let fixture = FixtureProvider::landing_page_defaults();
        fixture.push(tags::ARCHITECT_KEYWORDS, [FixtureReply::text("not json at all")]);
        let pipeline = Pipeline::new(settings(), fixture_client(fixture), Arc::new(FileSink::new(dir.path())));

        let batch = pipeline.generate_batch(&units()[..2]).await;

        assert!(batch.results[0].success);
        assert!(!batch.results[1].success);
        assert!(batch.results[1].error.as_deref().unwrap().contains("architect"));
        assert_eq!(pipeline.status().last_error, batch.results[1].error);
    }

    #[tokio::test]
    async fn test_broken_observers_do_not_break_the_run() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, settings());
        pipeline.on_event(|_: &PipelineEvent| -> anyhow::Result<()> {
            panic!("observer exploded")
        });
        pipeline.on_event(|_: &PipelineEvent| -> anyhow::Result<()> {
            anyhow::bail!("observer refused")
        });
        let events = record_events(&pipeline);

        let batch = pipeline.generate_batch(&units()[..1]).await;

        assert_eq!(batch.successful, 1);
        assert_eq!(kinds(&events).first(), Some(&"start"));
        assert_eq!(kinds(&events).last(), Some(&"complete"));
    }

    #[tokio::test]
    async fn test_cancel_stops_launching_units() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelSignal::new();
        let pipeline = pipeline(&dir, settings()).with_cancel(cancel.clone());
        pipeline.on_event(move |event: &PipelineEvent| -> anyhow::Result<()> {
            if matches!(event, PipelineEvent::UnitComplete { .. }) {
                cancel.cancel();
            }
            Ok(())
        });

        let batch = pipeline.generate_batch(&units()).await;

        assert!(batch.cancelled);
        assert_eq!(batch.total_pages, 3);
        assert!(batch.results[0].success);
        for result in &batch.results[1..] {
            assert!(!result.success);
            assert_eq!(result.error.as_deref(), Some(CANCELLED_BEFORE_START));
        }
        assert_eq!(batch.results[2].slug, "veterinary-clinic");
        assert_eq!(pipeline.generated_pages().await.unwrap(), vec!["dental-clinic"]);
    }

    #[tokio::test]
    async fn test_duplicate_labels_get_unique_slugs() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, settings());
        let unit = GenerationUnit::new("Dental clinic", "owners", "empty calendar");

        let batch = pipeline.generate_batch(&[unit.clone(), unit]).await;

        let slugs: Vec<_> = batch.results.iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(slugs, vec!["dental-clinic", "dental-clinic-2"]);
        assert_eq!(batch.successful, 2);
    }

    #[tokio::test]
    async fn test_status_progression() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, settings());
        let tracker = pipeline.status_tracker();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        pipeline.on_event(move |event: &PipelineEvent| -> anyhow::Result<()> {
            if let PipelineEvent::UnitStart { .. } = event {
                let status = tracker.snapshot();
                sink.lock().unwrap().push((status.phase, status.progress.percentage));
            }
            Ok(())
        });

        assert_eq!(pipeline.status().phase, PipelinePhase::Idle);
        pipeline.generate_batch(&units()[..2]).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(PipelinePhase::Architect, 50), (PipelinePhase::Architect, 100)]
        );
        let status = pipeline.status();
        assert_eq!(status.phase, PipelinePhase::Complete);
        assert_eq!(status.current_unit, None);
    }

    #[tokio::test]
    async fn test_successful_pages_are_indexed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "idx-token",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v3/urlNotifications:publish"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "urlNotificationMetadata": {"url": "https://site.test/x"}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let credential =
            ServiceCredential::from_json(&credential_json(&format!("{}/token", server.uri())))
                .unwrap();
        let indexing = IndexingClient::new(
            Some(Arc::new(credential)),
            reqwest::Client::new(),
            &GoogleEndpoints::rooted_at(&server.uri()),
        );

        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(
            &dir,
            PipelineSettings {
                index_after_generation: true,
                ..settings()
            },
        )
        .with_renderer(Arc::new(FailingRenderer { slug: "beauty-salon" }))
        .with_indexing(Arc::new(indexing));
        let events = record_events(&pipeline);

        let batch = pipeline.generate_batch(&units()).await;

        let indexing = batch.indexing_result.unwrap();
        assert_eq!(
            indexing.successful,
            vec!["https://site.test/dental-clinic", "https://site.test/veterinary-clinic"]
        );
        assert!(indexing.failed.is_empty());
        assert_eq!(indexing.success_rate, 1.0);

        let kinds = kinds(&events);
        let start = kinds.iter().position(|k| *k == "indexing_start").unwrap();
        let done = kinds.iter().position(|k| *k == "indexing_complete").unwrap();
        assert!(start < done);
        assert_eq!(kinds.last(), Some(&"complete"));
    }

    #[tokio::test]
    async fn test_indexing_without_client_is_config_error() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, settings());
        let err = pipeline
            .request_indexing(&["https://site.test/a".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, SeoError::Config(_)));
        assert!(pipeline.run_feedback_loop(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_feedback_loop_classifies_pages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gsc-token",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/webmasters/v3/sites/[^/]+/searchAnalytics/query$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
            .mount(&server)
            .await;

        let credential =
            ServiceCredential::from_json(&credential_json(&format!("{}/token", server.uri())))
                .unwrap();
        let search_console = SearchConsoleClient::new(
            Some(Arc::new(credential)),
            reqwest::Client::new(),
            &GoogleEndpoints::rooted_at(&server.uri()),
            "https://site.test/",
        )
        .with_analyze_delay(Duration::ZERO);

        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(&dir, settings()).with_search_console(Arc::new(search_console));
        let events = record_events(&pipeline);

        let result = pipeline
            .run_feedback_loop(&[
                "https://site.test/a".to_string(),
                "https://site.test/b".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(result.pages_analyzed, 2);
        assert_eq!(result.summary.not_indexed, 2);
        assert_eq!(kinds(&events), vec!["feedback_start", "feedback_complete"]);
        assert_eq!(pipeline.status().phase, PipelinePhase::Complete);
    }
}
