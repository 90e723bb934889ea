//! Wiring from [`Config`]
//!
//! Builds the generation client, the Google clients and a ready-to-run
//! [`Pipeline`]. Missing credentials are only fatal for features that are
//! switched on.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{FileSink, Pipeline, PipelineSettings};
use crate::ai::{FixtureProvider, Provider, TextGenerationClient};
use crate::config::{Config, GoogleConfig};
use crate::google::{IndexingClient, SearchConsoleClient, ServiceCredential};
use crate::types::{CancelSignal, Result, SeoError};

/// Switches that come from the command line rather than config files
#[derive(Debug, Clone, Copy, Default)]
pub struct SetupOptions {
    /// Answer every generation step from built-in fixtures
    pub offline: bool,
    /// Index generated pages regardless of `google.indexing_enabled`
    pub index: bool,
}

/// Service account from the configured file, else the configured env var
pub fn load_credential(google: &GoogleConfig) -> Result<Option<Arc<ServiceCredential>>> {
    if let Some(path) = &google.credentials_path {
        debug!(path = %path.display(), "Loading service account from file");
        return ServiceCredential::from_file(path).map(|c| Some(Arc::new(c)));
    }

    match std::env::var(&google.credentials_env) {
        Ok(json) if !json.trim().is_empty() => {
            debug!(var = %google.credentials_env, "Loading service account from environment");
            ServiceCredential::from_json(&json).map(|c| Some(Arc::new(c)))
        }
        _ => Ok(None),
    }
}

/// Like [`load_credential`], but a missing service account is an error
pub fn require_credential(google: &GoogleConfig) -> Result<Arc<ServiceCredential>> {
    load_credential(google)?.ok_or_else(|| {
        SeoError::CredentialsMissing(format!(
            "set google.credentials_path or the {} environment variable",
            google.credentials_env
        ))
    })
}

pub fn text_client(config: &Config, offline: bool) -> Result<TextGenerationClient> {
    let provider = if offline {
        Provider::Fixture(FixtureProvider::landing_page_defaults())
    } else {
        Provider::from_config(&config.llm.provider_config())?
    };
    info!(provider = %provider.kind(), "Text generation provider ready");

    Ok(TextGenerationClient::new(provider)
        .with_retry(config.llm.retry_policy())
        .with_defaults(config.llm.generation_defaults()))
}

pub fn indexing_client(
    config: &Config,
    credential: Option<Arc<ServiceCredential>>,
) -> Result<IndexingClient> {
    let http = config.google.timeouts().google_client()?;
    Ok(
        IndexingClient::new(credential, http, &config.google.endpoints)
            .with_retry(config.google.retry_policy()),
    )
}

pub fn search_console_client(
    config: &Config,
    credential: Option<Arc<ServiceCredential>>,
) -> Result<SearchConsoleClient> {
    let http = config.google.timeouts().google_client()?;
    Ok(SearchConsoleClient::new(
        credential,
        http,
        &config.google.endpoints,
        config.google.property(&config.site),
    )
    .with_retry(config.google.retry_policy())
    .with_policy(config.feedback)
    .with_analyze_delay(Duration::from_millis(config.google.analyze_delay_ms))
    .with_window_days(config.google.window_days))
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.site.base_url.clone(),
            site_name: config.site.site_name.clone(),
            delay_between_units: Duration::from_millis(config.pipeline.delay_between_units_ms),
            index_after_generation: config.google.indexing_enabled,
            batch_delay: Duration::from_millis(config.google.batch_delay_ms),
        }
    }
}

impl Pipeline {
    /// Assemble a pipeline from configuration
    ///
    /// Fails with [`SeoError::CredentialsMissing`] when indexing is enabled
    /// and no service account can be found.
    pub fn from_config(config: &Config, options: SetupOptions) -> Result<Self> {
        config.validate()?;

        let mut settings = PipelineSettings::from_config(config);
        settings.index_after_generation |= options.index;

        let wants_google = settings.index_after_generation || config.google.feedback_enabled;
        let credential = if wants_google {
            load_credential(&config.google)?
        } else {
            None
        };

        let cancel = match config.pipeline.deadline_secs {
            Some(secs) => CancelSignal::with_deadline(Duration::from_secs(secs)),
            None => CancelSignal::new(),
        };

        let mut pipeline = Pipeline::new(
            settings.clone(),
            text_client(config, options.offline)?,
            Arc::new(FileSink::new(&config.site.output_dir)),
        )
        .with_timeouts(config.google.timeouts())
        .with_cancel(cancel);

        if settings.index_after_generation {
            let Some(credential) = credential.clone() else {
                return Err(SeoError::CredentialsMissing(format!(
                    "indexing is enabled but no service account was found \
                     (google.credentials_path or {})",
                    config.google.credentials_env
                )));
            };
            pipeline = pipeline.with_indexing(Arc::new(indexing_client(config, Some(credential))?));
        }

        if config.google.feedback_enabled {
            match credential {
                Some(credential) => {
                    pipeline = pipeline.with_search_console(Arc::new(search_console_client(
                        config,
                        Some(credential),
                    )?));
                }
                None => warn!("Feedback is enabled but no service account was found"),
            }
        }

        Ok(pipeline)
    }
}
