//! SEOForge - Landing Page Generation Pipeline
//!
//! Turns a list of audience/pain-point units into persuasive landing pages,
//! publishes them to disk, asks Google to index them and later classifies
//! how each page performs in search.
//!
//! ## Core Features
//!
//! - **Two-agent pipeline**: a strategy brief, then page content, per unit
//! - **Provider abstraction**: OpenAI, Anthropic, Gemini or offline fixtures
//! - **Google integration**: Indexing API and Search Console with
//!   service-account JWT auth
//! - **Health feedback**: threshold-based page classification with
//!   recommendations
//!
//! ## Quick Start
//!
//! ```ignore
//! use seoforge::{Config, Pipeline, pipeline::{GenerationUnit, SetupOptions}};
//!
//! let config = seoforge::ConfigLoader::load()?;
//! let pipeline = Pipeline::from_config(&config, SetupOptions::default())?;
//! let batch = pipeline
//!     .generate_batch(&[GenerationUnit::new("Dental clinic", "clinic owners", "empty chairs")])
//!     .await;
//! println!("{} generated", batch.successful);
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: text generation providers, retry and structured parsing
//! - [`google`]: credentials, token exchange, Indexing and Search Console
//! - [`pipeline`]: agents, rendering, persistence and orchestration
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod google;
pub mod pipeline;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::{CancelSignal, ErrorCategory, Result, SeoError};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    BatchResult, GenerationResult, GenerationUnit, LandingPage, Pipeline, PipelineEvent,
    PipelinePhase, PipelineSettings, StrategyBrief,
};

// =============================================================================
// Client Re-exports
// =============================================================================

pub use ai::{Provider, RetryPolicy, TextGenerationClient, TimeoutConfig, with_timeout};
pub use google::{FeedbackPolicy, IndexingClient, SearchConsoleClient, ServiceCredential};
