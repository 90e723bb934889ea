//! AI Integration Layer
//!
//! Provider-agnostic text generation with retry/backoff and structured
//! response parsing.

pub mod client;
pub mod provider;
pub mod retry;
pub mod structured;
pub mod timeout;

pub use client::{
    GenerateRequest, GenerateResponse, GenerationDefaults, ResponseFormat, TextGenerationClient,
};
pub use provider::{
    FixtureProvider, FixtureReply, Provider, ProviderConfig, ProviderKind, ProviderReply,
    ProviderRequest, TextProvider, TokenUsage,
};
pub use retry::{RetryExhausted, RetryPolicy};
pub use structured::{extract_json, parse_structured};
pub use timeout::{TimeoutConfig, with_timeout};
