//! Fixture Provider
//!
//! Scripted replies keyed by request tag. Each tag owns a queue; replies are
//! served front to back and the last one repeats once the queue is down to a
//! single entry. Requests without a tag use [`tags::UNTAGGED`].

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{ProviderReply, ProviderRequest, TextProvider, TokenUsage};
use crate::constants::tags;
use crate::types::{Result, SeoError};

const MODEL: &str = "fixture";

/// One scripted reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureReply {
    Text(String),
    /// Upstream failure with the given status and body
    Failure { status: u16, body: String },
}

impl FixtureReply {
    pub fn text(text: impl Into<String>) -> Self {
        FixtureReply::Text(text.into())
    }

    pub fn json(value: serde_json::Value) -> Self {
        FixtureReply::Text(value.to_string())
    }

    /// 503, which the retry policy treats as transient
    pub fn unavailable() -> Self {
        FixtureReply::Failure {
            status: 503,
            body: "fixture: service unavailable".to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct FixtureState {
    replies: HashMap<String, VecDeque<FixtureReply>>,
    calls: HashMap<String, usize>,
}

/// Provider that answers from a fixture table
#[derive(Debug, Default)]
pub struct FixtureProvider {
    state: Mutex<FixtureState>,
    latency: Duration,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated per-request latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Append replies to the queue for `tag`
    pub fn script<I>(self, tag: &str, replies: I) -> Self
    where
        I: IntoIterator<Item = FixtureReply>,
    {
        self.push(tag, replies);
        self
    }

    /// Same as [`script`](Self::script) for an already-shared provider
    pub fn push<I>(&self, tag: &str, replies: I)
    where
        I: IntoIterator<Item = FixtureReply>,
    {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .replies
            .entry(tag.to_string())
            .or_default()
            .extend(replies);
    }

    /// Number of requests seen for `tag`
    pub fn calls(&self, tag: &str) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.get(tag).copied().unwrap_or(0)
    }

    fn next_reply(&self, tag: &str) -> Option<FixtureReply> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state.calls.entry(tag.to_string()).or_default() += 1;
        let queue = state.replies.get_mut(tag)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    /// A complete table for one landing page: every architect and writer
    /// step answers with well-formed content
    pub fn landing_page_defaults() -> Self {
        Self::new()
            .script(tags::CONNECTION_TEST, [FixtureReply::text("OK")])
            .script(
                tags::ARCHITECT_KEYWORDS,
                [FixtureReply::json(json!([
                    "online booking",
                    "local search visibility",
                    "google business profile",
                    "mobile friendly website",
                    "customer reviews",
                    "page speed",
                    "appointment reminders",
                    "local seo"
                ]))],
            )
            .script(
                tags::ARCHITECT_INSIGHTS,
                [FixtureReply::json(json!([
                    "Most competitors hide prices, which slows down decisions",
                    "Younger customers book online outside business hours",
                    "Map listings matter more than classic rankings for urgent searches",
                    "Pages slower than three seconds lose half their visitors"
                ]))],
            )
            .script(
                tags::ARCHITECT_HOOK,
                [FixtureReply::json(json!({
                    "statement": "Most local businesses lose customers every week to a website that fails on mobile.",
                    "emotion": "fear",
                    "reasoning": "Owners invest in their service but neglect the first impression online."
                }))],
            )
            .script(
                tags::ARCHITECT_OBJECTIONS,
                [FixtureReply::json(json!([
                    {"id": 1, "text": "Customers already find me through referrals", "category": "urgency",
                     "rebuttalStrategy": "Show that most new customers search online before calling."},
                    {"id": 2, "text": "I have no time for a new website", "category": "time",
                     "rebuttalStrategy": "The site books appointments while the owner works."},
                    {"id": 3, "text": "Online marketing never worked for me", "category": "trust",
                     "rebuttalStrategy": "Contrast generic campaigns with a site built for the niche."},
                    {"id": 4, "text": "It is too expensive", "category": "money",
                     "rebuttalStrategy": "Compare the cost with the revenue of a few lost customers."},
                    {"id": 5, "text": "I do not understand the technology", "category": "knowledge",
                     "rebuttalStrategy": "Everything is handled for the owner, results show up as bookings."}
                ]))],
            )
            .script(
                tags::ARCHITECT_OUTLINE,
                [FixtureReply::json(json!([
                    {"title": "Why good businesses lose customers online", "purpose": "Hook and agitate the problem",
                     "keyPoints": ["How customers search today", "What a missed search costs"],
                     "keywords": ["local search visibility"], "tone": "urgent"},
                    {"title": "What changed in the last three years", "purpose": "Educate and build authority",
                     "keyPoints": ["Mobile first", "Reviews as proof"],
                     "keywords": ["customer reviews", "mobile friendly website"], "tone": "educational"},
                    {"title": "What a modern site does for you", "purpose": "Present the solution",
                     "keyPoints": ["Online booking", "Fast pages", "Map integration"],
                     "keywords": ["online booking", "page speed"], "tone": "authoritative"}
                ]))],
            )
            .script(
                tags::ARCHITECT_CTA,
                [FixtureReply::text(
                    "Get a free audit of your online presence and see where customers slip away.",
                )],
            )
            .script(
                tags::WRITER_META,
                [FixtureReply::json(json!({
                    "metaTitle": "Websites That Bring Customers | Built for Local Businesses",
                    "metaDescription": "Fast, search-ready websites with online booking and map visibility. New customers within the first month."
                }))],
            )
            .script(
                tags::WRITER_HERO,
                [FixtureReply::json(json!({
                    "h1": "A Professional Website That Fills Your Calendar",
                    "subheadline": "Get found on maps and local searches within thirty days, with no technical work on your side."
                }))],
            )
            .script(
                tags::WRITER_DEFINITION,
                [FixtureReply::text(
                    "A modern business website attracts customers through fast pages, online booking and strong local search visibility.",
                )],
            )
            .script(
                tags::WRITER_PAIN,
                [FixtureReply::text(
                    "Every day without a working website sends searching customers to a competitor who answered first.",
                )],
            )
            .script(
                tags::WRITER_COMPARISON,
                [FixtureReply::json(json!({
                    "headers": ["Without a modern site", "With an optimized site"],
                    "rows": [
                        ["Invisible on maps", "First page in local results"],
                        ["Referrals only", "Steady flow of new customers"],
                        ["Phone bookings only", "Online booking around the clock"]
                    ]
                }))],
            )
            .script(
                tags::WRITER_SOLUTION,
                [FixtureReply::text(
                    "The site ships with online booking, business profile sync, sub two second loads and complete on-page SEO.",
                )],
            )
            .script(
                tags::WRITER_FAQ,
                [FixtureReply::json(json!([
                    {"question": "How long does it take?", "answer": "The site is live within two weeks."},
                    {"question": "Do I need technical skills?", "answer": "No. Content, design and optimization are handled for you."},
                    {"question": "What if I am not satisfied?", "answer": "There is a thirty day money back guarantee."}
                ]))],
            )
            .script(
                tags::WRITER_CTA,
                [FixtureReply::json(json!({
                    "headline": "Get Your Tailored Offer Within 24 Hours",
                    "body": "Fill in the form and receive a complete proposal for your business. No obligations.",
                    "buttonText": "Send Me the Offer"
                }))],
            )
            .script(
                tags::WRITER_LINKS,
                [FixtureReply::json(json!([
                    {"text": "Websites for veterinary clinics", "slug": "veterinary-clinic"},
                    {"text": "Websites for beauty salons", "slug": "beauty-salon"}
                ]))],
            )
    }
}

#[async_trait]
impl TextProvider for FixtureProvider {
    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderReply> {
        let tag = request.tag.as_deref().unwrap_or(tags::UNTAGGED);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = self
            .next_reply(tag)
            .ok_or_else(|| SeoError::InvalidInput(format!("no fixture scripted for tag '{}'", tag)))?;
        debug!(tag, "Serving fixture reply");

        match reply {
            FixtureReply::Text(text) => Ok(ProviderReply {
                usage: Some(TokenUsage::new(
                    (request.prompt.len() / 4) as u32,
                    (text.len() / 4) as u32,
                )),
                text,
                model: MODEL.to_string(),
            }),
            FixtureReply::Failure { status, body } => Err(SeoError::ProviderApi {
                provider: self.name().to_string(),
                status,
                body,
            }),
        }
    }

    fn name(&self) -> &str {
        "fixture"
    }

    fn model(&self) -> &str {
        MODEL
    }
}
