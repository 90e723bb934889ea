//! Architect Agent
//!
//! Strategy phase: plans a page before any copy is written.

use chrono::Utc;
use tracing::{info, instrument};

use super::{Step, clean_list, unit_context};
use crate::ai::TextGenerationClient;
use crate::constants::pipeline as limits;
use crate::constants::tags;
use crate::pipeline::types::{
    ContentSection, GenerationUnit, HookAngle, Objection, StrategyBrief,
};
use crate::types::{Result, SeoError};

const SYSTEM_PROMPT: &str = r#"<ROLE>
You are a conversion strategist planning landing pages for local and niche businesses.
You think about search intent, buyer psychology and objections before any copy is written.
</ROLE>

<FORMAT>
When asked for JSON, answer with JSON only. No commentary.
</FORMAT>"#;

const KEYWORDS: Step = Step::new(tags::ARCHITECT_KEYWORDS, 0.8, 1024);
const INSIGHTS: Step = Step::new(tags::ARCHITECT_INSIGHTS, 0.7, 1024);
const HOOK: Step = Step::new(tags::ARCHITECT_HOOK, 0.8, 512);
const OBJECTIONS: Step = Step::new(tags::ARCHITECT_OBJECTIONS, 0.7, 2048);
const OUTLINE: Step = Step::new(tags::ARCHITECT_OUTLINE, 0.7, 3072);
const CTA: Step = Step::new(tags::ARCHITECT_CTA, 0.7, 256);

#[derive(Debug, Clone)]
pub struct ArchitectAgent {
    client: TextGenerationClient,
}

impl ArchitectAgent {
    pub fn new(client: TextGenerationClient) -> Self {
        Self { client }
    }

    /// Produce the strategy brief for `unit`
    #[instrument(skip(self, unit), fields(unit = %unit.label))]
    pub async fn plan(&self, unit: &GenerationUnit) -> Result<StrategyBrief> {
        let context = unit_context(unit);

        let keywords = self.keywords(&context).await?;
        let insights = self.insights(&context).await?;
        let hook: HookAngle = HOOK
            .structured(&self.client, SYSTEM_PROMPT, hook_prompt(&context))
            .await?;
        let objections = self.objections(&context).await?;
        let outline = self
            .outline(&context, &hook, &objections, &keywords)
            .await?;
        let call_to_action = CTA
            .text(&self.client, SYSTEM_PROMPT, cta_prompt(&context))
            .await?;

        let target_word_count = StrategyBrief::word_count_for(outline.len());
        let estimated_read_minutes = StrategyBrief::read_minutes_for(target_word_count);

        info!(
            keywords = keywords.len(),
            objections = objections.len(),
            sections = outline.len(),
            target_word_count,
            "Strategy brief ready"
        );

        Ok(StrategyBrief {
            unit: unit.clone(),
            keywords,
            insights,
            hook,
            objections,
            outline,
            call_to_action,
            target_word_count,
            estimated_read_minutes,
            generated_at: Utc::now(),
        })
    }

    async fn keywords(&self, context: &str) -> Result<Vec<String>> {
        let raw: Vec<String> = KEYWORDS
            .structured(&self.client, SYSTEM_PROMPT, keywords_prompt(context))
            .await?;
        let keywords = clean_list(raw, limits::MAX_KEYWORDS);
        if keywords.is_empty() {
            return Err(SeoError::malformed("keyword list is empty", "[]"));
        }
        Ok(keywords)
    }

    async fn insights(&self, context: &str) -> Result<Vec<String>> {
        let raw: Vec<String> = INSIGHTS
            .structured(&self.client, SYSTEM_PROMPT, insights_prompt(context))
            .await?;
        Ok(clean_list(raw, limits::MAX_INSIGHTS))
    }

    async fn objections(&self, context: &str) -> Result<Vec<Objection>> {
        let mut objections: Vec<Objection> = OBJECTIONS
            .structured(&self.client, SYSTEM_PROMPT, objections_prompt(context))
            .await?;
        objections.truncate(limits::MAX_OBJECTIONS);
        Ok(objections)
    }

    async fn outline(
        &self,
        context: &str,
        hook: &HookAngle,
        objections: &[Objection],
        keywords: &[String],
    ) -> Result<Vec<ContentSection>> {
        let outline: Vec<ContentSection> = OUTLINE
            .structured(
                &self.client,
                SYSTEM_PROMPT,
                outline_prompt(context, hook, objections, keywords),
            )
            .await?;
        if outline.is_empty() {
            return Err(SeoError::malformed("content outline is empty", "[]"));
        }
        Ok(outline)
    }
}

fn keywords_prompt(context: &str) -> String {
    format!(
        r#"{context}
List up to {max} related search phrases (LSI keywords) people in this audience type
when looking for a solution. Prefer concrete, industry-specific phrases.

Answer with a JSON array of strings."#,
        max = limits::MAX_KEYWORDS
    )
}

fn insights_prompt(context: &str) -> String {
    format!(
        r#"{context}
Give up to {max} observations about how competitors in this niche present themselves
online and where they fall short.

Answer with a JSON array of strings."#,
        max = limits::MAX_INSIGHTS
    )
}

fn hook_prompt(context: &str) -> String {
    format!(
        r#"{context}
Propose one opening statement that stops this audience from scrolling.

Answer with JSON: {{"statement": "...", "emotion": "fear|curiosity|urgency|aspiration", "reasoning": "..."}}"#
    )
}

fn objections_prompt(context: &str) -> String {
    format!(
        r#"{context}
List the {max} strongest objections a skeptical buyer in this audience would raise,
each with a strategy to answer it.

Answer with a JSON array:
[{{"id": 1, "text": "...", "category": "time|money|trust|urgency|knowledge", "rebuttalStrategy": "..."}}]"#,
        max = limits::MAX_OBJECTIONS
    )
}

fn outline_prompt(
    context: &str,
    hook: &HookAngle,
    objections: &[Objection],
    keywords: &[String],
) -> String {
    let objections = objections
        .iter()
        .map(|o| format!("- {}", o.text))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"{context}
Hook: {hook}

Objections to address:
{objections}

Keywords: {keywords}

Plan the sections of the landing page in reading order. Every objection must be
answered by some section.

Answer with a JSON array:
[{{"title": "...", "purpose": "...", "keyPoints": ["..."], "keywords": ["..."], "tone": "authoritative|empathetic|urgent|educational"}}]"#,
        hook = hook.statement,
        keywords = keywords.join(", ")
    )
}

fn cta_prompt(context: &str) -> String {
    format!(
        r#"{context}
Write one sentence inviting this audience to take the next step. Plain text only."#
    )
}
