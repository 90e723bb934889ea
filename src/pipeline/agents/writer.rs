//! Writer Agent
//!
//! Content phase: writes every page section from a [`StrategyBrief`].

use std::collections::HashSet;

use tracing::{info, instrument, warn};

use super::{Step, clip, unit_context};
use crate::ai::TextGenerationClient;
use crate::constants::pipeline as limits;
use crate::constants::tags;
use crate::pipeline::slug::is_valid_slug;
use crate::pipeline::types::{
    ComparisonTable, CtaSection, FaqItem, Hero, InternalLink, LandingPage, MetaTags,
    StrategyBrief,
};
use crate::types::{Result, SeoError};

const SYSTEM_PROMPT: &str = r#"<ROLE>
You are a direct-response copywriter writing landing pages that rank in search and convert.
Write in plain language for the stated audience. No filler, no superlatives without proof.
</ROLE>

<FORMAT>
When asked for JSON, answer with JSON only. No commentary.
</FORMAT>"#;

const META: Step = Step::new(tags::WRITER_META, 0.6, 256);
const HERO: Step = Step::new(tags::WRITER_HERO, 0.8, 512);
const DEFINITION: Step = Step::new(tags::WRITER_DEFINITION, 0.6, 512);
const PAIN: Step = Step::new(tags::WRITER_PAIN, 0.8, 1024);
const COMPARISON: Step = Step::new(tags::WRITER_COMPARISON, 0.7, 1536);
const SOLUTION: Step = Step::new(tags::WRITER_SOLUTION, 0.7, 2048);
const FAQ: Step = Step::new(tags::WRITER_FAQ, 0.7, 2048);
const CTA: Step = Step::new(tags::WRITER_CTA, 0.8, 768);
const LINKS: Step = Step::new(tags::WRITER_LINKS, 0.6, 512);

#[derive(Debug, Clone)]
pub struct WriterAgent {
    client: TextGenerationClient,
}

impl WriterAgent {
    pub fn new(client: TextGenerationClient) -> Self {
        Self { client }
    }

    /// Write the page for `brief` under `slug`
    ///
    /// `related` lists slugs of pages that already exist on the site; internal
    /// links may only point at those. With none the link step is skipped.
    #[instrument(skip(self, brief, related), fields(slug = %slug))]
    pub async fn write(
        &self,
        brief: &StrategyBrief,
        slug: &str,
        related: &[String],
    ) -> Result<LandingPage> {
        let context = brief_context(brief);

        let meta = self.meta(&context).await?;
        let hero = self.hero(&context).await?;
        let definition = DEFINITION
            .text(&self.client, SYSTEM_PROMPT, definition_prompt(&context))
            .await?;
        let pain_agitation = PAIN
            .text(&self.client, SYSTEM_PROMPT, pain_prompt(&context))
            .await?;
        let comparison = self.comparison(&context).await?;
        let technical_solution = SOLUTION
            .text(&self.client, SYSTEM_PROMPT, solution_prompt(&context))
            .await?;
        let faq = self.faq(&context).await?;
        let call_to_action: CtaSection = CTA
            .structured(&self.client, SYSTEM_PROMPT, cta_prompt(&context))
            .await?;
        let internal_links = self.links(&context, slug, related).await?;

        info!(
            faq = faq.len(),
            comparison_rows = comparison.rows.len(),
            links = internal_links.len(),
            "Page content ready"
        );

        Ok(LandingPage {
            slug: slug.to_string(),
            meta,
            hero,
            definition,
            pain_agitation,
            comparison,
            technical_solution,
            faq,
            call_to_action,
            internal_links,
        })
    }

    async fn meta(&self, context: &str) -> Result<MetaTags> {
        let meta: MetaTags = META
            .structured(&self.client, SYSTEM_PROMPT, meta_prompt(context))
            .await?;
        if meta.meta_title.trim().is_empty() {
            return Err(SeoError::malformed("meta title is empty", &meta.meta_description));
        }
        Ok(MetaTags {
            meta_title: clip(&meta.meta_title, limits::META_TITLE_MAX),
            meta_description: clip(&meta.meta_description, limits::META_DESCRIPTION_MAX),
        })
    }

    async fn hero(&self, context: &str) -> Result<Hero> {
        let hero: Hero = HERO
            .structured(&self.client, SYSTEM_PROMPT, hero_prompt(context))
            .await?;
        if hero.h1.trim().is_empty() || hero.subheadline.trim().is_empty() {
            return Err(SeoError::malformed("hero is missing h1 or subheadline", &hero.h1));
        }
        Ok(Hero {
            h1: clip(&hero.h1, limits::H1_MAX),
            subheadline: clip(&hero.subheadline, limits::SUBHEADLINE_MAX),
        })
    }

    async fn comparison(&self, context: &str) -> Result<ComparisonTable> {
        let table: ComparisonTable = COMPARISON
            .structured(&self.client, SYSTEM_PROMPT, comparison_prompt(context))
            .await?;
        if table.headers.is_empty() {
            return Err(SeoError::malformed("comparison table has no headers", "{}"));
        }

        let width = table.headers.len();
        let total = table.rows.len();
        let rows: Vec<Vec<String>> = table
            .rows
            .into_iter()
            .filter(|row| row.len() == width)
            .take(limits::MAX_COMPARISON_ROWS)
            .collect();
        if rows.len() < total.min(limits::MAX_COMPARISON_ROWS) {
            warn!(kept = rows.len(), total, "Dropped ragged comparison rows");
        }
        if rows.is_empty() {
            return Err(SeoError::malformed("comparison table has no complete rows", "{}"));
        }

        Ok(ComparisonTable {
            headers: table.headers,
            rows,
        })
    }

    async fn faq(&self, context: &str) -> Result<Vec<FaqItem>> {
        let items: Vec<FaqItem> = FAQ
            .structured(&self.client, SYSTEM_PROMPT, faq_prompt(context))
            .await?;
        Ok(items
            .into_iter()
            .filter(|item| !item.question.trim().is_empty() && !item.answer.trim().is_empty())
            .collect())
    }

    async fn links(
        &self,
        context: &str,
        slug: &str,
        related: &[String],
    ) -> Result<Vec<InternalLink>> {
        let candidates: Vec<&String> = related.iter().filter(|r| r.as_str() != slug).collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let links: Vec<InternalLink> = LINKS
            .structured(&self.client, SYSTEM_PROMPT, links_prompt(context, &candidates))
            .await?;

        let allowed: HashSet<&str> = candidates.iter().map(|s| s.as_str()).collect();
        let mut seen = HashSet::new();
        Ok(links
            .into_iter()
            .filter(|link| {
                is_valid_slug(&link.slug)
                    && allowed.contains(link.slug.as_str())
                    && !link.text.trim().is_empty()
                    && seen.insert(link.slug.clone())
            })
            .collect())
    }
}

/// Unit context plus the parts of the brief every section needs
fn brief_context(brief: &StrategyBrief) -> String {
    let mut context = unit_context(&brief.unit);
    context.push_str(&format!("Hook: {}\n", brief.hook.statement));
    context.push_str(&format!("Keywords: {}\n", brief.keywords.join(", ")));
    if !brief.objections.is_empty() {
        context.push_str("Objections:\n");
        for objection in &brief.objections {
            context.push_str(&format!(
                "- {} (answer by: {})\n",
                objection.text, objection.rebuttal_strategy
            ));
        }
    }
    if !brief.outline.is_empty() {
        context.push_str("Outline:\n");
        for section in &brief.outline {
            context.push_str(&format!("- {}: {}\n", section.title, section.purpose));
        }
    }
    context.push_str(&format!("Call to action: {}\n", brief.call_to_action));
    context
}

fn meta_prompt(context: &str) -> String {
    format!(
        r#"{context}
Write the search snippet for this page. Title at most {title} characters, description
at most {description} characters, both including the main keyword.

Answer with JSON: {{"metaTitle": "...", "metaDescription": "..."}}"#,
        title = limits::META_TITLE_MAX,
        description = limits::META_DESCRIPTION_MAX
    )
}

fn hero_prompt(context: &str) -> String {
    format!(
        r#"{context}
Write the hero: an H1 (at most {h1} characters) that names the pain point, and a
subheadline (at most {sub} characters) that promises the outcome.

Answer with JSON: {{"h1": "...", "subheadline": "..."}}"#,
        h1 = limits::H1_MAX,
        sub = limits::SUBHEADLINE_MAX
    )
}

fn definition_prompt(context: &str) -> String {
    format!(
        r#"{context}
Write a 40 to 60 word definition answering "what is this and who is it for", suitable
for a featured snippet or AI overview. Plain text only."#
    )
}

fn pain_prompt(context: &str) -> String {
    format!(
        r#"{context}
Write two or three short paragraphs describing what the pain point costs this audience
every week. Separate paragraphs with a blank line. Plain text only."#
    )
}

fn comparison_prompt(context: &str) -> String {
    format!(
        r#"{context}
Build a comparison table between the audience's current situation and the situation
after adopting the solution. Every row has one cell per header.

Answer with JSON: {{"headers": ["...", "..."], "rows": [["...", "..."]]}}"#
    )
}

fn solution_prompt(context: &str) -> String {
    format!(
        r#"{context}
Explain how the solution works in practice, step by step, in two to four short
paragraphs separated by blank lines. Plain text only."#
    )
}

fn faq_prompt(context: &str) -> String {
    format!(
        r#"{context}
Write five frequently asked questions with direct answers of 40 to 80 words. Cover the
objections listed above.

Answer with a JSON array: [{{"question": "...", "answer": "..."}}]"#
    )
}

fn cta_prompt(context: &str) -> String {
    format!(
        r#"{context}
Write the closing call to action section: a headline, a short body and a button label
of at most five words.

Answer with JSON: {{"headline": "...", "body": "...", "buttonText": "..."}}"#
    )
}

fn links_prompt(context: &str, candidates: &[&String]) -> String {
    let slugs = candidates
        .iter()
        .map(|s| format!("- {}", s))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"{context}
Related pages on the same site (slugs):
{slugs}

Pick the relevant ones and write natural anchor text for each. Use the slugs exactly
as given.

Answer with a JSON array: [{{"text": "...", "slug": "..."}}]"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{FixtureProvider, FixtureReply, Provider};
    use crate::pipeline::render::tests::sample_brief;
    use serde_json::json;

    fn agent(fixture: FixtureProvider) -> WriterAgent {
        WriterAgent::new(TextGenerationClient::new(Provider::Fixture(fixture)))
    }

    fn related() -> Vec<String> {
        vec![
            "veterinary-clinic".to_string(),
            "beauty-salon".to_string(),
            "dental-clinic".to_string(),
        ]
    }

    #[tokio::test]
    async fn test_write_from_fixture() {
        let page = agent(FixtureProvider::landing_page_defaults())
            .write(&sample_brief(), "dental-clinic", &related())
            .await
            .unwrap();

        assert_eq!(page.slug, "dental-clinic");
        assert_eq!(page.hero.h1, "A Professional Website That Fills Your Calendar");
        assert_eq!(page.comparison.rows.len(), 3);
        assert_eq!(page.faq.len(), 3);
        assert_eq!(page.call_to_action.button_text, "Send Me the Offer");
        assert_eq!(page.internal_links.len(), 2);
        assert!(page.meta.meta_title.chars().count() <= limits::META_TITLE_MAX);
        assert!(page.meta.meta_description.chars().count() <= limits::META_DESCRIPTION_MAX);
    }

    #[tokio::test]
    async fn test_links_skipped_without_siblings() {
        let provider = FixtureProvider::landing_page_defaults();
        let writer = agent(provider);
        let page = writer
            .write(&sample_brief(), "dental-clinic", &["dental-clinic".to_string()])
            .await
            .unwrap();
        assert!(page.internal_links.is_empty());
    }

    #[tokio::test]
    async fn test_links_outside_batch_are_dropped() {
        let provider = FixtureProvider::landing_page_defaults();
        provider.push(
            tags::WRITER_LINKS,
            [FixtureReply::json(json!([
                {"text": "Self", "slug": "dental-clinic"},
                {"text": "Bad", "slug": "Not A Slug"},
                {"text": "Unknown", "slug": "car-wash"},
                {"text": "Vets", "slug": "veterinary-clinic"},
                {"text": "Vets again", "slug": "veterinary-clinic"}
            ]))],
        );
        let writer = agent(provider);

        writer.write(&sample_brief(), "dental-clinic", &related()).await.unwrap();
        let page = writer
            .write(&sample_brief(), "dental-clinic", &related())
            .await
            .unwrap();

        assert_eq!(page.internal_links.len(), 1);
        assert_eq!(page.internal_links[0].slug, "veterinary-clinic");
    }

    #[tokio::test]
    async fn test_long_meta_is_clipped() {
        let provider = FixtureProvider::landing_page_defaults();
        provider.push(
            tags::WRITER_META,
            [FixtureReply::json(json!({
                "metaTitle": "t".repeat(90),
                "metaDescription": "d".repeat(300)
            }))],
        );
        let writer = agent(provider);

        writer.write(&sample_brief(), "a", &[]).await.unwrap();
        let page = writer.write(&sample_brief(), "a", &[]).await.unwrap();
        assert_eq!(page.meta.meta_title.chars().count(), limits::META_TITLE_MAX);
        assert!(page.meta.meta_title.ends_with("..."));
        assert_eq!(
            page.meta.meta_description.chars().count(),
            limits::META_DESCRIPTION_MAX
        );
    }

    #[tokio::test]
    async fn test_ragged_comparison_rows_are_dropped() {
        let provider = FixtureProvider::landing_page_defaults();
        provider.push(
            tags::WRITER_COMPARISON,
            [FixtureReply::json(json!({
                "headers": ["Before", "After"],
                "rows": [["a", "b"], ["only one"], ["c", "d", "e"]]
            }))],
        );
        let writer = agent(provider);

        writer.write(&sample_brief(), "a", &[]).await.unwrap();
        let page = writer.write(&sample_brief(), "a", &[]).await.unwrap();
        assert_eq!(page.comparison.rows, vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[tokio::test]
    async fn test_missing_hero_field_is_malformed() {
        let provider = FixtureProvider::landing_page_defaults();
        provider.push(
            tags::WRITER_HERO,
            [FixtureReply::json(json!({"h1": "", "subheadline": "x"}))],
        );
        let writer = agent(provider);

        writer.write(&sample_brief(), "a", &[]).await.unwrap();
        let err = writer.write(&sample_brief(), "a", &[]).await.unwrap_err();
        assert!(matches!(err, SeoError::MalformedResponse { .. }));
    }
}
