//! Generation Agents
//!
//! Two agents drive each unit: the [`ArchitectAgent`] plans (keywords,
//! insights, hook, objections, outline, call to action) and the
//! [`WriterAgent`] turns that plan into page sections. Every step is one
//! tagged call through the shared [`TextGenerationClient`].

pub mod architect;
pub mod writer;

pub use architect::ArchitectAgent;
pub use writer::WriterAgent;

use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::GenerationUnit;
use crate::ai::{GenerateRequest, TextGenerationClient};
use crate::types::{Result, SeoError};

/// Sampling settings for one agent step
#[derive(Debug, Clone, Copy)]
pub(crate) struct Step {
    pub tag: &'static str,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Step {
    pub const fn new(tag: &'static str, temperature: f32, max_tokens: u32) -> Self {
        Self {
            tag,
            temperature,
            max_tokens,
        }
    }

    fn request(&self, system: &str, prompt: String) -> GenerateRequest {
        GenerateRequest::new(prompt)
            .system(system)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .tag(self.tag)
    }

    /// Run the step and parse a JSON payload
    pub async fn structured<T: DeserializeOwned>(
        &self,
        client: &TextGenerationClient,
        system: &str,
        prompt: String,
    ) -> Result<T> {
        let value = client
            .generate_structured(self.request(system, prompt))
            .await?;
        debug!(tag = self.tag, "Step complete");
        Ok(value)
    }

    /// Run the step and return trimmed, non-empty prose
    pub async fn text(
        &self,
        client: &TextGenerationClient,
        system: &str,
        prompt: String,
    ) -> Result<String> {
        let response = client.generate(self.request(system, prompt)).await?;
        let text = response.content.trim().to_string();
        if text.is_empty() {
            return Err(SeoError::malformed(
                format!("{} returned no text", self.tag),
                &response.content,
            ));
        }
        debug!(tag = self.tag, chars = text.len(), "Step complete");
        Ok(text)
    }
}

/// Unit description shared by every prompt
pub(crate) fn unit_context(unit: &GenerationUnit) -> String {
    let mut context = format!(
        "Business: {}\nAudience: {}\nMain pain point: {}\n",
        unit.label, unit.audience, unit.pain_point
    );
    if let Some(location) = &unit.location {
        context.push_str(&format!("Location: {}\n", location));
    }
    context
}

/// Trimmed, deduplicated (case-insensitive), non-empty strings, at most `limit`
pub(crate) fn clean_list(items: Vec<String>, limit: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .take(limit)
        .collect()
}

/// Cut `text` to at most `max` characters, marking the cut with `...`
pub(crate) fn clip(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_list() {
        let items = vec![
            " seo ".to_string(),
            "SEO".to_string(),
            "".to_string(),
            "maps".to_string(),
            "reviews".to_string(),
        ];
        assert_eq!(clean_list(items, 2), vec!["seo", "maps"]);
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("short", 60), "short");
        let clipped = clip(&"a".repeat(100), 60);
        assert_eq!(clipped.chars().count(), 60);
        assert!(clipped.ends_with("..."));
        // Multi-byte text is cut on character boundaries
        assert_eq!(clip("ăăăăăă", 5), "ăă...");
    }

    #[test]
    fn test_unit_context_mentions_location() {
        let unit = GenerationUnit::new("Vet", "owners", "empty calendar").with_location("Cluj");
        let context = unit_context(&unit);
        assert!(context.contains("Business: Vet"));
        assert!(context.contains("Location: Cluj"));
    }
}
