//! Pipeline Data Types
//!
//! Units of work, the structured output of both agents, and per-unit and
//! per-batch results.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::slug::{is_valid_slug, slugify};
use crate::constants::pipeline as limits;
use crate::google::BatchIndexingResult;
use crate::types::{Result, SeoError};

// =============================================================================
// Input
// =============================================================================

/// One page to produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationUnit {
    /// Business or domain label, e.g. "dental clinic"
    pub label: String,
    pub audience: String,
    pub pain_point: String,
    /// Explicit slug; derived from the label when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl GenerationUnit {
    pub fn new(
        label: impl Into<String>,
        audience: impl Into<String>,
        pain_point: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            audience: audience.into(),
            pain_point: pain_point.into(),
            slug: None,
            location: None,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(SeoError::InvalidInput("unit label must not be empty".to_string()));
        }
        if let Some(slug) = &self.slug
            && !is_valid_slug(slug)
        {
            return Err(SeoError::InvalidInput(format!("invalid slug '{}'", slug)));
        }
        Ok(())
    }

    /// Output key for this unit
    pub fn resolved_slug(&self) -> String {
        match &self.slug {
            Some(slug) if is_valid_slug(slug) => slug.clone(),
            _ => slugify(&self.label),
        }
    }
}

// =============================================================================
// Strategy (architect phase)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Fear,
    Curiosity,
    Urgency,
    Aspiration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookAngle {
    pub statement: String,
    pub emotion: Emotion,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectionCategory {
    Time,
    Money,
    Trust,
    Urgency,
    Knowledge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objection {
    pub id: u32,
    pub text: String,
    pub category: ObjectionCategory,
    pub rebuttal_strategy: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionTone {
    Authoritative,
    Empathetic,
    Urgent,
    Educational,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSection {
    pub title: String,
    pub purpose: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub tone: SectionTone,
}

/// Output of the strategy phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyBrief {
    pub unit: GenerationUnit,
    pub keywords: Vec<String>,
    pub insights: Vec<String>,
    pub hook: HookAngle,
    pub objections: Vec<Objection>,
    pub outline: Vec<ContentSection>,
    pub call_to_action: String,
    pub target_word_count: usize,
    pub estimated_read_minutes: usize,
    pub generated_at: DateTime<Utc>,
}

impl StrategyBrief {
    /// Planned length for an outline with `sections` sections
    pub fn word_count_for(sections: usize) -> usize {
        limits::INTRO_WORDS + sections * limits::WORDS_PER_SECTION + limits::CONCLUSION_WORDS
    }

    pub fn read_minutes_for(words: usize) -> usize {
        words.div_ceil(limits::READING_WORDS_PER_MINUTE)
    }
}

// =============================================================================
// Content (writer phase)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaTags {
    pub meta_title: String,
    pub meta_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    pub h1: String,
    pub subheadline: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtaSection {
    pub headline: String,
    pub body: String,
    pub button_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalLink {
    pub text: String,
    pub slug: String,
}

/// Output of the content phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandingPage {
    pub slug: String,
    pub meta: MetaTags,
    pub hero: Hero,
    /// Short definition aimed at AI overviews and featured snippets
    pub definition: String,
    pub pain_agitation: String,
    pub comparison: ComparisonTable,
    pub technical_solution: String,
    pub faq: Vec<FaqItem>,
    pub call_to_action: CtaSection,
    pub internal_links: Vec<InternalLink>,
}

// =============================================================================
// Results
// =============================================================================

/// Wall-clock time per phase, milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTimings {
    pub architect_ms: u64,
    pub writer_ms: u64,
    /// Rendering plus persistence
    pub render_ms: u64,
    pub total_ms: u64,
}

/// Outcome of one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub label: String,
    pub slug: String,
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub timing: PhaseTimings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brief: Option<StrategyBrief>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<LandingPage>,
}

impl GenerationResult {
    pub(crate) fn failed(
        unit: &GenerationUnit,
        slug: &str,
        url: &str,
        timing: PhaseTimings,
        error: impl Into<String>,
    ) -> Self {
        Self {
            label: unit.label.clone(),
            slug: slug.to_string(),
            url: url.to_string(),
            success: false,
            stored_id: None,
            output_path: None,
            timing,
            error: Some(error.into()),
            brief: None,
            page: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTiming {
    pub total_ms: u64,
    /// Mean wall time per processed unit
    pub avg_per_page_ms: u64,
}

/// Aggregate of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub total_pages: usize,
    pub successful: usize,
    pub failed: usize,
    /// One entry per input unit, in input order
    pub results: Vec<GenerationResult>,
    pub timing: BatchTiming,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexing_result: Option<BatchIndexingResult>,
    pub cancelled: bool,
}

impl BatchResult {
    pub fn from_results(results: Vec<GenerationResult>, total_ms: u64, cancelled: bool) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let total_pages = results.len();
        let avg_per_page_ms = if total_pages == 0 {
            0
        } else {
            total_ms / total_pages as u64
        };
        Self {
            total_pages,
            successful,
            failed: total_pages - successful,
            results,
            timing: BatchTiming {
                total_ms,
                avg_per_page_ms,
            },
            indexing_result: None,
            cancelled,
        }
    }

    /// URLs of the units that produced a page
    pub fn successful_urls(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.url.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_slug_resolution() {
        let unit = GenerationUnit::new("Dental Clinic", "owners", "no patients");
        assert_eq!(unit.resolved_slug(), "dental-clinic");
        assert_eq!(unit.clone().with_slug("dentist").resolved_slug(), "dentist");
        assert!(unit.with_slug("Bad Slug").validate().is_err());
        assert!(GenerationUnit::new(" ", "a", "b").validate().is_err());
    }

    #[test]
    fn test_units_file_shape() {
        let units: Vec<GenerationUnit> = serde_json::from_str(
            r#"[{"label": "Vet clinic", "audience": "clinic owners", "painPoint": "empty calendar", "location": "Cluj"}]"#,
        )
        .unwrap();
        assert_eq!(units[0].pain_point, "empty calendar");
        assert_eq!(units[0].location.as_deref(), Some("Cluj"));
    }

    #[test]
    fn test_word_count_model() {
        assert_eq!(StrategyBrief::word_count_for(3), 200 + 3 * 350 + 150);
        assert_eq!(StrategyBrief::read_minutes_for(1400), 7);
        assert_eq!(StrategyBrief::read_minutes_for(1401), 8);
    }

    #[test]
    fn test_batch_counts() {
        let unit = GenerationUnit::new("a", "b", "c");
        let ok = GenerationResult {
            success: true,
            error: None,
            ..GenerationResult::failed(&unit, "a", "https://x.test/a", PhaseTimings::default(), "")
        };
        let bad = GenerationResult::failed(&unit, "b", "https://x.test/b", PhaseTimings::default(), "boom");
        let batch = BatchResult::from_results(vec![ok, bad], 100, false);
        assert_eq!(batch.total_pages, 2);
        assert_eq!(batch.successful, 1);
        assert_eq!(batch.failed, 1);
        assert_eq!(batch.timing.avg_per_page_ms, 50);
        assert_eq!(batch.successful_urls(), vec!["https://x.test/a"]);

        let empty = BatchResult::from_results(Vec::new(), 0, false);
        assert_eq!(empty.timing.avg_per_page_ms, 0);
    }
}
