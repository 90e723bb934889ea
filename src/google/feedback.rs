//! Page Health Classification
//!
//! Pure decision procedure turning [`PagePerformance`] into a
//! [`FeedbackAnalysis`]. Status only ever degrades while rules are applied:
//! `underperforming` dominates `needs_attention`, which dominates `healthy`.

use serde::{Deserialize, Serialize};

use super::types::PagePerformance;
use crate::constants::feedback as thresholds;

/// Health state of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    NeedsAttention,
    Underperforming,
    NotIndexed,
}

impl HealthStatus {
    /// Ordering used for downgrades; higher is worse
    fn severity(self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::NeedsAttention => 1,
            HealthStatus::Underperforming => 2,
            HealthStatus::NotIndexed => 3,
        }
    }

    /// Move to `other` only if it is worse
    fn degrade(self, other: HealthStatus) -> HealthStatus {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::NeedsAttention => "needs_attention",
            HealthStatus::Underperforming => "underperforming",
            HealthStatus::NotIndexed => "not_indexed",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Remediation actions an operator can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    Reindex,
    WaitForIndexing,
    ImproveTitle,
    UpdateContent,
    AddInternalLinks,
}

impl SuggestedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestedAction::Reindex => "reindex",
            SuggestedAction::WaitForIndexing => "wait_for_indexing",
            SuggestedAction::ImproveTitle => "improve_title",
            SuggestedAction::UpdateContent => "update_content",
            SuggestedAction::AddInternalLinks => "add_internal_links",
        }
    }
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetrics {
    pub indexed: bool,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub avg_position: f64,
}

/// Classification of one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackAnalysis {
    pub url: String,
    pub status: HealthStatus,
    pub metrics: PageMetrics,
    pub recommendations: Vec<String>,
    pub suggested_actions: Vec<SuggestedAction>,
}

impl FeedbackAnalysis {
    /// Analysis for a page whose metrics could not be fetched
    pub fn from_error(url: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            url: url.into(),
            status: HealthStatus::NotIndexed,
            metrics: PageMetrics {
                indexed: false,
                clicks: 0,
                impressions: 0,
                ctr: 0.0,
                avg_position: 0.0,
            },
            recommendations: vec![format!("Error analyzing page: {}", error)],
            suggested_actions: vec![SuggestedAction::Reindex],
        }
    }
}

/// Page counts per health state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    pub healthy: usize,
    pub needs_attention: usize,
    pub underperforming: usize,
    pub not_indexed: usize,
}

impl HealthSummary {
    pub fn tally(analyses: &[FeedbackAnalysis]) -> Self {
        analyses.iter().fold(Self::default(), |mut acc, a| {
            match a.status {
                HealthStatus::Healthy => acc.healthy += 1,
                HealthStatus::NeedsAttention => acc.needs_attention += 1,
                HealthStatus::Underperforming => acc.underperforming += 1,
                HealthStatus::NotIndexed => acc.not_indexed += 1,
            }
            acc
        })
    }
}

/// Outcome of a feedback loop over several pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackLoopResult {
    pub pages_analyzed: usize,
    pub analyses: Vec<FeedbackAnalysis>,
    pub summary: HealthSummary,
    /// Distinct recommendations across all pages, first-seen order
    pub recommendations: Vec<String>,
}

impl FeedbackLoopResult {
    pub fn from_analyses(analyses: Vec<FeedbackAnalysis>) -> Self {
        let mut recommendations = Vec::new();
        for rec in analyses.iter().flat_map(|a| a.recommendations.iter()) {
            push_unique(&mut recommendations, rec.clone());
        }
        Self {
            pages_analyzed: analyses.len(),
            summary: HealthSummary::tally(&analyses),
            recommendations,
            analyses,
        }
    }
}

/// Classification thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackPolicy {
    /// CTR below this flags the title/snippet
    pub min_ctr: f64,
    /// Position beyond this needs attention
    pub attention_position: f64,
    /// Position beyond this is underperforming
    pub underperforming_position: f64,
    pub high_impressions: u64,
    pub snippet_min_clicks: u64,
    pub low_traffic_clicks: u64,
}

impl Default for FeedbackPolicy {
    fn default() -> Self {
        Self {
            min_ctr: thresholds::MIN_CTR,
            attention_position: thresholds::ATTENTION_POSITION,
            underperforming_position: thresholds::UNDERPERFORMING_POSITION,
            high_impressions: thresholds::HIGH_IMPRESSIONS,
            snippet_min_clicks: thresholds::SNIPPET_MIN_CLICKS,
            low_traffic_clicks: thresholds::LOW_TRAFFIC_CLICKS,
        }
    }
}

impl FeedbackPolicy {
    pub fn classify(&self, perf: &PagePerformance) -> FeedbackAnalysis {
        let ctr = perf.effective_ctr();
        let indexed = perf.impressions > 0;
        let mut recommendations = Vec::new();
        let mut actions = Vec::new();

        let status = if !indexed {
            recommendations.push(
                "Page has no impressions yet. It may not be indexed; request indexing and allow time for crawling."
                    .to_string(),
            );
            push_unique(&mut actions, SuggestedAction::Reindex);
            push_unique(&mut actions, SuggestedAction::WaitForIndexing);
            HealthStatus::NotIndexed
        } else {
            let mut status = HealthStatus::Healthy;

            if ctr < self.min_ctr {
                push_unique(
                    &mut recommendations,
                    format!(
                        "CTR is low ({:.2}%). Improve the title tag and meta description.",
                        ctr * 100.0
                    ),
                );
                push_unique(&mut actions, SuggestedAction::ImproveTitle);
            }

            if perf.avg_position > self.underperforming_position {
                status = status.degrade(HealthStatus::Underperforming);
                push_unique(
                    &mut recommendations,
                    format!(
                        "Average position is {:.1}. Expand the content and add internal links.",
                        perf.avg_position
                    ),
                );
                push_unique(&mut actions, SuggestedAction::UpdateContent);
                push_unique(&mut actions, SuggestedAction::AddInternalLinks);
            } else if perf.avg_position > self.attention_position {
                status = status.degrade(HealthStatus::NeedsAttention);
                push_unique(
                    &mut recommendations,
                    format!(
                        "Average position is {:.1}, close to page one. Update the content to push it higher.",
                        perf.avg_position
                    ),
                );
                push_unique(&mut actions, SuggestedAction::UpdateContent);
            }

            if perf.impressions > self.high_impressions && perf.clicks < self.snippet_min_clicks {
                push_unique(
                    &mut recommendations,
                    "Many impressions but few clicks. Optimize the search snippet.".to_string(),
                );
                push_unique(&mut actions, SuggestedAction::ImproveTitle);
            }

            if perf.clicks < self.low_traffic_clicks && perf.avg_position <= self.attention_position
            {
                push_unique(
                    &mut recommendations,
                    "Ranking well but traffic is low. Check the search volume of the target queries."
                        .to_string(),
                );
            }

            status
        };

        if recommendations.is_empty() {
            recommendations.push("Page is performing well. Keep monitoring.".to_string());
        }

        FeedbackAnalysis {
            url: perf.url.clone(),
            status,
            metrics: PageMetrics {
                indexed,
                clicks: perf.clicks,
                impressions: perf.impressions,
                ctr,
                avg_position: perf.avg_position,
            },
            recommendations,
            suggested_actions: actions,
        }
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perf(clicks: u64, impressions: u64, avg_position: f64) -> PagePerformance {
        PagePerformance::new("https://example.test/page", clicks, impressions, avg_position)
    }

    #[test]
    fn test_not_indexed() {
        let analysis = FeedbackPolicy::default().classify(&perf(0, 0, 0.0));
        assert_eq!(analysis.status, HealthStatus::NotIndexed);
        assert!(!analysis.metrics.indexed);
        assert!(analysis.suggested_actions.contains(&SuggestedAction::Reindex));
        assert!(analysis.suggested_actions.contains(&SuggestedAction::WaitForIndexing));
    }

    #[test]
    fn test_underperforming_dominates() {
        let analysis = FeedbackPolicy::default().classify(&perf(50, 500, 25.0));
        assert_eq!(analysis.status, HealthStatus::Underperforming);
        assert!(analysis.suggested_actions.contains(&SuggestedAction::UpdateContent));
        assert!(analysis.suggested_actions.contains(&SuggestedAction::AddInternalLinks));
    }

    #[test]
    fn test_healthy_single_acknowledgement() {
        let analysis = FeedbackPolicy::default().classify(&perf(100, 1000, 5.0));
        assert_eq!(analysis.status, HealthStatus::Healthy);
        assert_eq!(analysis.recommendations.len(), 1);
        assert!(analysis.recommendations[0].contains("performing well"));
        assert!(analysis.suggested_actions.is_empty());
    }

    #[test]
    fn test_needs_attention_band() {
        let analysis = FeedbackPolicy::default().classify(&perf(100, 1000, 15.0));
        assert_eq!(analysis.status, HealthStatus::NeedsAttention);
        assert_eq!(analysis.suggested_actions, vec![SuggestedAction::UpdateContent]);

        // 20 is still inside the attention band
        let analysis = FeedbackPolicy::default().classify(&perf(100, 1000, 20.0));
        assert_eq!(analysis.status, HealthStatus::NeedsAttention);
    }

    #[test]
    fn test_improve_title_deduplicated() {
        // Low CTR and high-impression/low-click both suggest improve_title
        let analysis = FeedbackPolicy::default().classify(&perf(1, 1000, 3.0));
        assert_eq!(analysis.status, HealthStatus::Healthy);
        assert_eq!(analysis.suggested_actions, vec![SuggestedAction::ImproveTitle]);
        assert_eq!(analysis.recommendations.len(), 3);
    }

    #[test]
    fn test_low_traffic_is_advisory() {
        let analysis = FeedbackPolicy::default().classify(&perf(3, 60, 4.0));
        assert_eq!(analysis.status, HealthStatus::Healthy);
        assert!(analysis.suggested_actions.is_empty());
        assert!(
            analysis
                .recommendations
                .iter()
                .any(|r| r.contains("search volume"))
        );
    }

    #[test]
    fn test_reported_ctr_is_not_trusted() {
        let mut page = perf(100, 1000, 5.0);
        page.ctr = 0.0;
        let analysis = FeedbackPolicy::default().classify(&page);
        assert_eq!(analysis.status, HealthStatus::Healthy);
        assert!((analysis.metrics.ctr - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_thresholds_configurable() {
        let policy = FeedbackPolicy {
            underperforming_position: 4.0,
            ..FeedbackPolicy::default()
        };
        let analysis = policy.classify(&perf(100, 1000, 5.0));
        assert_eq!(analysis.status, HealthStatus::Underperforming);
    }

    #[test]
    fn test_loop_result_summary() {
        let policy = FeedbackPolicy::default();
        let analyses = vec![
            policy.classify(&perf(100, 1000, 5.0)),
            policy.classify(&perf(0, 0, 0.0)),
            FeedbackAnalysis::from_error("https://example.test/x", "boom"),
            policy.classify(&perf(50, 500, 25.0)),
        ];
        let result = FeedbackLoopResult::from_analyses(analyses);
        assert_eq!(result.pages_analyzed, 4);
        assert_eq!(result.summary.healthy, 1);
        assert_eq!(result.summary.not_indexed, 2);
        assert_eq!(result.summary.underperforming, 1);
        assert!(result.recommendations.iter().any(|r| r.contains("boom")));
    }

    #[test]
    fn test_serialized_names() {
        let analysis = FeedbackPolicy::default().classify(&perf(0, 0, 0.0));
        let value = serde_json::to_value(&analysis).unwrap();
        assert_eq!(value["status"], "not_indexed");
        assert_eq!(value["suggestedActions"][1], "wait_for_indexing");
    }
}
