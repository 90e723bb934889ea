//! Console Progress
//!
//! Pipeline observer that prints one line per lifecycle event to stderr,
//! keeping stdout free for results.

use console::style;

use crate::pipeline::{PipelineEvent, PipelineObserver};

#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    /// Rendered line for `event`, `None` for events not worth a line
    pub fn line(event: &PipelineEvent) -> Option<String> {
        let line = match event {
            PipelineEvent::Start { total_units } => {
                format!("{} Generating {} page(s)", style("▶").cyan(), total_units)
            }
            PipelineEvent::UnitStart {
                index,
                total,
                label,
                slug,
            } => format!(
                "{} {} {} ({})",
                style(format!("[{}/{}]", index + 1, total)).dim(),
                style(label).bold(),
                style("→").dim(),
                slug
            ),
            PipelineEvent::PhaseComplete {
                phase, elapsed_ms, ..
            } => format!("    {} {} {}ms", style("·").dim(), phase, elapsed_ms),
            PipelineEvent::UnitComplete { url, total_ms, .. } => {
                format!("    {} {} ({}ms)", style("✓").green(), url, total_ms)
            }
            PipelineEvent::UnitError { phase, error, .. } => {
                format!("    {} {} failed: {}", style("✗").red(), phase, error)
            }
            PipelineEvent::IndexingStart { total } => {
                format!("{} Submitting {} URL(s) for indexing", style("▶").cyan(), total)
            }
            PipelineEvent::IndexingComplete {
                successful,
                failed,
                success_rate,
            } => format!(
                "    {} {} submitted, {} failed ({:.0}%)",
                style("✓").green(),
                successful,
                failed,
                success_rate * 100.0
            ),
            PipelineEvent::FeedbackStart { total } => {
                format!("{} Analyzing {} page(s)", style("▶").cyan(), total)
            }
            PipelineEvent::FeedbackComplete { .. } => return None,
            PipelineEvent::Complete {
                successful,
                failed,
                total_ms,
            } => format!(
                "{} Done: {} succeeded, {} failed in {:.1}s",
                style("■").cyan(),
                successful,
                failed,
                *total_ms as f64 / 1000.0
            ),
        };
        Some(line)
    }
}

impl PipelineObserver for ConsoleReporter {
    fn on_event(&self, event: &PipelineEvent) -> anyhow::Result<()> {
        if let Some(line) = Self::line(event) {
            eprintln!("{}", line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelinePhase;

    #[test]
    fn test_lines() {
        console::set_colors_enabled(false);

        let line = ConsoleReporter::line(&PipelineEvent::UnitStart {
            index: 0,
            total: 3,
            label: "Bakery".to_string(),
            slug: "bakery".to_string(),
        })
        .unwrap();
        assert_eq!(line, "[1/3] Bakery → (bakery)");

        let line = ConsoleReporter::line(&PipelineEvent::UnitError {
            slug: "bakery".to_string(),
            phase: PipelinePhase::Writer,
            error: "boom".to_string(),
        })
        .unwrap();
        assert!(line.ends_with("writer failed: boom"));

        assert!(
            ConsoleReporter::line(&PipelineEvent::FeedbackComplete {
                summary: Default::default()
            })
            .is_none()
        );
    }
}
