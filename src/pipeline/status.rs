//! Run-level status
//!
//! ```text
//! idle → architect → writer → render → [indexing] → [feedback] → complete
//!           └──────────┴─────────┴──→ error (one unit; the run continues)
//! ```

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    #[default]
    Idle,
    Architect,
    Writer,
    Render,
    Indexing,
    Feedback,
    Complete,
    Error,
}

impl PipelinePhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Architect => "architect",
            Self::Writer => "writer",
            Self::Render => "render",
            Self::Indexing => "indexing",
            Self::Feedback => "feedback",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    /// Rounded, 0 for an empty run
    pub percentage: u8,
}

impl Progress {
    pub fn new(current: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            ((current.min(total) as f64 / total as f64) * 100.0).round() as u8
        };
        Self {
            current,
            total,
            percentage,
        }
    }
}

/// Snapshot of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub phase: PipelinePhase,
    pub current_unit: Option<String>,
    pub progress: Progress,
    pub last_error: Option<String>,
}

/// Shared, lock-guarded [`RunStatus`]
#[derive(Debug, Default)]
pub struct StatusTracker {
    inner: RwLock<RunStatus>,
}

impl StatusTracker {
    pub fn snapshot(&self) -> RunStatus {
        self.inner
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn set_phase(&self, phase: PipelinePhase) {
        self.update(|s| s.phase = phase);
    }

    pub fn start_unit(&self, label: &str, current: usize, total: usize) {
        self.update(|s| {
            s.phase = PipelinePhase::Architect;
            s.current_unit = Some(label.to_string());
            s.progress = Progress::new(current, total);
        });
    }

    pub fn set_progress(&self, current: usize, total: usize) {
        self.update(|s| s.progress = Progress::new(current, total));
    }

    pub fn record_error(&self, error: impl Into<String>) {
        let error = error.into();
        self.update(|s| {
            s.phase = PipelinePhase::Error;
            s.last_error = Some(error);
        });
    }

    pub fn finish(&self) {
        self.update(|s| {
            s.phase = PipelinePhase::Complete;
            s.current_unit = None;
        });
    }

    fn update(&self, f: impl FnOnce(&mut RunStatus)) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percentage() {
        assert_eq!(Progress::new(1, 3).percentage, 33);
        assert_eq!(Progress::new(2, 3).percentage, 67);
        assert_eq!(Progress::new(3, 3).percentage, 100);
        assert_eq!(Progress::new(0, 0).percentage, 0);
    }

    #[test]
    fn test_tracker_transitions() {
        let tracker = StatusTracker::default();
        assert_eq!(tracker.snapshot().phase, PipelinePhase::Idle);

        tracker.start_unit("dentist", 1, 2);
        let status = tracker.snapshot();
        assert_eq!(status.phase, PipelinePhase::Architect);
        assert_eq!(status.current_unit.as_deref(), Some("dentist"));

        tracker.record_error("render failed");
        assert_eq!(tracker.snapshot().phase, PipelinePhase::Error);

        tracker.finish();
        let status = tracker.snapshot();
        assert_eq!(status.phase, PipelinePhase::Complete);
        assert_eq!(status.last_error.as_deref(), Some("render failed"));
    }

    #[test]
    fn test_serialized_phase_names() {
        let value = serde_json::to_value(RunStatus::default()).unwrap();
        assert_eq!(value["phase"], "idle");
        assert!(value.get("currentUnit").is_some());
    }
}
