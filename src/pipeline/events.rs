//! Pipeline Events
//!
//! Lifecycle notifications delivered to registered observers. Delivery is
//! fire-and-forget: an observer that returns an error or panics is logged and
//! skipped, and the run carries on.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::status::PipelinePhase;
use crate::google::HealthSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PipelineEvent {
    Start {
        total_units: usize,
    },
    UnitStart {
        index: usize,
        total: usize,
        label: String,
        slug: String,
    },
    PhaseComplete {
        slug: String,
        phase: PipelinePhase,
        elapsed_ms: u64,
    },
    UnitComplete {
        slug: String,
        url: String,
        total_ms: u64,
    },
    UnitError {
        slug: String,
        phase: PipelinePhase,
        error: String,
    },
    IndexingStart {
        total: usize,
    },
    IndexingComplete {
        successful: usize,
        failed: usize,
        success_rate: f64,
    },
    FeedbackStart {
        total: usize,
    },
    FeedbackComplete {
        summary: HealthSummary,
    },
    Complete {
        successful: usize,
        failed: usize,
        total_ms: u64,
    },
}

impl PipelineEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::UnitStart { .. } => "unit_start",
            Self::PhaseComplete { .. } => "phase_complete",
            Self::UnitComplete { .. } => "unit_complete",
            Self::UnitError { .. } => "unit_error",
            Self::IndexingStart { .. } => "indexing_start",
            Self::IndexingComplete { .. } => "indexing_complete",
            Self::FeedbackStart { .. } => "feedback_start",
            Self::FeedbackComplete { .. } => "feedback_complete",
            Self::Complete { .. } => "complete",
        }
    }
}

/// Receives every pipeline event
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent) -> anyhow::Result<()>;
}

impl<F> PipelineObserver for F
where
    F: Fn(&PipelineEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, event: &PipelineEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// Registered observers, invoked in registration order
#[derive(Default)]
pub struct ObserverList {
    observers: RwLock<Vec<Arc<dyn PipelineObserver>>>,
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("count", &self.len())
            .finish()
    }
}

impl ObserverList {
    pub fn register(&self, observer: Arc<dyn PipelineObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers
            .read()
            .map(|o| o.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every observer
    pub fn emit(&self, event: &PipelineEvent) {
        // Snapshot so observers may register others without deadlocking
        let observers: Vec<_> = self
            .observers
            .read()
            .map(|o| o.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone());

        for observer in observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(event = event.kind(), error = %e, "Pipeline observer failed");
                }
                Err(_) => {
                    error!(event = event.kind(), "Pipeline observer panicked");
                }
            }
        }
    }
}
