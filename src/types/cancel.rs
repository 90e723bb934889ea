//! Cooperative cancellation for batch loops
//!
//! Batches check the signal before launching each item. Items already in
//! flight always run to completion.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Error text recorded for batch items that were never launched
pub const CANCELLED_BEFORE_START: &str = "cancelled before start";

/// Cloneable stop flag with an optional deadline
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that trips on its own once `timeout` has elapsed
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_cancelled());
        signal.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_deadline_trips() {
        let signal = CancelSignal::with_deadline(Duration::ZERO);
        assert!(signal.is_cancelled());

        let signal = CancelSignal::with_deadline(Duration::from_secs(3600));
        assert!(!signal.is_cancelled());
    }
}
