//! Per-ingest state machine with advisory progress.
//!
//! Each ingest walks Queued → Probing → Persisting → Complete | Failed.
//! Probing never fails terminally (the probe degrades instead), so the only
//! branch point is at Persisting. The percent is advisory and estimated; it
//! does not reflect byte-level I/O progress.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors for illegal state-machine use
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid ingest transition: {from:?} → {to:?}")]
    InvalidTransition { from: IngestPhase, to: IngestPhase },
}

/// Phase of a single ingest operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestPhase {
    /// File selected, nothing started yet
    Queued,

    /// Deriving duration and thumbnail
    Probing,

    /// Writing metadata and payload to the store
    Persisting,

    /// Store write committed
    Complete,

    /// Store write failed; nothing persisted
    Failed,
}

impl IngestPhase {
    /// Whether `next` is a legal successor of this phase
    pub fn can_transition(self, next: IngestPhase) -> bool {
        matches!(
            (self, next),
            (IngestPhase::Queued, IngestPhase::Probing)
                | (IngestPhase::Probing, IngestPhase::Persisting)
                | (IngestPhase::Persisting, IngestPhase::Complete)
                | (IngestPhase::Persisting, IngestPhase::Failed)
        )
    }

    /// Complete and Failed are terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, IngestPhase::Complete | IngestPhase::Failed)
    }
}

/// State of one in-flight ingest, keyed by a transient id.
///
/// The percent is monotonically nondecreasing, capped at 95 until the job
/// reaches Complete, where it jumps to 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestJob {
    /// Transient identifier; unrelated to the record id assigned on success
    pub id: Uuid,

    /// Current phase
    pub phase: IngestPhase,

    /// Advisory progress in [0, 100]
    pub percent: u8,
}

impl IngestJob {
    /// Create a queued job with a fresh transient id
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: IngestPhase::Queued,
            percent: 0,
        }
    }

    /// Move to the next phase, enforcing the transition rules.
    ///
    /// Reaching Complete sets the percent to 100; Failed freezes it.
    pub fn advance(&mut self, next: IngestPhase) -> Result<(), IngestError> {
        if !self.phase.can_transition(next) {
            return Err(IngestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }

        self.phase = next;
        if next == IngestPhase::Complete {
            self.percent = 100;
        }

        Ok(())
    }

    /// Bump the advisory percent; no-op once terminal.
    ///
    /// Never exceeds 95 before completion and never decreases.
    pub fn bump(&mut self, step: u8) {
        if self.phase.is_terminal() {
            return;
        }
        self.percent = self.percent.saturating_add(step).min(95);
    }
}

impl Default for IngestJob {
    fn default() -> Self {
        Self::new()
    }
}
