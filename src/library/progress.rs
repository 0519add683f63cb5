//! Advisory ingest progress tracking.
//!
//! The tracker publishes estimated percentages for in-flight ingests,
//! keyed by a transient id. The numbers are cosmetic — a ticker task bumps
//! them on a timer — and never reflect byte-level I/O progress. The ticker
//! only ever mutates this map, never the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{IngestJob, IngestPhase};

/// Shared map of in-flight ingest jobs
#[derive(Debug, Clone, Default)]
pub struct UploadTracker {
    jobs: Arc<Mutex<HashMap<Uuid, IngestJob>>>,
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a queued job; returns its transient id
    pub fn register(&self) -> Uuid {
        let job = IngestJob::new();
        let id = job.id;
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.insert(id, job);
        }
        id
    }

    /// Advance a job's phase.
    ///
    /// Advisory: unknown ids and illegal transitions are logged and
    /// dropped, never surfaced to the ingest path.
    pub fn advance(&self, id: Uuid, phase: IngestPhase) {
        if let Ok(mut jobs) = self.jobs.lock() {
            if let Some(job) = jobs.get_mut(&id) {
                if let Err(e) = job.advance(phase) {
                    warn!(%id, "{e}");
                }
            }
        }
    }

    /// Spawn the ticker that bumps the percent until the job turns
    /// terminal or is retired
    pub fn start_ticker(&self, id: Uuid, tick: Duration, step: u8) -> JoinHandle<()> {
        let jobs = Arc::clone(&self.jobs);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(tick).await;
                let Ok(mut jobs) = jobs.lock() else { break };
                match jobs.get_mut(&id) {
                    Some(job) if !job.phase.is_terminal() => job.bump(step),
                    _ => break,
                }
            }
        })
    }

    /// Mark a job complete (percent jumps to 100) and retire it after
    /// `grace`
    pub fn complete(&self, id: Uuid, grace: Duration) {
        self.advance(id, IngestPhase::Complete);
        self.retire_after(id, grace);
    }

    /// Mark a job failed and retire it after `grace`
    pub fn fail(&self, id: Uuid, grace: Duration) {
        self.advance(id, IngestPhase::Failed);
        self.retire_after(id, grace);
    }

    fn retire_after(&self, id: Uuid, grace: Duration) {
        let jobs = Arc::clone(&self.jobs);
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Ok(mut jobs) = jobs.lock() {
                jobs.remove(&id);
            }
        });
    }

    /// Snapshot of advisory percents keyed by transient id
    pub fn snapshot(&self) -> HashMap<Uuid, u8> {
        match self.jobs.lock() {
            Ok(jobs) => jobs.iter().map(|(id, job)| (*id, job.percent)).collect(),
            Err(_) => HashMap::new(),
        }
    }

    /// Current phase of a job, if still tracked
    pub fn phase(&self, id: Uuid) -> Option<IngestPhase> {
        self.jobs
            .lock()
            .ok()
            .and_then(|jobs| jobs.get(&id).map(|job| job.phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_snapshot() {
        let tracker = UploadTracker::new();
        let id = tracker.register();

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.get(&id), Some(&0));
        assert_eq!(tracker.phase(id), Some(IngestPhase::Queued));
    }

    #[tokio::test]
    async fn test_ticker_caps_at_95() {
        let tracker = UploadTracker::new();
        let id = tracker.register();
        tracker.advance(id, IngestPhase::Probing);

        let ticker = tracker.start_ticker(id, Duration::from_millis(5), 50);
        tokio::time::sleep(Duration::from_millis(60)).await;

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.get(&id), Some(&95));

        ticker.abort();
    }

    #[tokio::test]
    async fn test_complete_jumps_to_100_then_retires() {
        let tracker = UploadTracker::new();
        let id = tracker.register();
        tracker.advance(id, IngestPhase::Probing);
        tracker.advance(id, IngestPhase::Persisting);

        tracker.complete(id, Duration::from_millis(30));
        assert_eq!(tracker.snapshot().get(&id), Some(&100));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(tracker.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_failed_job_retires() {
        let tracker = UploadTracker::new();
        let id = tracker.register();
        tracker.advance(id, IngestPhase::Probing);
        tracker.advance(id, IngestPhase::Persisting);

        tracker.fail(id, Duration::from_millis(30));
        assert_eq!(tracker.phase(id), Some(IngestPhase::Failed));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(tracker.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_ticker_stops_after_retirement() {
        let tracker = UploadTracker::new();
        let id = tracker.register();
        tracker.advance(id, IngestPhase::Probing);

        let ticker = tracker.start_ticker(id, Duration::from_millis(5), 5);
        tracker.advance(id, IngestPhase::Persisting);
        tracker.complete(id, Duration::from_millis(10));

        // The ticker observes the terminal phase and exits on its own
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(ticker.is_finished());
    }
}
