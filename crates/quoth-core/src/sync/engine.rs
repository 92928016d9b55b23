//! Sync engine
//!
//! Runs one fetch -> merge -> persist cycle at a time against the shared
//! repository. A request that arrives while a cycle is running is dropped
//! with [`QuoteError::SyncInProgress`].
//!
//! The merge runs against the collection as it is on disk at merge time,
//! so quotes another process saved between cycles survive the overwrite.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use super::merge::{reconcile, ConflictReport};
use crate::error::{QuoteError, QuoteResult};
use crate::models::QuoteId;
use crate::remote::RemoteSource;
use crate::repository::QuoteRepository;

/// Where the engine is within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Idle,
    Fetching,
    Merging,
    Persisting,
    /// The current cycle failed; the engine returns to `Idle` right after
    Failed,
}

/// Events emitted by the engine and the outbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Cycle phase changed
    PhaseChanged(SyncPhase),
    /// A cycle changed the collection
    Completed { added: usize, overwritten: usize },
    /// A cycle failed; carries the user-facing notification
    Failed(String),
    /// A request was dropped because a cycle was already running
    Skipped,
    /// A local quote reached the remote side
    Pushed(QuoteId),
    /// A local quote could not be pushed; it will not be retried
    PushFailed { id: QuoteId, error: String },
}

/// Counts from a cycle that changed the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub added: usize,
    pub overwritten: usize,
}

impl From<&ConflictReport> for SyncSummary {
    fn from(report: &ConflictReport) -> Self {
        Self {
            added: report.added_count(),
            overwritten: report.overwritten_count(),
        }
    }
}

/// Result of a successful cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Updated(SyncSummary),
    Unchanged,
}

/// Clears the in-flight flag when a cycle ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncEngine<R: RemoteSource> {
    repo: Arc<Mutex<QuoteRepository>>,
    remote: Arc<R>,
    timeout: Duration,
    in_flight: AtomicBool,
    phase: watch::Sender<SyncPhase>,
    phase_rx: watch::Receiver<SyncPhase>,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<SyncEvent>>,
    last_report: Mutex<Option<ConflictReport>>,
}

impl<R: RemoteSource> SyncEngine<R> {
    pub fn new(repo: Arc<Mutex<QuoteRepository>>, remote: Arc<R>, timeout: Duration) -> Self {
        let (phase, phase_rx) = watch::channel(SyncPhase::Idle);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            repo,
            remote,
            timeout,
            in_flight: AtomicBool::new(false),
            phase,
            phase_rx,
            event_tx,
            event_rx: Some(event_rx),
            last_report: Mutex::new(None),
        }
    }

    pub fn repository(&self) -> &Arc<Mutex<QuoteRepository>> {
        &self.repo
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    /// Current phase
    pub fn phase(&self) -> SyncPhase {
        *self.phase_rx.borrow()
    }

    /// Subscribe to phase changes
    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase_rx.clone()
    }

    /// Take the event receiver (can only be called once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SyncEvent>> {
        self.event_rx.take()
    }

    /// Sender for components that report into the same event stream
    pub fn event_sender(&self) -> mpsc::UnboundedSender<SyncEvent> {
        self.event_tx.clone()
    }

    /// Whether a cycle is running right now
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Report of the last cycle that changed something
    pub async fn last_report(&self) -> Option<ConflictReport> {
        self.last_report.lock().await.clone()
    }

    /// Run one sync cycle now
    ///
    /// Network failures and timeouts leave the collection untouched. A
    /// failed save after a merge keeps the merged collection in memory.
    pub async fn sync_now(&self) -> QuoteResult<SyncOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Sync requested while another cycle is running, dropping it");
            self.emit(SyncEvent::Skipped);
            return Err(QuoteError::SyncInProgress);
        }
        let _in_flight = InFlight(&self.in_flight);

        let result = self.run_cycle().await;

        match &result {
            Ok(SyncOutcome::Updated(summary)) => {
                info!(
                    "Sync complete: {} added, {} overwritten",
                    summary.added, summary.overwritten
                );
                self.emit(SyncEvent::Completed {
                    added: summary.added,
                    overwritten: summary.overwritten,
                });
            }
            Ok(SyncOutcome::Unchanged) => debug!("Sync complete, nothing changed"),
            Err(e) => {
                warn!("Sync failed: {}", e);
                self.set_phase(SyncPhase::Failed);
                self.emit(SyncEvent::Failed(e.notification()));
            }
        }

        self.set_phase(SyncPhase::Idle);
        result
    }

    async fn run_cycle(&self) -> QuoteResult<SyncOutcome> {
        self.set_phase(SyncPhase::Fetching);
        let batch = tokio::time::timeout(self.timeout, self.remote.fetch_remote_quotes())
            .await
            .map_err(|_| QuoteError::Timeout(self.timeout))??;
        debug!("Fetched {} remote quotes", batch.len());

        self.set_phase(SyncPhase::Merging);
        let mut repo = self.repo.lock().await;
        // Other processes may have saved quotes since this one last looked
        repo.reload();
        let outcome = reconcile(repo.snapshot(), batch);
        if !outcome.report.has_changes() {
            return Ok(SyncOutcome::Unchanged);
        }

        for conflict in &outcome.report.conflicts {
            debug!(
                "Quote {} overwritten by remote ({})",
                conflict.remote_version.id, conflict.resolution
            );
        }

        self.set_phase(SyncPhase::Persisting);
        let summary = SyncSummary::from(&outcome.report);
        *self.last_report.lock().await = Some(outcome.report);
        repo.replace_all(outcome.merged)?;

        Ok(SyncOutcome::Updated(summary))
    }

    fn set_phase(&self, phase: SyncPhase) {
        let _ = self.phase.send(phase);
        self.emit(SyncEvent::PhaseChanged(phase));
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.event_tx.send(event);
    }
}
