//! Periodic sync scheduler
//!
//! Ticks on a fixed interval and also accepts manual sync requests. Both
//! paths go through [`SyncEngine::sync_now`], so a request that lands while
//! a cycle is running is dropped by the engine.
//!
//! Cycles run as tasks owned by the scheduler. Shutdown stops new cycles and
//! waits for the running one to finish persisting before it returns.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::engine::{SyncEngine, SyncOutcome};
use crate::error::QuoteError;
use crate::remote::RemoteSource;

/// Commands sent to the scheduler task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Start a cycle now
    SyncNow,
    /// Stop the scheduler
    Shutdown,
}

/// Handle for controlling the scheduler task
pub struct SchedulerHandle {
    pub command_tx: mpsc::Sender<SchedulerCommand>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask for an immediate cycle
    pub async fn sync_now(&self) -> bool {
        self.command_tx.send(SchedulerCommand::SyncNow).await.is_ok()
    }

    /// Stop ticking and wait for the task and any running cycle to exit
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(SchedulerCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            warn!("Sync scheduler ended abnormally: {}", e);
        }
    }
}

/// Spawn the scheduler; the first cycle starts immediately
pub fn spawn_scheduler<R: RemoteSource>(
    engine: Arc<SyncEngine<R>>,
    interval: Duration,
) -> SchedulerHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let task = tokio::spawn(scheduler_loop(engine, interval, command_rx));
    SchedulerHandle { command_tx, task }
}

async fn scheduler_loop<R: RemoteSource>(
    engine: Arc<SyncEngine<R>>,
    interval: Duration,
    mut command_rx: mpsc::Receiver<SchedulerCommand>,
) {
    info!("Sync scheduler started, interval {:?}", interval);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycles = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => start_cycle(&engine, &mut cycles),
            cmd = command_rx.recv() => match cmd {
                Some(SchedulerCommand::SyncNow) => start_cycle(&engine, &mut cycles),
                Some(SchedulerCommand::Shutdown) | None => break,
            },
            Some(finished) = cycles.join_next(), if !cycles.is_empty() => {
                report_panicked(finished);
            }
        }
    }

    if !cycles.is_empty() {
        debug!("Waiting for {} sync cycle(s) to finish", cycles.len());
    }
    while let Some(finished) = cycles.join_next().await {
        report_panicked(finished);
    }

    info!("Sync scheduler stopped");
}

/// Run a cycle in its own task so manual requests can overlap and be dropped
fn start_cycle<R: RemoteSource>(engine: &Arc<SyncEngine<R>>, cycles: &mut JoinSet<()>) {
    let engine = Arc::clone(engine);
    cycles.spawn(async move {
        match engine.sync_now().await {
            Ok(SyncOutcome::Updated(_)) | Ok(SyncOutcome::Unchanged) => {}
            Err(QuoteError::SyncInProgress) => debug!("Skipped overlapping sync request"),
            Err(e) => debug!("Scheduled sync failed, next tick retries: {}", e),
        }
    });
}

fn report_panicked(finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        warn!("Sync cycle ended abnormally: {}", e);
    }
}
