//! Sync command handlers

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::debug;

use quoth_core::sync::spawn_scheduler;
use quoth_core::{Config, HttpRemote, QuoteRepository, SyncEngine, SyncEvent, SyncOutcome};

use super::notify;
use crate::output::{print_json, Output};

/// Run one sync cycle against the remote source
pub async fn sync(repo: QuoteRepository, config: &Config, output: &Output) -> Result<()> {
    let engine = build_engine(repo, config)?;

    output.message(&format!("Syncing with {}...", config.remote_url));

    match engine.sync_now().await.map_err(notify)? {
        SyncOutcome::Updated(summary) => {
            if output.is_json() {
                print_json(&serde_json::json!({
                    "status": "updated",
                    "added": summary.added,
                    "overwritten": summary.overwritten,
                    "report": engine.last_report().await,
                }));
                return Ok(());
            }

            output.success(&format!(
                "Sync complete - {} added, {} overwritten",
                summary.added, summary.overwritten
            ));
            if let Some(report) = engine.last_report().await {
                for conflict in &report.conflicts {
                    output.message(&format!(
                        "  {}: \"{}\" replaced by \"{}\"",
                        conflict.remote_version.id,
                        conflict.local_version.text,
                        conflict.remote_version.text
                    ));
                }
            }
        }
        SyncOutcome::Unchanged => output.success("Sync complete - already up to date"),
    }

    Ok(())
}

/// Sync on the configured interval until Ctrl-C
pub async fn watch(repo: QuoteRepository, config: &Config, output: &Output) -> Result<()> {
    let mut engine = build_engine(repo, config)?;
    let mut events = engine
        .take_events()
        .context("Sync event stream already taken")?;
    let engine = Arc::new(engine);
    let interval = config.sync_interval();

    output.message(&format!(
        "Watching {} every {}s (Ctrl-C to stop)",
        config.remote_url,
        interval.as_secs()
    ));

    let scheduler = spawn_scheduler(engine.clone(), interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => report_event(event, output),
                None => break,
            },
            result = &mut shutdown => {
                if let Err(e) = result {
                    output.warn(&format!("Could not listen for Ctrl-C: {}", e));
                }
                break;
            }
        }
    }

    scheduler.shutdown().await;

    // A cycle may have merged without managing to save
    let mut repo = engine.repository().lock().await;
    repo.flush().map_err(notify)?;

    output.message("Stopped watching.");
    Ok(())
}

fn build_engine(repo: QuoteRepository, config: &Config) -> Result<SyncEngine<HttpRemote>> {
    let remote = HttpRemote::from_config(config).map_err(notify)?;
    Ok(SyncEngine::new(
        Arc::new(Mutex::new(repo)),
        Arc::new(remote),
        config.request_timeout(),
    ))
}

fn report_event(event: SyncEvent, output: &Output) {
    match event {
        SyncEvent::Completed { added, overwritten } => output.success(&format!(
            "Quotes synced from server - {} added, {} overwritten",
            added, overwritten
        )),
        SyncEvent::Failed(notification) => output.warn(&notification),
        SyncEvent::PhaseChanged(phase) => debug!("Sync phase: {:?}", phase),
        SyncEvent::Skipped => debug!("Sync request skipped, cycle already running"),
        SyncEvent::Pushed(_) | SyncEvent::PushFailed { .. } => {}
    }
}
