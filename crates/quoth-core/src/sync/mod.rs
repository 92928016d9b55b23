//! Keeping the local collection in step with the remote source
//!
//! ## Flow
//!
//! 1. The scheduler ticks (or a manual request arrives)
//! 2. The engine fetches a bounded remote batch
//! 3. The batch is reconciled into the local collection, remote wins
//! 4. The merged collection is persisted and a summary event is emitted
//!
//! New local quotes travel the other way through the [`Outbox`].
//!
//! ## Usage
//!
//! ```ignore
//! let engine = Arc::new(SyncEngine::new(repo, Arc::new(remote), timeout));
//! let scheduler = spawn_scheduler(engine.clone(), config.sync_interval());
//! ```

mod engine;
mod merge;
mod outbox;
mod scheduler;

pub use engine::{SyncEngine, SyncEvent, SyncOutcome, SyncPhase, SyncSummary};
pub use merge::{reconcile, Conflict, ConflictReport, MergeOutcome, Resolution};
pub use outbox::Outbox;
pub use scheduler::{spawn_scheduler, SchedulerCommand, SchedulerHandle};
