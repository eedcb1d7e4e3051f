//! Single-flight full rebuilds.
//!
//! At most one worker thread rebuilds a list at a time. [`RebuildCoordinator::update`]
//! cancels and joins the previous worker before resetting progress and
//! spawning the next one, all under the worker-slot mutex, so two rounds can
//! never overlap.
//!
//! Cancellation is cooperative. The worker checks its token after reading
//! the portfolio, before every batch, and again right before every commit,
//! so a superseding `update` waits at most for one batch's create call.
//! A batch cancelled before its commit is rolled back by dropping its
//! transaction.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use autolist_core::{
    CollaboratorError, Collaborators, ExecutionContext, ListId, ListItem, MemberKey, Principal,
    ProjectList, UpdaterConfig,
};

use crate::error::{UpdateError, WriteStage};
use crate::progress::{ProgressTracker, RoundState, StopGuard, WaitOutcome};

/// How a round that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RoundOutcome {
    /// Every batch was committed.
    Completed {
        round: u64,
        processed: usize,
        batches: usize,
    },
    /// The round was superseded or aborted; `processed` items stayed committed.
    Cancelled { round: u64, processed: usize },
}

impl RoundOutcome {
    pub fn round(&self) -> u64 {
        match self {
            RoundOutcome::Completed { round, .. } | RoundOutcome::Cancelled { round, .. } => *round,
        }
    }

    pub fn processed(&self) -> usize {
        match self {
            RoundOutcome::Completed { processed, .. }
            | RoundOutcome::Cancelled { processed, .. } => *processed,
        }
    }
}

/// What the last reaped worker reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    pub round: u64,
    pub outcome: Option<RoundOutcome>,
    pub error: Option<String>,
}

impl RoundReport {
    fn from_result(round: u64, result: &Result<RoundOutcome, UpdateError>) -> Self {
        match result {
            Ok(outcome) => Self {
                round,
                outcome: Some(*outcome),
                error: None,
            },
            Err(err) => Self {
                round,
                outcome: None,
                error: Some(err.to_string()),
            },
        }
    }
}

struct RunningWorker {
    round: u64,
    cancel: CancellationToken,
    handle: JoinHandle<Result<RoundOutcome, UpdateError>>,
}

pub struct RebuildCoordinator {
    list: ProjectList,
    collaborators: Collaborators,
    tick_count: usize,
    thread_name: String,
    progress: Arc<ProgressTracker>,
    worker: Mutex<Option<RunningWorker>>,
    last_report: Mutex<Option<RoundReport>>,
}

impl RebuildCoordinator {
    pub fn new(
        list: ProjectList,
        collaborators: Collaborators,
        config: &UpdaterConfig,
    ) -> Result<Self, UpdateError> {
        config.validate()?;
        let thread_name = format!("{}-{}", config.worker_thread_name_prefix, list.id);
        Ok(Self {
            list,
            collaborators,
            tick_count: config.tick_count,
            thread_name,
            progress: Arc::new(ProgressTracker::new()),
            worker: Mutex::new(None),
            last_report: Mutex::new(None),
        })
    }

    /// Abort any running round and start a new one on behalf of `caller`.
    ///
    /// Returns the new round number without waiting for the rebuild.
    pub fn update(&self, caller: &Principal) -> Result<u64, UpdateError> {
        let mut slot = self.worker.lock();
        if let Some(previous) = slot.take() {
            previous.cancel.cancel();
            self.progress.request_cancel();
            let _ = self.reap(previous);
        }

        let round = self.progress.reset();
        let cancel = CancellationToken::new();
        let job = RoundJob {
            list: self.list.id.clone(),
            caller: caller.clone(),
            collaborators: self.collaborators.clone(),
            progress: self.progress.clone(),
            cancel: cancel.clone(),
            tick_count: self.tick_count,
            round,
        };

        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || job.run());
        match spawned {
            Ok(handle) => {
                tracing::info!(list = %self.list.id, round, caller = %caller.id, "rebuild started");
                *slot = Some(RunningWorker {
                    round,
                    cancel,
                    handle,
                });
                Ok(round)
            }
            Err(err) => {
                self.progress.mark_stopped();
                Err(UpdateError::Spawn(err))
            }
        }
    }

    /// Cancel the running round, if any, and wait for its worker to exit.
    pub fn abort(&self) {
        let mut slot = self.worker.lock();
        if let Some(worker) = slot.take() {
            tracing::info!(list = %self.list.id, round = worker.round, "aborting rebuild");
            worker.cancel.cancel();
            self.progress.request_cancel();
            let _ = self.reap(worker);
        }
    }

    /// Wait for the current round to finish on its own and return its result.
    ///
    /// `None` when no worker has run since the last abort/join.
    pub fn join_round(&self) -> Option<Result<RoundOutcome, UpdateError>> {
        let mut slot = self.worker.lock();
        let worker = slot.take()?;
        Some(self.reap(worker))
    }

    fn reap(&self, worker: RunningWorker) -> Result<RoundOutcome, UpdateError> {
        let result = worker.handle.join().unwrap_or_else(|_| {
            Err(UpdateError::WorkerPanicked {
                list: self.list.id.clone(),
            })
        });
        match &result {
            Ok(RoundOutcome::Completed {
                processed, batches, ..
            }) => tracing::info!(
                list = %self.list.id,
                round = worker.round,
                processed,
                batches,
                "rebuild completed",
            ),
            Ok(RoundOutcome::Cancelled { processed, .. }) => tracing::warn!(
                list = %self.list.id,
                round = worker.round,
                processed,
                "rebuild cancelled",
            ),
            Err(err) => tracing::error!(
                list = %self.list.id,
                round = worker.round,
                error = %err,
                "rebuild failed",
            ),
        }
        *self.last_report.lock() = Some(RoundReport::from_result(worker.round, &result));
        result
    }

    /// Whether a worker thread is still executing a round.
    pub fn worker_active(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn last_report(&self) -> Option<RoundReport> {
        self.last_report.lock().clone()
    }

    /// Block until page `page` of size `page_size` is safe to read.
    pub fn wait_for_page_updated(&self, page: usize, page_size: usize) -> RoundState {
        self.progress
            .wait_until(|state| state.page_ready(page, page_size))
    }

    pub fn wait_for_page_updated_timeout(
        &self,
        page: usize,
        page_size: usize,
        timeout: Duration,
    ) -> WaitOutcome {
        self.progress
            .wait_until_timeout(timeout, |state| state.page_ready(page, page_size))
    }
}

impl Drop for RebuildCoordinator {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Everything one worker thread needs, captured when the round starts.
struct RoundJob {
    list: ListId,
    caller: Principal,
    collaborators: Collaborators,
    progress: Arc<ProgressTracker>,
    cancel: CancellationToken,
    tick_count: usize,
    round: u64,
}

impl RoundJob {
    fn run(self) -> Result<RoundOutcome, UpdateError> {
        let _stopped = StopGuard::new(&self.progress);

        let ctx = self
            .collaborators
            .contexts
            .establish(&self.caller)
            .map_err(UpdateError::Context)?;

        let members = self
            .collaborators
            .portfolio
            .portfolio_members(&ctx, &self.list)
            .map_err(|source| UpdateError::PortfolioRead {
                list: self.list.clone(),
                source,
            })?;

        if self.cancel.is_cancelled() {
            return Ok(self.cancelled(0));
        }

        self.clear(&ctx)?;

        let members: Vec<MemberKey> = members.into_iter().collect();
        let mut processed = 0;
        let mut batches = 0;
        for (batch, chunk) in members.chunks(self.tick_count).enumerate() {
            if self.cancel.is_cancelled() {
                return Ok(self.cancelled(processed));
            }
            let offset = batch * self.tick_count;
            let items: Vec<ListItem> = chunk
                .iter()
                .enumerate()
                .map(|(i, key)| {
                    ListItem::new(self.list.clone(), key.clone(), Some((offset + i) as u64))
                })
                .collect();

            if !self.write_batch(&ctx, batch, &items)? {
                return Ok(self.cancelled(processed));
            }
            processed += items.len();
            batches += 1;
            self.progress.advance(items.len());
            tracing::debug!(
                list = %self.list,
                round = self.round,
                batch,
                processed,
                "batch committed",
            );
        }

        self.progress.mark_completed();
        Ok(RoundOutcome::Completed {
            round: self.round,
            processed,
            batches,
        })
    }

    fn clear(&self, ctx: &ExecutionContext) -> Result<(), UpdateError> {
        let write_err = |source: CollaboratorError| UpdateError::Write {
            list: self.list.clone(),
            stage: WriteStage::Clear,
            source,
        };
        let mut tx = self.collaborators.writer.begin(ctx).map_err(write_err)?;
        let removed = tx.delete_items_by_list(&self.list).map_err(write_err)?;
        tx.commit().map_err(write_err)?;
        tracing::debug!(list = %self.list, round = self.round, removed, "list cleared");
        Ok(())
    }

    /// Returns `false` when cancellation arrived before the commit.
    fn write_batch(
        &self,
        ctx: &ExecutionContext,
        batch: usize,
        items: &[ListItem],
    ) -> Result<bool, UpdateError> {
        let write_err = |source: CollaboratorError| UpdateError::Write {
            list: self.list.clone(),
            stage: WriteStage::Batch(batch),
            source,
        };
        let mut tx = self.collaborators.writer.begin(ctx).map_err(write_err)?;
        tx.create_items(items).map_err(write_err)?;
        if self.cancel.is_cancelled() {
            return Ok(false);
        }
        tx.commit().map_err(write_err)?;
        Ok(true)
    }

    fn cancelled(&self, processed: usize) -> RoundOutcome {
        RoundOutcome::Cancelled {
            round: self.round,
            processed,
        }
    }
}
