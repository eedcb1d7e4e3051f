//! One list's updater: full rebuilds plus incremental corrections.

use std::time::Duration;

use serde::Serialize;

use autolist_core::{Collaborators, ListId, MemberKey, Principal, ProjectList, UpdaterConfig};

use crate::error::UpdateError;
use crate::incremental::{IncrementalSummary, IncrementalUpdateCoordinator};
use crate::progress::{RoundState, WaitOutcome};
use crate::rebuild::{RebuildCoordinator, RoundOutcome, RoundReport};

/// Point-in-time view of an updater.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdaterStatus {
    pub list: ListId,
    pub round: RoundState,
    pub worker_active: bool,
    pub locked_keys: usize,
    pub last_report: Option<RoundReport>,
}

/// Bound to a single [`ProjectList`]; not reusable across lists.
///
/// Dropping the updater aborts a running rebuild.
pub struct AutoListUpdater {
    list: ProjectList,
    rebuild: RebuildCoordinator,
    incremental: IncrementalUpdateCoordinator,
}

impl AutoListUpdater {
    pub fn new(
        list: ProjectList,
        collaborators: Collaborators,
        config: &UpdaterConfig,
    ) -> Result<Self, UpdateError> {
        let rebuild = RebuildCoordinator::new(list.clone(), collaborators.clone(), config)?;
        let incremental = IncrementalUpdateCoordinator::new(list.clone(), collaborators, config);
        Ok(Self {
            list,
            rebuild,
            incremental,
        })
    }

    pub fn list(&self) -> &ProjectList {
        &self.list
    }

    /// Supersede any running rebuild with a fresh one; returns immediately.
    pub fn update(&self, caller: &Principal) -> Result<u64, UpdateError> {
        self.rebuild.update(caller)
    }

    pub fn abort(&self) {
        self.rebuild.abort();
    }

    pub fn update_for_changed_projects<I, K>(
        &self,
        keys: I,
    ) -> Result<IncrementalSummary, UpdateError>
    where
        I: IntoIterator<Item = K>,
        K: Into<MemberKey>,
    {
        self.incremental.update_for_changed_projects(keys)
    }

    pub fn wait_for_page_updated(&self, page: usize, page_size: usize) -> RoundState {
        self.rebuild.wait_for_page_updated(page, page_size)
    }

    pub fn wait_for_page_updated_timeout(
        &self,
        page: usize,
        page_size: usize,
        timeout: Duration,
    ) -> WaitOutcome {
        self.rebuild
            .wait_for_page_updated_timeout(page, page_size, timeout)
    }

    /// Wait for an arbitrary round transition, e.g. `|s| s.cancel_requested`.
    ///
    /// Unlike [`status`](Self::status) this never touches the worker slot, so
    /// it does not block behind an `update` or `abort` joining a worker.
    pub fn wait_for_round_timeout<F>(&self, timeout: Duration, predicate: F) -> WaitOutcome
    where
        F: FnMut(&RoundState) -> bool,
    {
        self.rebuild.progress().wait_until_timeout(timeout, predicate)
    }

    pub fn wait_for_single_updated(&self, key: &MemberKey) {
        self.incremental.wait_for_single_updated(key);
    }

    pub fn wait_for_single_updated_timeout(&self, key: &MemberKey, timeout: Duration) -> bool {
        self.incremental
            .wait_for_single_updated_timeout(key, timeout)
    }

    pub fn join_round(&self) -> Option<Result<RoundOutcome, UpdateError>> {
        self.rebuild.join_round()
    }

    pub fn last_report(&self) -> Option<RoundReport> {
        self.rebuild.last_report()
    }

    pub fn status(&self) -> UpdaterStatus {
        UpdaterStatus {
            list: self.list.id.clone(),
            round: self.rebuild.progress().snapshot(),
            worker_active: self.rebuild.worker_active(),
            locked_keys: self.incremental.locks().locked_keys(),
            last_report: self.rebuild.last_report(),
        }
    }
}
