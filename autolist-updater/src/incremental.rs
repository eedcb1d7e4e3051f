//! Targeted corrections for a subset of list members.
//!
//! Each call locks exactly the keys it was given (see [`KeyLockTable`]) and
//! reconciles them against the portfolio inside one transaction. Calls on
//! disjoint keys run in parallel; a call overlapping an in-flight one waits
//! as a whole until the older call releases.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;

use autolist_core::{
    CollaboratorError, Collaborators, ExecutionContext, ListItem, MemberKey, ProjectList,
    UpdaterConfig,
};

use crate::error::{UpdateError, WriteStage};
use crate::key_locks::{KeyLease, KeyLockTable};

/// What one incremental update changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IncrementalSummary {
    /// Distinct keys in the request.
    pub requested: usize,
    /// Items deleted because their member left the portfolio.
    pub removed: usize,
    /// Items created for portfolio members missing from the list.
    pub added: usize,
    /// Portfolio members that were already listed.
    pub retained: usize,
}

pub struct IncrementalUpdateCoordinator {
    list: ProjectList,
    collaborators: Collaborators,
    locks: KeyLockTable,
    lock_wait_timeout: Option<Duration>,
}

impl IncrementalUpdateCoordinator {
    pub fn new(list: ProjectList, collaborators: Collaborators, config: &UpdaterConfig) -> Self {
        Self {
            list,
            collaborators,
            locks: KeyLockTable::new(),
            lock_wait_timeout: config.lock_wait_timeout(),
        }
    }

    /// Reconcile `keys` with the portfolio, running as the list's author.
    pub fn update_for_changed_projects<I, K>(
        &self,
        keys: I,
    ) -> Result<IncrementalSummary, UpdateError>
    where
        I: IntoIterator<Item = K>,
        K: Into<MemberKey>,
    {
        let keys: BTreeSet<MemberKey> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Ok(IncrementalSummary::default());
        }

        let ctx = self
            .collaborators
            .contexts
            .establish(&self.list.author)
            .map_err(UpdateError::Context)?;

        let lease = self.lock(&keys)?;
        tracing::debug!(
            list = %self.list.id,
            token = lease.token().id(),
            keys = lease.keys().len(),
            "keys acquired",
        );
        let result = self.apply(&ctx, &keys);
        drop(lease);

        match &result {
            Ok(summary) => tracing::info!(
                list = %self.list.id,
                requested = summary.requested,
                removed = summary.removed,
                added = summary.added,
                "incremental update committed",
            ),
            Err(err) => {
                tracing::warn!(list = %self.list.id, error = %err, "incremental update failed")
            }
        }
        result
    }

    fn lock(&self, keys: &BTreeSet<MemberKey>) -> Result<KeyLease<'_>, UpdateError> {
        match self.lock_wait_timeout {
            None => Ok(self.locks.acquire(keys)),
            Some(timeout) => self.locks.acquire_timeout(keys, timeout).ok_or_else(|| {
                tracing::warn!(
                    list = %self.list.id,
                    keys = keys.len(),
                    ?timeout,
                    "key hand-off timed out",
                );
                UpdateError::LockTimeout {
                    keys: keys.len(),
                    waited: timeout,
                }
            }),
        }
    }

    fn apply(
        &self,
        ctx: &ExecutionContext,
        keys: &BTreeSet<MemberKey>,
    ) -> Result<IncrementalSummary, UpdateError> {
        let list = &self.list.id;
        let write_err = |source: CollaboratorError| UpdateError::Write {
            list: list.clone(),
            stage: WriteStage::Incremental,
            source,
        };

        // The lease already pins these keys, so the read can precede the
        // write transaction without racing another incremental update.
        let in_portfolio = self
            .collaborators
            .portfolio
            .filter_members_by_portfolio(ctx, list, keys)
            .map_err(|source| UpdateError::PortfolioRead {
                list: list.clone(),
                source,
            })?;
        let not_in_portfolio: BTreeSet<MemberKey> =
            keys.difference(&in_portfolio).cloned().collect();

        let mut tx = self.collaborators.writer.begin(ctx).map_err(write_err)?;
        let removed = tx
            .delete_items_by_keys_and_list(&not_in_portfolio, list)
            .map_err(write_err)?;

        let present: BTreeSet<MemberKey> = tx
            .items_by_keys_and_list(&in_portfolio, list)
            .map_err(write_err)?
            .into_iter()
            .map(|item| item.member)
            .collect();
        let to_add: Vec<ListItem> = in_portfolio
            .difference(&present)
            .map(|key| ListItem::new(list.clone(), key.clone(), None))
            .collect();

        tx.create_items(&to_add).map_err(write_err)?;
        tx.commit().map_err(write_err)?;

        Ok(IncrementalSummary {
            requested: keys.len(),
            removed,
            added: to_add.len(),
            retained: present.len(),
        })
    }

    /// Block until no incremental update holds or waits for `key`.
    pub fn wait_for_single_updated(&self, key: &MemberKey) {
        self.locks.wait_released(key);
    }

    /// Returns `false` if `key` was still locked after `timeout`.
    pub fn wait_for_single_updated_timeout(&self, key: &MemberKey, timeout: Duration) -> bool {
        self.locks.wait_released_timeout(key, timeout)
    }

    pub fn locks(&self) -> &KeyLockTable {
        &self.locks
    }
}
