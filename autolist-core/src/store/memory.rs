//! In-process collaborators.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard, RwLock};

use super::{ListBackend, StagedTransaction};
use crate::collab::{MembershipTransaction, MembershipWriter, PortfolioSource};
use crate::error::CollaboratorError;
use crate::types::{ExecutionContext, ListId, ListItem, MemberKey};

type Tables = BTreeMap<ListId, Vec<ListItem>>;

/// Membership store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryMembershipStore {
    tables: Mutex<Tables>,
    commits: AtomicU64,
}

impl MemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed items of `list`, ordered by position.
    pub fn items(&self, list: &ListId) -> Vec<ListItem> {
        self.tables.lock().get(list).cloned().unwrap_or_default()
    }

    /// Committed member keys of `list`.
    pub fn members(&self, list: &ListId) -> BTreeSet<MemberKey> {
        self.items(list).into_iter().map(|item| item.member).collect()
    }

    /// Replace the committed contents of `list` outside any transaction.
    pub fn seed(&self, list: &ListId, items: Vec<ListItem>) {
        self.tables.lock().insert(list.clone(), items);
    }

    /// Number of transactions committed so far.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Acquire)
    }
}

struct MemoryBackend<'a> {
    tables: MutexGuard<'a, Tables>,
    commits: &'a AtomicU64,
    saved: bool,
}

impl ListBackend for MemoryBackend<'_> {
    fn load(&mut self, list: &ListId) -> Result<Vec<ListItem>, CollaboratorError> {
        Ok(self.tables.get(list).cloned().unwrap_or_default())
    }

    fn save(&mut self, list: &ListId, items: Vec<ListItem>) -> Result<(), CollaboratorError> {
        self.tables.insert(list.clone(), items);
        if !self.saved {
            self.saved = true;
            self.commits.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }
}

impl MembershipWriter for MemoryMembershipStore {
    fn begin<'a>(
        &'a self,
        _ctx: &ExecutionContext,
    ) -> Result<Box<dyn MembershipTransaction + 'a>, CollaboratorError> {
        let backend = MemoryBackend {
            tables: self.tables.lock(),
            commits: &self.commits,
            saved: false,
        };
        Ok(Box::new(StagedTransaction::new(backend)))
    }
}

/// Portfolio whose member sets are set directly by the host.
#[derive(Debug, Default)]
pub struct MemoryPortfolio {
    members: RwLock<HashMap<ListId, BTreeSet<MemberKey>>>,
}

impl MemoryPortfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_members<I, K>(&self, list: &ListId, members: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<MemberKey>,
    {
        let members = members.into_iter().map(Into::into).collect();
        self.members.write().insert(list.clone(), members);
    }

    pub fn add_member(&self, list: &ListId, member: impl Into<MemberKey>) {
        self.members
            .write()
            .entry(list.clone())
            .or_default()
            .insert(member.into());
    }

    pub fn remove_member(&self, list: &ListId, member: &MemberKey) {
        if let Some(members) = self.members.write().get_mut(list) {
            members.remove(member);
        }
    }
}

impl PortfolioSource for MemoryPortfolio {
    fn portfolio_members(
        &self,
        _ctx: &ExecutionContext,
        list: &ListId,
    ) -> Result<BTreeSet<MemberKey>, CollaboratorError> {
        Ok(self.members.read().get(list).cloned().unwrap_or_default())
    }

    fn filter_members_by_portfolio(
        &self,
        _ctx: &ExecutionContext,
        list: &ListId,
        keys: &BTreeSet<MemberKey>,
    ) -> Result<BTreeSet<MemberKey>, CollaboratorError> {
        let guard = self.members.read();
        let Some(members) = guard.get(list) else {
            return Ok(BTreeSet::new());
        };
        Ok(keys.intersection(members).cloned().collect())
    }
}
