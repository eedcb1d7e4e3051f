//! Collaborator seams consumed by the updater.
//!
//! The updater only decides *when* and *in what shape* these are called.
//! How a store persists items, or how a portfolio is computed, lives behind
//! the traits.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::CollaboratorError;
use crate::types::{ExecutionContext, ListId, ListItem, MemberKey, Principal};

/// Authoritative source of list membership.
pub trait PortfolioSource: Send + Sync {
    /// Every member that should currently belong to `list`.
    fn portfolio_members(
        &self,
        ctx: &ExecutionContext,
        list: &ListId,
    ) -> Result<BTreeSet<MemberKey>, CollaboratorError>;

    /// The subset of `keys` currently in the portfolio of `list`.
    fn filter_members_by_portfolio(
        &self,
        ctx: &ExecutionContext,
        list: &ListId,
        keys: &BTreeSet<MemberKey>,
    ) -> Result<BTreeSet<MemberKey>, CollaboratorError>;
}

/// Persistence for list items. Every unit of work runs inside a transaction.
pub trait MembershipWriter: Send + Sync {
    fn begin<'a>(
        &'a self,
        ctx: &ExecutionContext,
    ) -> Result<Box<dyn MembershipTransaction + 'a>, CollaboratorError>;
}

/// One transactional scope. Dropping it without [`commit`] discards every
/// staged change.
///
/// [`commit`]: MembershipTransaction::commit
pub trait MembershipTransaction {
    /// Returns the number of items removed.
    fn delete_items_by_list(&mut self, list: &ListId) -> Result<usize, CollaboratorError>;

    /// Returns the number of items removed.
    fn delete_items_by_keys_and_list(
        &mut self,
        keys: &BTreeSet<MemberKey>,
        list: &ListId,
    ) -> Result<usize, CollaboratorError>;

    fn create_items(&mut self, items: &[ListItem]) -> Result<(), CollaboratorError>;

    fn items_by_keys_and_list(
        &mut self,
        keys: &BTreeSet<MemberKey>,
        list: &ListId,
    ) -> Result<Vec<ListItem>, CollaboratorError>;

    fn commit(self: Box<Self>) -> Result<(), CollaboratorError>;
}

/// Establishes the identity/session a unit of work runs under.
pub trait ExecutionContextFactory: Send + Sync {
    fn establish(&self, principal: &Principal) -> Result<ExecutionContext, CollaboratorError>;
}

/// The three collaborators an updater is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub portfolio: Arc<dyn PortfolioSource>,
    pub writer: Arc<dyn MembershipWriter>,
    pub contexts: Arc<dyn ExecutionContextFactory>,
}

impl Collaborators {
    pub fn new(
        portfolio: Arc<dyn PortfolioSource>,
        writer: Arc<dyn MembershipWriter>,
        contexts: Arc<dyn ExecutionContextFactory>,
    ) -> Self {
        Self {
            portfolio,
            writer,
            contexts,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
