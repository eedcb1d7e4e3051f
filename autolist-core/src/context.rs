//! Session-scoped execution contexts.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;

use crate::collab::ExecutionContextFactory;
use crate::error::CollaboratorError;
use crate::types::{ExecutionContext, Principal, PrincipalId};

/// Hands out one fresh session per call, optionally refusing some principals.
#[derive(Debug, Default)]
pub struct SessionContextFactory {
    next_session: AtomicU64,
    denied: RwLock<HashSet<PrincipalId>>,
}

impl SessionContextFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subsequent `establish` calls for `principal` fail with
    /// [`CollaboratorError::Context`].
    pub fn deny(&self, principal: impl Into<PrincipalId>) {
        self.denied.write().insert(principal.into());
    }

    pub fn allow(&self, principal: &PrincipalId) {
        self.denied.write().remove(principal);
    }

    /// Number of sessions established so far.
    pub fn sessions_established(&self) -> u64 {
        self.next_session.load(Ordering::Acquire)
    }
}

impl ExecutionContextFactory for SessionContextFactory {
    fn establish(&self, principal: &Principal) -> Result<ExecutionContext, CollaboratorError> {
        if self.denied.read().contains(&principal.id) {
            return Err(CollaboratorError::Context(format!(
                "principal '{}' is not allowed to act on lists",
                principal.id
            )));
        }
        let n = self.next_session.fetch_add(1, Ordering::AcqRel) + 1;
        Ok(ExecutionContext {
            principal: principal.clone(),
            session: format!("{}#{n}", principal.id),
            established_at: Utc::now(),
        })
    }
}
