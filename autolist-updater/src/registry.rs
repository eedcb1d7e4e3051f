//! Process-wide map of list updaters.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use autolist_core::{Collaborators, ListId, ProjectList, UpdaterConfig};

use crate::error::UpdateError;
use crate::updater::AutoListUpdater;

/// Hands out exactly one [`AutoListUpdater`] per list id.
pub struct UpdaterRegistry {
    collaborators: Collaborators,
    config: UpdaterConfig,
    updaters: Mutex<HashMap<ListId, Arc<AutoListUpdater>>>,
}

impl UpdaterRegistry {
    pub fn new(collaborators: Collaborators, config: UpdaterConfig) -> Result<Self, UpdateError> {
        config.validate()?;
        Ok(Self {
            collaborators,
            config,
            updaters: Mutex::new(HashMap::new()),
        })
    }

    pub fn get_or_create(&self, list: &ProjectList) -> Result<Arc<AutoListUpdater>, UpdateError> {
        let mut updaters = self.updaters.lock();
        if let Some(updater) = updaters.get(&list.id) {
            return Ok(updater.clone());
        }
        let updater = Arc::new(AutoListUpdater::new(
            list.clone(),
            self.collaborators.clone(),
            &self.config,
        )?);
        updaters.insert(list.id.clone(), updater.clone());
        tracing::debug!(list = %list.id, "updater registered");
        Ok(updater)
    }

    pub fn get(&self, list: &ListId) -> Option<Arc<AutoListUpdater>> {
        self.updaters.lock().get(list).cloned()
    }

    /// Forget the updater for `list`, aborting its running round.
    pub fn remove(&self, list: &ListId) -> Option<Arc<AutoListUpdater>> {
        let removed = self.updaters.lock().remove(list);
        if let Some(updater) = &removed {
            updater.abort();
        }
        removed
    }

    pub fn abort_all(&self) {
        let updaters: Vec<_> = self.updaters.lock().values().cloned().collect();
        for updater in updaters {
            updater.abort();
        }
    }

    pub fn len(&self) -> usize {
        self.updaters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
