//! YAML-file membership store.
//!
//! ```text
//! ~/.autolist/items/<list>.yaml   (mode 0600, rewritten atomically on commit)
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use super::{ListBackend, StagedTransaction};
use crate::collab::{MembershipTransaction, MembershipWriter};
use crate::error::{io_err, CollaboratorError, StoreError};
use crate::paths;
use crate::types::{ExecutionContext, ListId, ListItem};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsFile {
    pub list: ListId,
    #[serde(default)]
    pub items: Vec<ListItem>,
    pub updated_at: DateTime<Utc>,
}

/// Committed items of `list`; an absent file is an empty list.
pub fn load_at(home: &Path, list: &ListId) -> Result<Vec<ListItem>, StoreError> {
    list.validate()?;
    let path = paths::items_path(home, list);
    if !path.exists() {
        return Ok(vec![]);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let file: ItemsFile =
        serde_yaml::from_str(&contents).map_err(|source| StoreError::Parse { path, source })?;
    Ok(file.items)
}

fn save_at(home: &Path, list: &ListId, items: Vec<ListItem>) -> Result<(), StoreError> {
    list.validate()?;
    let file = ItemsFile {
        list: list.clone(),
        items,
        updated_at: Utc::now(),
    };
    let yaml = serde_yaml::to_string(&file)?;
    super::write_atomic(&paths::items_path(home, list), &yaml)
}

/// [`MembershipWriter`] persisting one YAML file per list.
#[derive(Debug)]
pub struct YamlMembershipStore {
    home: PathBuf,
    writer: Mutex<()>,
}

impl YamlMembershipStore {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn items(&self, list: &ListId) -> Result<Vec<ListItem>, StoreError> {
        load_at(&self.home, list)
    }
}

struct YamlBackend<'a> {
    _writer: MutexGuard<'a, ()>,
    home: &'a Path,
}

impl ListBackend for YamlBackend<'_> {
    fn load(&mut self, list: &ListId) -> Result<Vec<ListItem>, CollaboratorError> {
        Ok(load_at(self.home, list)?)
    }

    fn save(&mut self, list: &ListId, items: Vec<ListItem>) -> Result<(), CollaboratorError> {
        save_at(self.home, list, items).map_err(|e| CollaboratorError::Commit(e.to_string()))
    }
}

impl MembershipWriter for YamlMembershipStore {
    fn begin<'a>(
        &'a self,
        ctx: &ExecutionContext,
    ) -> Result<Box<dyn MembershipTransaction + 'a>, CollaboratorError> {
        tracing::trace!(session = %ctx.session, "yaml membership transaction");
        let backend = YamlBackend {
            _writer: self.writer.lock(),
            home: &self.home,
        };
        Ok(Box::new(StagedTransaction::new(backend)))
    }
}
