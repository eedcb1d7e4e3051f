//! Concrete collaborator implementations.
//!
//! Both membership stores share the same transaction model: a transaction
//! holds the store's writer lock for its whole lifetime, stages changes on
//! per-list working copies, and only publishes them on commit. Writers are
//! therefore serialized at the persistence layer no matter which
//! coordinator issued them.

pub mod items;
pub mod memory;
pub mod portfolio;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::collab::MembershipTransaction;
use crate::error::{io_err, CollaboratorError, StoreError};
use crate::types::{ListId, ListItem, MemberKey};

// ---------------------------------------------------------------------------
// Atomic file writes
// ---------------------------------------------------------------------------

/// Write `contents` to `path` via a `.tmp` sibling + rename.
///
/// The `.tmp` file lives in the same directory as the target so the rename
/// never crosses filesystems.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            set_dir_permissions(parent)?;
        }
    }
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, contents).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Staged transactions
// ---------------------------------------------------------------------------

/// Where committed list contents live.
pub(crate) trait ListBackend {
    fn load(&mut self, list: &ListId) -> Result<Vec<ListItem>, CollaboratorError>;
    fn save(&mut self, list: &ListId, items: Vec<ListItem>) -> Result<(), CollaboratorError>;
}

pub(crate) struct StagedTransaction<B: ListBackend> {
    backend: B,
    working: BTreeMap<ListId, Vec<ListItem>>,
}

impl<B: ListBackend> StagedTransaction<B> {
    pub(crate) fn new(backend: B) -> Self {
        Self {
            backend,
            working: BTreeMap::new(),
        }
    }

    fn working_copy(&mut self, list: &ListId) -> Result<&mut Vec<ListItem>, CollaboratorError> {
        if !self.working.contains_key(list) {
            let items = self.backend.load(list)?;
            self.working.insert(list.clone(), items);
        }
        self.working
            .get_mut(list)
            .ok_or_else(|| CollaboratorError::Write(format!("working copy for '{list}' vanished")))
    }
}

impl<B: ListBackend> MembershipTransaction for StagedTransaction<B> {
    fn delete_items_by_list(&mut self, list: &ListId) -> Result<usize, CollaboratorError> {
        let items = self.working_copy(list)?;
        let removed = items.len();
        items.clear();
        Ok(removed)
    }

    fn delete_items_by_keys_and_list(
        &mut self,
        keys: &BTreeSet<MemberKey>,
        list: &ListId,
    ) -> Result<usize, CollaboratorError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let items = self.working_copy(list)?;
        let before = items.len();
        items.retain(|item| !keys.contains(&item.member));
        Ok(before - items.len())
    }

    fn create_items(&mut self, new_items: &[ListItem]) -> Result<(), CollaboratorError> {
        for item in new_items {
            let items = self.working_copy(&item.list)?;
            let position = match item.position {
                Some(position) => position,
                None => next_position(items),
            };
            items.push(ListItem::new(item.list.clone(), item.member.clone(), Some(position)));
        }
        Ok(())
    }

    fn items_by_keys_and_list(
        &mut self,
        keys: &BTreeSet<MemberKey>,
        list: &ListId,
    ) -> Result<Vec<ListItem>, CollaboratorError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let items = self.working_copy(list)?;
        Ok(items
            .iter()
            .filter(|item| keys.contains(&item.member))
            .cloned()
            .collect())
    }

    fn commit(self: Box<Self>) -> Result<(), CollaboratorError> {
        let StagedTransaction {
            mut backend,
            working,
        } = *self;
        for (list, mut items) in working {
            items.sort_by_key(|item| item.position);
            backend.save(&list, items)?;
        }
        Ok(())
    }
}

fn next_position(items: &[ListItem]) -> u64 {
    items
        .iter()
        .filter_map(|item| item.position)
        .max()
        .map_or(0, |max| max + 1)
}
