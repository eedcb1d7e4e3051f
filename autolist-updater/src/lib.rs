//! # autolist-updater
//!
//! Background maintenance of auto-updated project lists.
//!
//! - [`RebuildCoordinator`]: single-flight full rebuilds with cooperative
//!   cancellation and page-level progress waits.
//! - [`IncrementalUpdateCoordinator`]: targeted corrections serialized per
//!   member key through a [`KeyLockTable`].
//! - [`AutoListUpdater`]: both, bound to one list; [`UpdaterRegistry`] keeps
//!   one per list.
//!
//! ```no_run
//! use std::sync::Arc;
//! use autolist_core::{
//!     Collaborators, MemoryMembershipStore, MemoryPortfolio, Principal, ProjectList,
//!     SessionContextFactory, UpdaterConfig,
//! };
//! use autolist_updater::AutoListUpdater;
//!
//! # fn main() -> Result<(), autolist_updater::UpdateError> {
//! let author = Principal::new("alice");
//! let list = ProjectList::new("favourites", "Favourites", author.clone());
//! let collaborators = Collaborators::new(
//!     Arc::new(MemoryPortfolio::new()),
//!     Arc::new(MemoryMembershipStore::new()),
//!     Arc::new(SessionContextFactory::new()),
//! );
//! let updater = AutoListUpdater::new(list, collaborators, &UpdaterConfig::default())?;
//! updater.update(&author)?;
//! updater.wait_for_page_updated(1, 50);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod incremental;
pub mod key_locks;
pub mod progress;
pub mod rebuild;
pub mod registry;
pub mod updater;

pub use error::{UpdateError, WriteStage};
pub use incremental::{IncrementalSummary, IncrementalUpdateCoordinator};
pub use key_locks::{KeyLease, KeyLockTable, LockToken};
pub use progress::{ProgressTracker, RoundState, WaitOutcome};
pub use rebuild::{RebuildCoordinator, RoundOutcome, RoundReport};
pub use registry::UpdaterRegistry;
pub use updater::{AutoListUpdater, UpdaterStatus};
