//! Error types for autolist-updater.

use std::time::Duration;

use thiserror::Error;

use autolist_core::{CollaboratorError, ConfigError, ListId};

/// Which write step of a round or incremental update failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// Deleting every item of the list before repopulating it.
    Clear,
    /// Creating and committing the n-th batch (0-based).
    Batch(usize),
    /// The single transactional scope of an incremental update.
    Incremental,
}

impl std::fmt::Display for WriteStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteStage::Clear => write!(f, "clear"),
            WriteStage::Batch(n) => write!(f, "batch {n}"),
            WriteStage::Incremental => write!(f, "incremental"),
        }
    }
}

/// All errors that can arise from rebuilds and incremental updates.
///
/// Cancellation is not represented here: an aborted round reports
/// [`RoundOutcome::Cancelled`](crate::RoundOutcome::Cancelled).
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The portfolio could not be read; nothing was written.
    #[error("portfolio read failed for list '{list}': {source}")]
    PortfolioRead {
        list: ListId,
        #[source]
        source: CollaboratorError,
    },

    /// A write or commit failed; earlier committed batches stand.
    #[error("write failed for list '{list}' at {stage}: {source}")]
    Write {
        list: ListId,
        stage: WriteStage,
        #[source]
        source: CollaboratorError,
    },

    /// The execution context for the caller could not be established.
    #[error("execution context unavailable: {0}")]
    Context(#[source] CollaboratorError),

    /// Another batch kept one of the requested keys for too long.
    #[error("timed out after {waited:?} waiting for {keys} key(s) held by another update")]
    LockTimeout { keys: usize, waited: Duration },

    #[error("invalid updater configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to spawn rebuild worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("rebuild worker for list '{list}' panicked")]
    WorkerPanicked { list: ListId },
}
