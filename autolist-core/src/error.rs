//! Error types for autolist-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the YAML-backed stores and configuration loading.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The requested file did not exist.
    #[error("not found: {path}")]
    NotFound { path: PathBuf },

    /// A list id that cannot be used as a file name.
    #[error("invalid list id '{id}': {reason}")]
    InvalidListId { id: String, reason: &'static str },
}

/// Error surface shared by every collaborator trait.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("portfolio source unavailable: {0}")]
    PortfolioUnavailable(String),

    #[error("membership write failed: {0}")]
    Write(String),

    #[error("transaction commit failed: {0}")]
    Commit(String),

    #[error("execution context could not be established: {0}")]
    Context(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Invalid [`UpdaterConfig`](crate::config::UpdaterConfig) values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tick_count must be at least 1")]
    InvalidTickCount,

    #[error("worker_thread_name_prefix must not be empty")]
    EmptyThreadName,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
