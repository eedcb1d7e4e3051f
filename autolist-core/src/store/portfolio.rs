//! YAML-file portfolios.
//!
//! # Storage layout
//!
//! ```text
//! ~/.autolist/portfolios/<list>.yaml   (mode 0600)
//! ```
//!
//! Every function has an `_at(home, …)` form; tests only use those.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collab::PortfolioSource;
use crate::error::{io_err, CollaboratorError, StoreError};
use crate::paths;
use crate::types::{ExecutionContext, ListId, MemberKey, ProjectList};

/// On-disk portfolio for one list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioFile {
    pub list: ProjectList,
    #[serde(default)]
    pub members: BTreeSet<MemberKey>,
    pub updated_at: DateTime<Utc>,
}

impl PortfolioFile {
    pub fn new(list: ProjectList, members: BTreeSet<MemberKey>) -> Self {
        Self {
            list,
            members,
            updated_at: Utc::now(),
        }
    }
}

/// Load `<home>/.autolist/portfolios/<list>.yaml`.
pub fn load_at(home: &Path, list: &ListId) -> Result<PortfolioFile, StoreError> {
    list.validate()?;
    let path = paths::portfolio_path(home, list);
    if !path.exists() {
        return Err(StoreError::NotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_yaml::from_str(&contents).map_err(|source| StoreError::Parse { path, source })
}

/// Atomically save a portfolio, stamping `updated_at`.
pub fn save_at(home: &Path, portfolio: &PortfolioFile) -> Result<(), StoreError> {
    portfolio.list.id.validate()?;
    let mut portfolio = portfolio.clone();
    portfolio.updated_at = Utc::now();
    let yaml = serde_yaml::to_string(&portfolio)?;
    super::write_atomic(&paths::portfolio_path(home, &portfolio.list.id), &yaml)
}

/// Every stored portfolio, sorted by list id.
pub fn list_at(home: &Path) -> Result<Vec<PortfolioFile>, StoreError> {
    let dir = paths::portfolios_dir(home);
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .map_err(|e| io_err(&dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("yaml"))
        .collect();
    files.sort();

    let mut result = Vec::with_capacity(files.len());
    for path in files {
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let portfolio: PortfolioFile = serde_yaml::from_str(&contents)
            .map_err(|source| StoreError::Parse { path, source })?;
        result.push(portfolio);
    }
    Ok(result)
}

/// `list_at` convenience wrapper.
pub fn list() -> Result<Vec<PortfolioFile>, StoreError> {
    list_at(&paths::home()?)
}

/// [`PortfolioSource`] reading the YAML files on every call.
#[derive(Debug, Clone)]
pub struct YamlPortfolioSource {
    home: PathBuf,
}

impl YamlPortfolioSource {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }
}

impl PortfolioSource for YamlPortfolioSource {
    fn portfolio_members(
        &self,
        _ctx: &ExecutionContext,
        list: &ListId,
    ) -> Result<BTreeSet<MemberKey>, CollaboratorError> {
        Ok(load_at(&self.home, list)?.members)
    }

    fn filter_members_by_portfolio(
        &self,
        _ctx: &ExecutionContext,
        list: &ListId,
        keys: &BTreeSet<MemberKey>,
    ) -> Result<BTreeSet<MemberKey>, CollaboratorError> {
        let members = load_at(&self.home, list)?.members;
        Ok(keys.intersection(&members).cloned().collect())
    }
}
