pub mod items;
pub mod portfolio;
pub mod rebuild;
pub mod refresh;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use autolist_core::{
    config, store::portfolio as portfolio_store, Collaborators, ListId, SessionContextFactory,
    UpdaterConfig, YamlMembershipStore, YamlPortfolioSource,
};
use autolist_updater::AutoListUpdater;

pub(crate) fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub(crate) fn load_config() -> Result<UpdaterConfig> {
    config::load().context("failed to load ~/.autolist/config.yaml")
}

/// Updater for `list`, wired to the YAML stores under `home`.
///
/// The list's name and author come from its portfolio file.
pub(crate) fn open_updater(
    home: &Path,
    list: &ListId,
    config: &UpdaterConfig,
) -> Result<AutoListUpdater> {
    let portfolio = portfolio_store::load_at(home, list).with_context(|| {
        format!("no portfolio for list '{list}'; run `autolist portfolio set {list} ...` first")
    })?;
    tracing::debug!(%list, home = %home.display(), "opening updater");

    let collaborators = Collaborators::new(
        Arc::new(YamlPortfolioSource::new(home)),
        Arc::new(YamlMembershipStore::new(home)),
        Arc::new(SessionContextFactory::new()),
    );
    AutoListUpdater::new(portfolio.list, collaborators, config)
        .context("invalid updater configuration")
}
