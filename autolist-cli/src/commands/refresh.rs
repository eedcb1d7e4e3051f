//! `autolist refresh <list> <key>...`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use autolist_core::ListId;

use super::{home_dir, load_config, open_updater};

/// Reconcile selected members with the portfolio without a full rebuild.
#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// List id.
    pub list: ListId,

    /// Member keys that changed.
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Emit the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RefreshArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let config = load_config()?;
        let updater = open_updater(&home, &self.list, &config)?;

        let summary = updater
            .update_for_changed_projects(self.keys)
            .with_context(|| format!("refresh of '{}' failed", self.list))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            return Ok(());
        }
        println!(
            "{} '{}' refreshed: {} requested, {} added, {} removed, {} retained",
            "✓".green().bold(),
            self.list,
            summary.requested,
            summary.added,
            summary.removed,
            summary.retained
        );
        Ok(())
    }
}
