//! `autolist rebuild <list>`: run one full round and report page readiness.

use anyhow::{ensure, Context, Result};
use clap::Args;
use colored::Colorize;

use autolist_core::ListId;
use autolist_updater::RoundOutcome;

use super::{home_dir, load_config, open_updater};

#[derive(Args, Debug)]
pub struct RebuildArgs {
    /// List id.
    pub list: ListId,

    /// Members committed per batch (overrides config.yaml).
    #[arg(long)]
    pub tick_count: Option<usize>,

    /// Page size used when reporting which pages are readable.
    #[arg(long, default_value_t = 50)]
    pub page_size: usize,
}

impl RebuildArgs {
    pub fn run(self) -> Result<()> {
        ensure!(self.page_size > 0, "--page-size must be at least 1");

        let home = home_dir()?;
        let mut config = load_config()?;
        if let Some(tick_count) = self.tick_count {
            config = config.with_tick_count(tick_count);
        }
        let updater = open_updater(&home, &self.list, &config)?;

        let caller = updater.list().author.clone();
        let round = updater
            .update(&caller)
            .with_context(|| format!("failed to start rebuild of '{}'", self.list))?;
        println!("Rebuilding '{}' (round {round})", self.list);

        let mut page = 1;
        loop {
            let state = updater.wait_for_page_updated(page, self.page_size);
            // A page that is "ready" without holding any items means the
            // round ended before reaching it.
            if state.processed <= page.saturating_mul(self.page_size) {
                break;
            }
            println!(
                "  {} page {page} readable ({} items committed)",
                "·".dimmed(),
                state.processed
            );
            page += 1;
        }

        let result = updater
            .join_round()
            .context("rebuild worker was reaped before it could be joined")?;
        match result {
            Ok(RoundOutcome::Completed {
                processed, batches, ..
            }) => {
                println!(
                    "{} '{}' rebuilt: {processed} items in {batches} batch(es)",
                    "✓".green().bold(),
                    self.list
                );
                Ok(())
            }
            Ok(RoundOutcome::Cancelled { processed, .. }) => {
                println!(
                    "{} '{}' rebuild cancelled after {processed} items",
                    "!".yellow().bold(),
                    self.list
                );
                Ok(())
            }
            Err(err) => Err(err).with_context(|| format!("rebuild of '{}' failed", self.list)),
        }
    }
}
