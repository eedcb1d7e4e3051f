//! autolist: maintain auto-updated project lists from the command line.
//!
//! # Usage
//!
//! ```text
//! autolist portfolio set <list> [<member>...] [--name <name>] [--author <id>]
//! autolist portfolio show <list>
//! autolist portfolio list
//! autolist rebuild <list> [--tick-count N] [--page-size S]
//! autolist refresh <list> <key>... [--json]
//! autolist items <list> [--json]
//! ```
//!
//! State lives under `~/.autolist/`; see `autolist_core::paths`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    items::ItemsArgs, portfolio::PortfolioCommand, rebuild::RebuildArgs, refresh::RefreshArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "autolist",
    version,
    about = "Rebuild and refresh auto-updated project lists",
    long_about = None,
)]
struct Cli {
    /// Log updater activity at debug level (overrides RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Edit and inspect the portfolios lists are built from.
    Portfolio {
        #[command(subcommand)]
        command: PortfolioCommand,
    },

    /// Repopulate a list from its portfolio in committed batches.
    Rebuild(RebuildArgs),

    /// Reconcile selected members of a list with its portfolio.
    Refresh(RefreshArgs),

    /// Show the committed items of a list.
    Items(ItemsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Portfolio { command } => commands::portfolio::run(command),
        Commands::Rebuild(args) => args.run(),
        Commands::Refresh(args) => args.run(),
        Commands::Items(args) => args.run(),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
