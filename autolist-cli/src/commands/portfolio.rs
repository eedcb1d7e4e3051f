//! `autolist portfolio set|show|list`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use autolist_core::{
    store::{items, portfolio},
    ListId, MemberKey, PortfolioFile, Principal, ProjectList, StoreError,
};

use super::home_dir;

/// Edit and inspect portfolios.
#[derive(Subcommand, Debug)]
pub enum PortfolioCommand {
    /// Replace the members of a list's portfolio, creating it if needed.
    Set(SetArgs),

    /// Print one portfolio.
    Show {
        /// List id.
        list: ListId,
    },

    /// List every portfolio with its member and item counts.
    List,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// List id (e.g. "favourites"); also the file stem under ~/.autolist/.
    pub list: ListId,

    /// Member keys; omit to empty the portfolio.
    pub members: Vec<String>,

    /// Display name. Defaults to the existing name, or the list id.
    #[arg(long)]
    pub name: Option<String>,

    /// Principal the list is rebuilt and refreshed as.
    /// Defaults to the existing author, or $USER.
    #[arg(long)]
    pub author: Option<String>,
}

pub fn run(cmd: PortfolioCommand) -> Result<()> {
    match cmd {
        PortfolioCommand::Set(args) => set(args),
        PortfolioCommand::Show { list } => show(&list),
        PortfolioCommand::List => list(),
    }
}

fn set(args: SetArgs) -> Result<()> {
    let home = home_dir()?;
    let id = args.list;

    let existing = match portfolio::load_at(&home, &id) {
        Ok(file) => Some(file.list),
        Err(StoreError::NotFound { .. }) => None,
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read portfolio '{id}'"));
        }
    };

    let list = match existing {
        Some(mut list) => {
            if let Some(name) = args.name {
                list.name = name;
            }
            if let Some(author) = args.author {
                list.author = Principal::new(author);
            }
            list
        }
        None => {
            let author = args
                .author
                .or_else(|| std::env::var("USER").ok())
                .unwrap_or_else(|| "autolist".to_string());
            let name = args.name.unwrap_or_else(|| id.to_string());
            ProjectList::new(id.clone(), name, Principal::new(author))
        }
    };

    let members = args.members.into_iter().map(MemberKey::from).collect();
    let file = PortfolioFile::new(list, members);
    portfolio::save_at(&home, &file)
        .with_context(|| format!("failed to save portfolio '{id}'"))?;

    println!(
        "✓ Portfolio '{}' now has {} member(s)",
        id,
        file.members.len()
    );
    Ok(())
}

fn show(list: &ListId) -> Result<()> {
    let home = home_dir()?;
    let file = portfolio::load_at(&home, list)
        .with_context(|| format!("failed to load portfolio '{list}'"))?;

    println!("{} {}", "List:".bold(), file.list.id);
    println!("  name:    {}", file.list.name);
    println!("  author:  {}", file.list.author.id);
    println!(
        "  updated: {}",
        file.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if file.members.is_empty() {
        println!("  members: {}", "(none)".dimmed());
        return Ok(());
    }
    println!("  members:");
    for member in &file.members {
        println!("    - {member}");
    }
    Ok(())
}

#[derive(Tabled)]
struct PortfolioRow {
    #[tabled(rename = "list")]
    list: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "author")]
    author: String,
    #[tabled(rename = "members")]
    members: usize,
    #[tabled(rename = "items")]
    items: usize,
}

fn list() -> Result<()> {
    let files = portfolio::list().context("failed to read portfolios")?;

    if files.is_empty() {
        println!("No portfolios yet.");
        println!("Run: autolist portfolio set <list> <member>...");
        return Ok(());
    }

    let home = home_dir()?;
    let mut rows = Vec::with_capacity(files.len());
    for file in files {
        let stored = items::load_at(&home, &file.list.id)
            .with_context(|| format!("failed to read items of '{}'", file.list.id))?;
        rows.push(PortfolioRow {
            list: file.list.id.to_string(),
            name: file.list.name,
            author: file.list.author.id.to_string(),
            members: file.members.len(),
            items: stored.len(),
        });
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}
