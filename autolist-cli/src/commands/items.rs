//! `autolist items <list>`

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use autolist_core::{store::items, ListId, ListItem};

use super::home_dir;

#[derive(Args, Debug)]
pub struct ItemsArgs {
    /// List id.
    pub list: ListId,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ItemJson {
    member: String,
    position: Option<u64>,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "#")]
    position: String,
    #[tabled(rename = "member")]
    member: String,
}

impl ItemsArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let stored = items::load_at(&home, &self.list)
            .with_context(|| format!("failed to read items of '{}'", self.list))?;

        if self.json {
            return print_json(&stored);
        }
        if stored.is_empty() {
            println!("No items in '{}'.", self.list);
            return Ok(());
        }

        let rows = stored.iter().map(|item| ItemRow {
            position: item
                .position
                .map_or_else(|| "-".to_string(), |p| p.to_string()),
            member: item.member.to_string(),
        });
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn print_json(stored: &[ListItem]) -> Result<()> {
    let items: Vec<ItemJson> = stored
        .iter()
        .map(|item| ItemJson {
            member: item.member.to_string(),
            position: item.position,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}
