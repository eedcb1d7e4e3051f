use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

use autolist_core::{paths, store::items, ListId, MemberKey};

fn autolist_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("autolist"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("RUST_LOG");
    cmd
}

fn set_portfolio(home: &Path, list: &str, members: &[&str]) {
    autolist_cmd(home)
        .args(["portfolio", "set", list])
        .args(members)
        .args(["--author", "alice"])
        .assert()
        .success();
}

fn stored_members(home: &Path, list: &str) -> Vec<String> {
    items::load_at(home, &ListId::from(list))
        .expect("items file readable")
        .into_iter()
        .map(|item| item.member.to_string())
        .collect()
}

#[test]
fn portfolio_set_then_show() {
    let home = TempDir::new().expect("home");
    set_portfolio(home.path(), "favourites", &["p2", "p1"]);

    autolist_cmd(home.path())
        .args(["portfolio", "show", "favourites"])
        .assert()
        .success()
        .stdout(contains("author:  alice"))
        .stdout(contains("- p1"))
        .stdout(contains("- p2"));
}

#[test]
fn portfolio_set_keeps_existing_author() {
    let home = TempDir::new().expect("home");
    set_portfolio(home.path(), "favourites", &["p1"]);

    autolist_cmd(home.path())
        .args(["portfolio", "set", "favourites", "p1", "p2", "--name", "Faves"])
        .assert()
        .success()
        .stdout(contains("2 member(s)"));

    autolist_cmd(home.path())
        .args(["portfolio", "show", "favourites"])
        .assert()
        .success()
        .stdout(contains("name:    Faves"))
        .stdout(contains("author:  alice"));
}

#[test]
fn portfolio_list_when_empty() {
    let home = TempDir::new().expect("home");
    autolist_cmd(home.path())
        .args(["portfolio", "list"])
        .assert()
        .success()
        .stdout(contains("No portfolios yet."));
}

#[test]
fn rebuild_materializes_the_portfolio() {
    let home = TempDir::new().expect("home");
    set_portfolio(home.path(), "favourites", &["c", "a", "b"]);

    autolist_cmd(home.path())
        .args(["rebuild", "favourites", "--tick-count", "2", "--page-size", "1"])
        .assert()
        .success()
        .stdout(contains("Rebuilding 'favourites' (round 1)"))
        .stdout(contains("3 items in 2 batch(es)"));

    assert_eq!(stored_members(home.path(), "favourites"), vec!["a", "b", "c"]);

    autolist_cmd(home.path())
        .args(["portfolio", "list"])
        .assert()
        .success()
        .stdout(contains("favourites"));
}

#[test]
fn rebuild_reports_only_pages_that_exist() {
    let home = TempDir::new().expect("home");
    let names: Vec<String> = (0..120).map(|i| format!("p{i:04}")).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    set_portfolio(home.path(), "favourites", &names);

    let output = autolist_cmd(home.path())
        .args(["rebuild", "favourites", "--page-size", "50"])
        .output()
        .expect("run rebuild");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("utf-8");
    let pages: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split(" page ").nth(1))
        .filter_map(|rest| rest.split(' ').next())
        .collect();
    assert_eq!(pages, vec!["1", "2"], "unexpected page lines in:\n{stdout}");
    assert!(stdout.contains("120 items in 3 batch(es)"));
}

#[test]
fn items_json_lists_positions() {
    let home = TempDir::new().expect("home");
    set_portfolio(home.path(), "favourites", &["a", "b"]);
    autolist_cmd(home.path())
        .args(["rebuild", "favourites"])
        .assert()
        .success();

    let output = autolist_cmd(home.path())
        .args(["items", "favourites", "--json"])
        .output()
        .expect("run items");
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let entries = parsed.as_array().expect("array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["member"], "a");
    assert_eq!(entries[0]["position"], 0);
    assert_eq!(entries[1]["member"], "b");
    assert_eq!(entries[1]["position"], 1);
}

#[test]
fn refresh_reconciles_changed_members() {
    let home = TempDir::new().expect("home");
    set_portfolio(home.path(), "favourites", &["a", "b"]);
    autolist_cmd(home.path())
        .args(["rebuild", "favourites"])
        .assert()
        .success();

    set_portfolio(home.path(), "favourites", &["a", "c"]);
    autolist_cmd(home.path())
        .args(["refresh", "favourites", "b", "c"])
        .assert()
        .success()
        .stdout(contains("2 requested, 1 added, 1 removed, 0 retained"));

    assert_eq!(stored_members(home.path(), "favourites"), vec!["a", "c"]);
    let c = items::load_at(home.path(), &ListId::from("favourites"))
        .expect("items")
        .into_iter()
        .find(|item| item.member == MemberKey::from("c"))
        .expect("'c' added");
    assert_eq!(c.position, Some(1), "appended after the remaining items");
}

#[test]
fn refresh_json_summary() {
    let home = TempDir::new().expect("home");
    set_portfolio(home.path(), "favourites", &["a"]);

    let output = autolist_cmd(home.path())
        .args(["refresh", "favourites", "a", "--json"])
        .output()
        .expect("run refresh");
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(parsed["requested"], 1);
    assert_eq!(parsed["added"], 1);
}

#[test]
fn rebuild_unknown_list_fails() {
    let home = TempDir::new().expect("home");
    autolist_cmd(home.path())
        .args(["rebuild", "missing"])
        .assert()
        .failure()
        .stderr(contains("no portfolio for list 'missing'"));
}

#[test]
fn zero_tick_count_in_config_is_rejected() {
    let home = TempDir::new().expect("home");
    set_portfolio(home.path(), "favourites", &["a"]);
    let config = paths::config_path(home.path());
    fs::write(&config, "tick_count: 0\n").expect("write config");

    autolist_cmd(home.path())
        .args(["rebuild", "favourites"])
        .assert()
        .failure()
        .stderr(contains("tick_count must be at least 1"));
}

#[test]
fn zero_page_size_is_rejected() {
    let home = TempDir::new().expect("home");
    set_portfolio(home.path(), "favourites", &["a"]);
    autolist_cmd(home.path())
        .args(["rebuild", "favourites", "--page-size", "0"])
        .assert()
        .failure()
        .stderr(contains("--page-size must be at least 1"));
}

#[test]
fn list_ids_cannot_leave_the_store() {
    let home = TempDir::new().expect("home");
    for bad in ["../../escaped", "nested/list", ".."] {
        autolist_cmd(home.path())
            .args(["portfolio", "set", bad, "a"])
            .assert()
            .failure()
            .stderr(contains("invalid list id"));
    }
    autolist_cmd(home.path())
        .args(["rebuild", "../x"])
        .assert()
        .failure()
        .stderr(contains("must not contain path separators"));

    assert!(!home.path().join("escaped.yaml").exists());
    assert!(!paths::autolist_root(home.path()).exists(), "nothing written");
}
