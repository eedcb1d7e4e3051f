mod common;

use std::sync::Arc;

use autolist_core::{ProjectList, UpdaterConfig};
use autolist_updater::{UpdateError, UpdaterRegistry};

use common::{author, members, Harness};

#[test]
fn one_updater_per_list() {
    let h = Harness::new();
    let registry = UpdaterRegistry::new(h.collaborators(), UpdaterConfig::default())
        .expect("registry");

    let first = registry.get_or_create(&h.list).expect("create");
    let again = registry.get_or_create(&h.list).expect("reuse");
    assert!(Arc::ptr_eq(&first, &again));

    let other = ProjectList::new("watching", "Watching", author());
    let second = registry.get_or_create(&other).expect("create other");
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 2);
    assert_eq!(second.list().id, other.id);
}

#[test]
fn remove_aborts_and_forgets() {
    let h = Harness::new().with_members(&members(3));
    let registry = UpdaterRegistry::new(h.collaborators(), UpdaterConfig::default())
        .expect("registry");
    let updater = registry.get_or_create(&h.list).expect("create");
    updater.update(&author()).expect("start round");

    let removed = registry.remove(&h.list.id).expect("was registered");
    assert!(!removed.status().worker_active);
    assert!(!removed.status().round.running);
    assert!(registry.get(&h.list.id).is_none());
    assert!(registry.is_empty());
    assert!(registry.remove(&h.list.id).is_none());
}

#[test]
fn abort_all_stops_every_round() {
    let h = Harness::new().with_members(&members(3));
    let registry = UpdaterRegistry::new(h.collaborators(), UpdaterConfig::default())
        .expect("registry");
    let other = ProjectList::new("watching", "Watching", author());

    for list in [&h.list, &other] {
        registry
            .get_or_create(list)
            .expect("create")
            .update(&author())
            .expect("start round");
    }
    registry.abort_all();

    for list in [&h.list, &other] {
        let updater = registry.get(&list.id).expect("still registered");
        assert!(!updater.status().worker_active);
        assert!(updater.last_report().is_some());
    }
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let h = Harness::new();
    let config = UpdaterConfig {
        worker_thread_name_prefix: "  ".to_string(),
        ..UpdaterConfig::default()
    };
    let result = UpdaterRegistry::new(h.collaborators(), config);
    assert!(matches!(result, Err(UpdateError::Config(_))));
}

#[test]
fn status_reflects_the_last_round() {
    let h = Harness::new().with_members(&members(60));
    let registry = UpdaterRegistry::new(h.collaborators(), UpdaterConfig::default())
        .expect("registry");
    let updater = registry.get_or_create(&h.list).expect("create");

    updater.update(&author()).expect("start round");
    updater.join_round().expect("round").expect("succeeds");

    let status = updater.status();
    assert_eq!(status.list, h.list.id);
    assert_eq!(status.round.round, 1);
    assert!(status.round.completed);
    assert_eq!(status.round.processed, 60);
    assert_eq!(status.locked_keys, 0);
    let report = status.last_report.expect("report");
    assert_eq!(report.outcome.map(|o| o.processed()), Some(60));
}
