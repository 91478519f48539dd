// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use fitdash_app::{
    DEFAULT_SEARCH_DEBOUNCE, FilterPatch, ListCommand, ListController, ListEvent, ListKind,
    NavigationSnapshot, QueryParams, SnapshotStore, UserRow, persist, read_for_mount,
    snapshot_key,
};
use fitdash_db::{Store, validate_db_path};
use fitdash_testkit::temp_db_path;

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("").is_err());
    assert!(validate_db_path("/tmp/fitdash/session.db").is_ok());
    assert!(validate_db_path(":memory:").is_ok());
}

#[test]
fn bootstrap_is_idempotent() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.put_snapshot("default/users/nav", "{}")?;
    store.bootstrap()?;
    assert_eq!(store.get_snapshot("default/users/nav")?.as_deref(), Some("{}"));
    Ok(())
}

#[test]
fn bootstrap_rejects_foreign_database() -> Result<()> {
    let store = Store::open_memory()?;
    store
        .raw_connection()
        .execute_batch("CREATE TABLE projects (id INTEGER PRIMARY KEY);")?;

    let error = store
        .bootstrap()
        .expect_err("unrelated database should be rejected");
    assert!(
        error
            .to_string()
            .contains("missing required table `nav_snapshots`")
    );
    Ok(())
}

#[test]
fn bootstrap_rejects_schema_missing_required_column() -> Result<()> {
    let store = Store::open_memory()?;
    store.raw_connection().execute_batch(
        "
        CREATE TABLE nav_snapshots (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );
        ",
    )?;

    let message = store
        .bootstrap()
        .expect_err("schema validation should fail")
        .to_string();
    assert!(message.contains("table `nav_snapshots` is missing required columns"));
    assert!(message.contains("session_id"));
    Ok(())
}

#[test]
fn snapshots_survive_reopen() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    let key = snapshot_key("tab-1", ListKind::Users);
    {
        let mut store = Store::open(&path)?;
        store.bootstrap()?;
        let snapshot = NavigationSnapshot {
            query: FilterPatch::search("raj").apply_to(&QueryParams::default()),
            is_returning: true,
            ..NavigationSnapshot::default()
        };
        persist(&mut store, &key, &snapshot)?;
    }

    let store = Store::open(&path)?;
    store.bootstrap()?;
    let raw = read_for_mount(&store, &key).expect("snapshot should persist");
    let snapshot = NavigationSnapshot::parse(&raw).expect("snapshot should parse");
    assert!(snapshot.is_returning);
    assert_eq!(snapshot.query.search, "raj");
    Ok(())
}

#[test]
fn sessions_are_isolated() -> Result<()> {
    let mut store = Store::open_memory()?;
    store.bootstrap()?;

    store.write_snapshot(&snapshot_key("tab-1", ListKind::Users), "one")?;
    store.write_snapshot(&snapshot_key("tab-1", ListKind::Revenue), "two")?;
    store.write_snapshot(&snapshot_key("tab-2", ListKind::Users), "three")?;

    let keys: Vec<String> = store
        .list_snapshots("tab-1")?
        .into_iter()
        .map(|entry| entry.key)
        .collect();
    assert_eq!(keys, vec!["tab-1/revenue/nav", "tab-1/users/nav"]);

    assert_eq!(store.clear_session("tab-1")?, 2);
    assert_eq!(store.read_snapshot(&snapshot_key("tab-1", ListKind::Users))?, None);
    assert_eq!(
        store
            .read_snapshot(&snapshot_key("tab-2", ListKind::Users))?
            .as_deref(),
        Some("three")
    );

    store.clear_snapshot(&snapshot_key("tab-2", ListKind::Users))?;
    assert!(store.list_snapshots("tab-2")?.is_empty());
    Ok(())
}

#[test]
fn controller_restores_from_store_after_round_trip() -> Result<()> {
    let mut store = Store::open_memory()?;
    store.bootstrap()?;
    let key = snapshot_key("default", ListKind::Users);

    let mut list: ListController<UserRow> =
        ListController::new(ListKind::Users, QueryParams::default(), DEFAULT_SEARCH_DEBOUNCE);
    let mut events = list.dispatch(ListCommand::Mount {
        snapshot: read_for_mount(&store, &key),
    });
    events.extend(list.dispatch(ListCommand::SetFilter(FilterPatch::filter(
        "plan", "gold",
    ))));
    events.extend(list.dispatch(ListCommand::PrepareForDetailNavigation { row_id: Some(4) }));
    for event in &events {
        if let ListEvent::SnapshotChanged(snapshot) = event {
            persist(&mut store, &key, snapshot)?;
        }
    }
    let expected = list.params().clone();

    let mut back: ListController<UserRow> =
        ListController::new(ListKind::Users, QueryParams::default(), DEFAULT_SEARCH_DEBOUNCE);
    let events = back.dispatch(ListCommand::Mount {
        snapshot: read_for_mount(&store, &key),
    });
    let fetches: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ListEvent::FetchRequested(request) => Some(request.params.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(fetches, vec![expected]);
    assert_eq!(back.selected_row(), Some(4));
    Ok(())
}
