// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::{ListKind, QueryParams};

pub const SNAPSHOT_VERSION: u32 = 1;

/// List state persisted across a detail-view round trip.
///
/// Every field defaults, so snapshots written by older or newer builds
/// still parse; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NavigationSnapshot {
    pub version: u32,
    pub query: QueryParams,
    pub is_returning: bool,
    pub scroll_offset: u32,
    pub selected_row: Option<i64>,
}

impl Default for NavigationSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            query: QueryParams::default(),
            is_returning: false,
            scroll_offset: 0,
            selected_row: None,
        }
    }
}

impl NavigationSnapshot {
    /// Decodes a stored snapshot. Corrupt input yields `None` instead of an
    /// error so a bad entry can never block the list from loading.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<Self>(trimmed) {
            Ok(snapshot) => Some(Self {
                query: snapshot.query.normalized(),
                ..snapshot
            }),
            Err(error) => {
                warn!(%error, "discarding unreadable navigation snapshot");
                None
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("encode navigation snapshot")
    }
}

pub fn snapshot_key(session: &str, kind: ListKind) -> String {
    format!("{session}/{}/nav", kind.as_str())
}

/// Per-session key/value storage for navigation snapshots.
pub trait SnapshotStore {
    fn read_snapshot(&self, key: &str) -> Result<Option<String>>;
    fn write_snapshot(&mut self, key: &str, raw: &str) -> Result<()>;
    fn clear_snapshot(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    entries: HashMap<String, String>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read_snapshot(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write_snapshot(&mut self, key: &str, raw: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), raw.to_owned());
        Ok(())
    }

    fn clear_snapshot(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Reads the snapshot a mounting list should see. Store failures degrade to
/// "no snapshot".
pub fn read_for_mount(store: &dyn SnapshotStore, key: &str) -> Option<String> {
    match store.read_snapshot(key) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(key, error = %format!("{error:#}"), "snapshot store read failed; using defaults");
            None
        }
    }
}

pub fn persist(store: &mut dyn SnapshotStore, key: &str, snapshot: &NavigationSnapshot) -> Result<()> {
    let raw = snapshot.to_json()?;
    store
        .write_snapshot(key, &raw)
        .with_context(|| format!("write navigation snapshot {key}"))
}
