// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use fitdash_app::SnapshotStore;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

pub const APP_NAME: &str = "fitdash";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[(
    "nav_snapshots",
    &["key", "session_id", "value", "updated_at"],
)];

/// Entry point for the per-session navigation snapshot database.
pub struct Store {
    conn: Connection,
}

/// One stored snapshot row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        }
        self.conn
            .execute_batch(include_str!("sql/schema.sql"))
            .context("create schema")?;
        Ok(())
    }

    pub fn get_snapshot(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM nav_snapshots WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read snapshot {key}"))
    }

    pub fn put_snapshot(&self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO nav_snapshots (key, session_id, value, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, session_of(key), value, now],
            )
            .with_context(|| format!("upsert snapshot {key}"))?;
        debug!(key, "snapshot stored");
        Ok(())
    }

    pub fn delete_snapshot(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM nav_snapshots WHERE key = ?", params![key])
            .with_context(|| format!("delete snapshot {key}"))?;
        Ok(())
    }

    pub fn list_snapshots(&self, session_id: &str) -> Result<Vec<SnapshotEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT key, value, updated_at
                FROM nav_snapshots
                WHERE session_id = ?
                ORDER BY key ASC
                ",
            )
            .context("prepare snapshot list query")?;
        let rows = stmt
            .query_map(params![session_id], |row| {
                Ok(SnapshotEntry {
                    key: row.get(0)?,
                    value: row.get(1)?,
                    updated_at: row.get(2)?,
                })
            })
            .with_context(|| format!("list snapshots for session {session_id}"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect snapshots")
    }

    /// Drops every snapshot of one session, as when its tab closes.
    pub fn clear_session(&self, session_id: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM nav_snapshots WHERE session_id = ?",
                params![session_id],
            )
            .with_context(|| format!("clear session {session_id}"))?;
        debug!(session_id, removed, "session snapshots cleared");
        Ok(removed)
    }
}

impl SnapshotStore for Store {
    fn read_snapshot(&self, key: &str) -> Result<Option<String>> {
        self.get_snapshot(key)
    }

    fn write_snapshot(&mut self, key: &str, raw: &str) -> Result<()> {
        self.put_snapshot(key, raw)
    }

    fn clear_snapshot(&mut self, key: &str) -> Result<()> {
        self.delete_snapshot(key)
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("FITDASH_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set FITDASH_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("session.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn session_of(key: &str) -> &str {
    key.split('/').next().unwrap_or(key)
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point session.db_path at a fitdash session database"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; delete the session database to start fresh",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
