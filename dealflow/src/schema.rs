//! SQLite schema and migrations
//!
//! Migrations run in order and are tracked with `PRAGMA user_version`, so
//! applying them is idempotent.
//!
//! # Schema
//!
//! - `custom_field_options`: per-team options of custom fields; `stage` options
//!   are the opportunity board's columns
//! - `leads`, `opportunities`: orderable cards (`status` / `stage_id` + `position`)
//! - `tasks`, `notes`, `cases`: activity records shown in the feed
//! - `card_moves`: one row per committed move
//! - `operation_log`: audit entries written by the operation processor
//!
//! Card ranks are unique per (team, column) among live rows. `position` is
//! nullable only so that a column can be re-ranked inside one transaction.

use crate::error::Result;
use rusqlite::Connection;
use tracing::info;

/// (name, SQL) in application order
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "create_custom_field_options",
        r#"
        CREATE TABLE custom_field_options (
            id TEXT PRIMARY KEY,
            team_id TEXT NOT NULL,
            field TEXT NOT NULL,
            label TEXT NOT NULL,
            color TEXT,
            sort_order INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            deleted_at TEXT
        );
        CREATE INDEX idx_custom_field_options_team ON custom_field_options(team_id, field);
        "#,
    ),
    (
        "create_leads",
        r#"
        CREATE TABLE leads (
            id TEXT PRIMARY KEY,
            team_id TEXT NOT NULL,
            title TEXT NOT NULL,
            status TEXT NOT NULL,
            position TEXT,
            owner_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );
        CREATE UNIQUE INDEX idx_leads_position ON leads(team_id, status, position)
            WHERE deleted_at IS NULL;
        "#,
    ),
    (
        "create_opportunities",
        r#"
        CREATE TABLE opportunities (
            id TEXT PRIMARY KEY,
            team_id TEXT NOT NULL,
            title TEXT NOT NULL,
            stage_id TEXT NOT NULL REFERENCES custom_field_options(id),
            position TEXT,
            owner_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );
        CREATE UNIQUE INDEX idx_opportunities_position ON opportunities(team_id, stage_id, position)
            WHERE deleted_at IS NULL;
        CREATE INDEX idx_opportunities_feed ON opportunities(team_id, created_at);
        "#,
    ),
    (
        "create_activity_records",
        r#"
        CREATE TABLE tasks (
            id TEXT PRIMARY KEY,
            team_id TEXT NOT NULL,
            title TEXT NOT NULL,
            owner_id TEXT,
            created_at TEXT NOT NULL,
            deleted_at TEXT
        );
        CREATE INDEX idx_tasks_feed ON tasks(team_id, created_at);

        CREATE TABLE notes (
            id TEXT PRIMARY KEY,
            team_id TEXT NOT NULL,
            body TEXT NOT NULL,
            owner_id TEXT,
            created_at TEXT NOT NULL,
            deleted_at TEXT
        );
        CREATE INDEX idx_notes_feed ON notes(team_id, created_at);

        CREATE TABLE cases (
            id TEXT PRIMARY KEY,
            team_id TEXT NOT NULL,
            subject TEXT NOT NULL,
            owner_id TEXT,
            opened_at TEXT NOT NULL,
            deleted_at TEXT
        );
        CREATE INDEX idx_cases_feed ON cases(team_id, opened_at);
        "#,
    ),
    (
        "create_card_moves",
        r#"
        CREATE TABLE card_moves (
            id TEXT PRIMARY KEY,
            team_id TEXT NOT NULL,
            card_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            from_column TEXT NOT NULL,
            to_column TEXT NOT NULL,
            position TEXT NOT NULL,
            moved_at TEXT NOT NULL
        );
        CREATE INDEX idx_card_moves_card ON card_moves(card_id, moved_at);
        "#,
    ),
    (
        "create_operation_log",
        r#"
        CREATE TABLE operation_log (
            id TEXT PRIMARY KEY,
            timestamp TEXT NOT NULL,
            op TEXT NOT NULL,
            input TEXT NOT NULL,
            output TEXT NOT NULL,
            actor TEXT,
            duration_ms INTEGER NOT NULL
        );
        "#,
    ),
];

/// Version after all migrations are applied
pub fn latest_version() -> usize {
    MIGRATIONS.len()
}

/// Currently applied version
pub fn current_version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(usize::try_from(version).unwrap_or(0))
}

/// Apply pending migrations, each in its own transaction. Returns how many ran.
pub fn migrate(conn: &mut Connection) -> Result<usize> {
    let current = current_version(conn)?;
    let mut applied = 0;

    for (version, (name, sql)) in MIGRATIONS.iter().enumerate().skip(current) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", (version + 1) as i64)?;
        tx.commit()?;

        info!(migration = name, version = version + 1, "applied migration");
        applied += 1;
    }

    Ok(applied)
}
