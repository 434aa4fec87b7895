//! Row-level I/O primitives
//!
//! Every function takes a `&Connection` so the caller decides the transaction
//! (a `rusqlite::Transaction` derefs to a connection). Table and column names
//! come from [`CardKind`], never from input.

use crate::error::{DealflowError, Result};
use crate::types::{
    time, Card, CardId, CardKind, CardMove, Column, ColumnId, LeadStatus, Rank, Record,
    RecordKind, TeamId,
};
use chrono::{DateTime, Utc};
use dealflow_operations::LogEntry;
use rusqlite::{params, Connection, OptionalExtension, Row};
use ulid::Ulid;

/// Custom field whose options are the opportunity columns
pub const STAGE_FIELD: &str = "stage";

// =============================================================================
// Cards
// =============================================================================

fn card_from_row(kind: CardKind, row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get("id")?,
        team_id: row.get("team_id")?,
        kind,
        title: row.get("title")?,
        column: row.get("column_id")?,
        position: row.get("position")?,
        owner_id: row.get("owner_id")?,
        created_at: time::column(row, "created_at")?,
        updated_at: time::column(row, "updated_at")?,
    })
}

fn card_select(kind: CardKind) -> String {
    format!(
        "SELECT id, team_id, title, {field} AS column_id, position, owner_id, created_at, updated_at
         FROM {table}",
        field = kind.column_field(),
        table = kind.table(),
    )
}

/// Read a live card of any kind. Soft-deleted cards are not found.
pub fn find_card(conn: &Connection, team: &TeamId, id: &CardId) -> Result<Card> {
    for kind in CardKind::ALL {
        let sql = format!(
            "{} WHERE team_id = ?1 AND id = ?2 AND deleted_at IS NULL",
            card_select(kind)
        );
        let card = conn
            .query_row(&sql, params![team, id], |row| card_from_row(kind, row))
            .optional()?;
        if let Some(card) = card {
            return Ok(card);
        }
    }

    Err(DealflowError::CardNotFound { id: id.to_string() })
}

/// Live cards of a column ordered by rank, optionally leaving one out
pub fn column_cards(
    conn: &Connection,
    team: &TeamId,
    kind: CardKind,
    column: &ColumnId,
    exclude: Option<&CardId>,
) -> Result<Vec<Card>> {
    let sql = format!(
        "{} WHERE team_id = ?1 AND {field} = ?2 AND deleted_at IS NULL
           AND position IS NOT NULL AND (?3 IS NULL OR id != ?3)
         ORDER BY position",
        card_select(kind),
        field = kind.column_field(),
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![team, column, exclude], |row| card_from_row(kind, row))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn insert_card(conn: &Connection, card: &Card) -> Result<()> {
    let sql = format!(
        "INSERT INTO {table} (id, team_id, title, {field}, position, owner_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        table = card.kind.table(),
        field = card.kind.column_field(),
    );
    conn.execute(
        &sql,
        params![
            card.id,
            card.team_id,
            card.title,
            card.column,
            card.position,
            card.owner_id,
            time::encode(&card.created_at),
            time::encode(&card.updated_at),
        ],
    )
    .map_err(|e| {
        DealflowError::from_position_write(e, &format!("rank {} taken in {}", card.position, card.column))
    })?;
    Ok(())
}

/// Set column and rank of a card in one statement
pub fn update_card_position(
    conn: &Connection,
    card: &Card,
    column: &ColumnId,
    rank: &Rank,
    now: &DateTime<Utc>,
) -> Result<()> {
    let sql = format!(
        "UPDATE {table} SET {field} = ?1, position = ?2, updated_at = ?3
         WHERE id = ?4 AND deleted_at IS NULL",
        table = card.kind.table(),
        field = card.kind.column_field(),
    );
    let changed = conn
        .execute(&sql, params![column, rank, time::encode(now), card.id])
        .map_err(|e| DealflowError::from_position_write(e, &format!("rank {rank} taken in {column}")))?;

    if changed == 0 {
        return Err(DealflowError::CardNotFound {
            id: card.id.to_string(),
        });
    }
    Ok(())
}

pub fn soft_delete_card(conn: &Connection, card: &Card, now: &DateTime<Utc>) -> Result<()> {
    let sql = format!(
        "UPDATE {table} SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        table = card.kind.table(),
    );
    conn.execute(&sql, params![time::encode(now), card.id])?;
    Ok(())
}

/// Give the cards `ids` (in that order) fresh evenly spread ranks.
///
/// Every live card of the column loses its rank first, so cards missing from
/// `ids` end up without one; callers pass the full column, or the column minus
/// a card whose position they write next.
pub fn rewrite_ranks(
    conn: &Connection,
    team: &TeamId,
    kind: CardKind,
    column: &ColumnId,
    ids: &[CardId],
) -> Result<Vec<Rank>> {
    let clear = format!(
        "UPDATE {table} SET position = NULL WHERE team_id = ?1 AND {field} = ?2 AND deleted_at IS NULL",
        table = kind.table(),
        field = kind.column_field(),
    );
    conn.execute(&clear, params![team, column])?;

    let assign = format!(
        "UPDATE {table} SET position = ?1 WHERE id = ?2",
        table = kind.table()
    );
    let mut stmt = conn.prepare_cached(&assign)?;
    let ranks = Rank::spread(ids.len());
    for (id, rank) in ids.iter().zip(&ranks) {
        stmt.execute(params![rank, id])
            .map_err(|e| DealflowError::from_position_write(e, &format!("rank {rank} taken in {column}")))?;
    }

    Ok(ranks)
}

pub fn insert_move(conn: &Connection, mv: &CardMove) -> Result<()> {
    conn.execute(
        "INSERT INTO card_moves (id, team_id, card_id, kind, from_column, to_column, position, moved_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            mv.id,
            mv.team_id,
            mv.card_id,
            mv.kind.as_str(),
            mv.from_column,
            mv.to_column,
            mv.position,
            time::encode(&mv.moved_at),
        ],
    )?;
    Ok(())
}

/// Committed moves of a card, oldest first
pub fn list_moves(conn: &Connection, team: &TeamId, card: &CardId) -> Result<Vec<CardMove>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, team_id, card_id, kind, from_column, to_column, position, moved_at
         FROM card_moves WHERE team_id = ?1 AND card_id = ?2
         ORDER BY moved_at, rowid",
    )?;
    let rows = stmt.query_map(params![team, card], |row| {
        let kind: String = row.get("kind")?;
        Ok(CardMove {
            id: row.get("id")?,
            team_id: row.get("team_id")?,
            card_id: row.get("card_id")?,
            kind: kind.parse().map_err(|e: String| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
            })?,
            from_column: row.get("from_column")?,
            to_column: row.get("to_column")?,
            position: row.get("position")?,
            moved_at: time::column(row, "moved_at")?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

// =============================================================================
// Columns
// =============================================================================

fn stage_from_row(row: &Row<'_>) -> rusqlite::Result<Column> {
    let order: i64 = row.get("sort_order")?;
    Ok(Column {
        id: row.get("id")?,
        kind: CardKind::Opportunity,
        label: row.get("label")?,
        color: row.get("color")?,
        order: order.max(0) as usize,
    })
}

/// Allowed columns of a board, in display order
pub fn list_columns(conn: &Connection, team: &TeamId, kind: CardKind) -> Result<Vec<Column>> {
    match kind {
        CardKind::Lead => Ok(Column::lead_columns()),
        CardKind::Opportunity => {
            let mut stmt = conn.prepare_cached(
                "SELECT id, label, color, sort_order FROM custom_field_options
                 WHERE team_id = ?1 AND field = ?2 AND deleted_at IS NULL
                 ORDER BY sort_order, id",
            )?;
            let rows = stmt.query_map(params![team, STAGE_FIELD], stage_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        }
    }
}

/// Whether `column` is a valid discriminator value for the team's board
pub fn column_exists(
    conn: &Connection,
    team: &TeamId,
    kind: CardKind,
    column: &ColumnId,
) -> Result<bool> {
    match kind {
        CardKind::Lead => Ok(LeadStatus::from_column(column).is_some()),
        CardKind::Opportunity => {
            let found = conn
                .query_row(
                    "SELECT 1 FROM custom_field_options
                     WHERE id = ?1 AND team_id = ?2 AND field = ?3 AND deleted_at IS NULL",
                    params![column, team, STAGE_FIELD],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        }
    }
}

pub fn insert_stage(
    conn: &Connection,
    team: &TeamId,
    stage: &Column,
    now: &DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO custom_field_options (id, team_id, field, label, color, sort_order, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            stage.id,
            team,
            STAGE_FIELD,
            stage.label,
            stage.color,
            stage.order as i64,
            time::encode(now),
        ],
    )?;
    Ok(())
}

/// Next free `sort_order` for a team's stages
pub fn next_stage_order(conn: &Connection, team: &TeamId) -> Result<usize> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(sort_order) FROM custom_field_options WHERE team_id = ?1 AND field = ?2",
        params![team, STAGE_FIELD],
        |row| row.get(0),
    )?;
    Ok(max.map(|m| m.max(-1) + 1).unwrap_or(0) as usize)
}

// =============================================================================
// Records
// =============================================================================

pub fn insert_record(conn: &Connection, record: &Record) -> Result<()> {
    let sql = match record.kind {
        RecordKind::Task => {
            "INSERT INTO tasks (id, team_id, title, owner_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)"
        }
        RecordKind::Note => {
            "INSERT INTO notes (id, team_id, body, owner_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)"
        }
        RecordKind::Case => {
            "INSERT INTO cases (id, team_id, subject, owner_id, opened_at) VALUES (?1, ?2, ?3, ?4, ?5)"
        }
    };
    conn.execute(
        sql,
        params![
            record.id,
            record.team_id,
            record.title,
            record.owner_id,
            time::encode(&record.occurred_at),
        ],
    )?;
    Ok(())
}

// =============================================================================
// Operation log
// =============================================================================

pub fn insert_log_entry(conn: &Connection, entry: &LogEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO operation_log (id, timestamp, op, input, output, actor, duration_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.id.to_string(),
            time::encode(&entry.timestamp),
            entry.op,
            serde_json::to_string(&entry.input)?,
            serde_json::to_string(&entry.output)?,
            entry.actor,
            entry.duration_ms as i64,
        ],
    )?;
    Ok(())
}

/// Newest first (insertion order)
pub fn read_log_entries(conn: &Connection, limit: Option<usize>) -> Result<Vec<LogEntry>> {
    let limit = limit.map(|l| l as i64).unwrap_or(-1);
    let mut stmt = conn.prepare_cached(
        "SELECT id, timestamp, op, input, output, actor, duration_ms
         FROM operation_log ORDER BY rowid DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        let input: String = row.get("input")?;
        let output: String = row.get("output")?;
        let duration: i64 = row.get("duration_ms")?;
        let id: String = row.get("id")?;
        let id = Ulid::from_string(&id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok((
            id,
            time::column(row, "timestamp")?,
            row.get::<_, String>("op")?,
            input,
            output,
            row.get::<_, Option<String>>("actor")?,
            duration,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, timestamp, op, input, output, actor, duration) = row?;
        entries.push(LogEntry {
            id,
            timestamp,
            op,
            input: serde_json::from_str(&input)?,
            output: serde_json::from_str(&output)?,
            actor,
            duration_ms: duration.max(0) as u64,
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn setup() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        schema::migrate(&mut conn).unwrap();
        conn
    }

    fn lead(team: &TeamId, status: LeadStatus, rank: &str) -> Card {
        let now = time::now();
        Card {
            id: CardId::new(),
            team_id: team.clone(),
            kind: CardKind::Lead,
            title: format!("lead {rank}"),
            column: status.column_id(),
            position: Rank::parse(rank).unwrap(),
            owner_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_card_io() {
        let conn = setup();
        let team = TeamId::from_string("acme");
        let card = lead(&team, LeadStatus::New, "V");
        insert_card(&conn, &card).unwrap();

        let loaded = find_card(&conn, &team, &card.id).unwrap();
        assert_eq!(loaded, card);

        // Other teams cannot see it
        let other = TeamId::from_string("globex");
        assert!(matches!(
            find_card(&conn, &other, &card.id),
            Err(DealflowError::CardNotFound { .. })
        ));

        soft_delete_card(&conn, &card, &time::now()).unwrap();
        assert!(matches!(
            find_card(&conn, &team, &card.id),
            Err(DealflowError::CardNotFound { .. })
        ));
    }

    #[test]
    fn test_column_cards_ordered_and_excluding() {
        let conn = setup();
        let team = TeamId::from_string("acme");
        let b = lead(&team, LeadStatus::New, "k");
        let a = lead(&team, LeadStatus::New, "F");
        let other = lead(&team, LeadStatus::Qualified, "V");
        for card in [&b, &a, &other] {
            insert_card(&conn, card).unwrap();
        }

        let column = LeadStatus::New.column_id();
        let cards = column_cards(&conn, &team, CardKind::Lead, &column, None).unwrap();
        let ids: Vec<_> = cards.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![a.id.clone(), b.id.clone()]);

        let cards = column_cards(&conn, &team, CardKind::Lead, &column, Some(&a.id)).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, b.id);
    }

    #[test]
    fn test_duplicate_rank_is_conflict() {
        let conn = setup();
        let team = TeamId::from_string("acme");
        insert_card(&conn, &lead(&team, LeadStatus::New, "V")).unwrap();
        let err = insert_card(&conn, &lead(&team, LeadStatus::New, "V")).unwrap_err();
        assert!(matches!(err, DealflowError::RankConflict { .. }));

        // Same rank in another column is fine
        insert_card(&conn, &lead(&team, LeadStatus::Contacted, "V")).unwrap();
    }

    #[test]
    fn test_rewrite_ranks_keeps_order() {
        let conn = setup();
        let team = TeamId::from_string("acme");
        let column = LeadStatus::New.column_id();
        let cards: Vec<Card> = ["V", "VV", "VVV", "VVVV"]
            .iter()
            .map(|r| lead(&team, LeadStatus::New, r))
            .collect();
        for card in &cards {
            insert_card(&conn, card).unwrap();
        }

        let ids: Vec<CardId> = cards.iter().map(|c| c.id.clone()).collect();
        let ranks = rewrite_ranks(&conn, &team, CardKind::Lead, &column, &ids).unwrap();
        assert_eq!(ranks.len(), 4);
        assert!(ranks.iter().all(|r| r.len() == 1));

        let reloaded: Vec<CardId> = column_cards(&conn, &team, CardKind::Lead, &column, None)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(reloaded, ids);
    }

    #[test]
    fn test_stage_columns() {
        let conn = setup();
        let team = TeamId::from_string("acme");
        assert_eq!(next_stage_order(&conn, &team).unwrap(), 0);

        let stage = Column {
            id: ColumnId::new(),
            kind: CardKind::Opportunity,
            label: "Proposal".into(),
            color: None,
            order: 0,
        };
        insert_stage(&conn, &team, &stage, &time::now()).unwrap();
        assert_eq!(next_stage_order(&conn, &team).unwrap(), 1);

        assert!(column_exists(&conn, &team, CardKind::Opportunity, &stage.id).unwrap());
        assert!(!column_exists(&conn, &TeamId::from_string("globex"), CardKind::Opportunity, &stage.id).unwrap());
        assert!(column_exists(&conn, &team, CardKind::Lead, &ColumnId::from_string("new")).unwrap());
        assert!(!column_exists(&conn, &team, CardKind::Lead, &stage.id).unwrap());

        let columns = list_columns(&conn, &team, CardKind::Opportunity).unwrap();
        assert_eq!(columns, vec![stage]);
        assert_eq!(list_columns(&conn, &team, CardKind::Lead).unwrap().len(), 5);
    }
}
