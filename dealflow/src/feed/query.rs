//! UNION ALL composition, ordering and pagination of feed sources

use super::source::{default_sources, FeedScope, FeedSource};
use crate::error::{DealflowError, Result};
use crate::types::{time, FeedFilter, FeedRow, Page, Pagination, TeamId};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use tracing::debug;

const ORDER_BY: &str = "occurred_at DESC, kind ASC, id DESC";

/// Rows skipped before `page`; fails when it does not fit an SQLite integer
pub(crate) fn row_offset(page: usize, page_size: usize) -> Result<i64> {
    page.saturating_sub(1)
        .checked_mul(page_size)
        .and_then(|offset| i64::try_from(offset).ok())
        .ok_or_else(|| DealflowError::invalid_value("page", "is out of range"))
}

/// Composes feed sources into one sorted, paginated query
pub struct FeedQuery {
    sources: Vec<Box<dyn FeedSource>>,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self::new(default_sources())
    }
}

impl FeedQuery {
    pub fn new(sources: Vec<Box<dyn FeedSource>>) -> Self {
        Self { sources }
    }

    /// Register another source
    pub fn with_source(mut self, source: impl FeedSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// `UNION ALL` of the sources selected by the filter; `None` when no
    /// source is selected
    fn union(&self, scope: &FeedScope<'_>) -> Option<(String, Vec<Value>)> {
        let mut parts = Vec::new();
        let mut params = Vec::new();
        for source in self
            .sources
            .iter()
            .filter(|s| scope.filter.includes(s.kind()))
        {
            let (sql, source_params) = source.render(scope);
            parts.push(sql);
            params.extend(source_params);
        }

        if parts.is_empty() {
            None
        } else {
            Some((parts.join("\nUNION ALL\n"), params))
        }
    }

    /// Fetch one page of the team's feed
    #[tracing::instrument(level = "debug", skip_all, fields(team = %team))]
    pub fn fetch(
        &self,
        conn: &Connection,
        team: &TeamId,
        filter: &FeedFilter,
        pagination: &Pagination,
        url_base: &str,
    ) -> Result<Page<FeedRow>> {
        let page_size = pagination.page_size();
        let (page, offset, after) = match pagination {
            Pagination::Offset { page, page_size } => {
                (Some(*page), row_offset(*page, *page_size)?, None)
            }
            Pagination::Keyset { after, .. } => (None, 0, after.as_ref()),
        };
        let limit = i64::try_from(page_size)
            .ok()
            .and_then(|size| size.checked_add(1))
            .ok_or_else(|| DealflowError::invalid_value("page_size", "is too large"))?;

        let mut scope = FeedScope {
            team,
            filter,
            after: None,
            url_base,
        };
        let total = match self.union(&scope) {
            Some((sql, params)) => {
                let count: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM ({sql})"),
                    params_from_iter(params),
                    |row| row.get(0),
                )?;
                count.max(0) as usize
            }
            None => 0,
        };

        scope.after = after;
        let mut rows = match self.union(&scope) {
            Some((sql, mut params)) => {
                let sql = format!(
                    "SELECT id, kind, title, occurred_at, color, icon, url, owner_id
                     FROM ({sql})
                     ORDER BY {ORDER_BY}
                     LIMIT ? OFFSET ?"
                );
                // One extra row tells whether another page exists
                params.push(Value::Integer(limit));
                params.push(Value::Integer(offset));

                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(params), feed_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => Vec::new(),
        };

        let has_more = rows.len() > page_size;
        rows.truncate(page_size);
        let next_cursor = if has_more {
            rows.last().map(FeedRow::cursor)
        } else {
            None
        };
        debug!(rows = rows.len(), total, has_more, "fetched feed page");

        Ok(Page {
            rows,
            page,
            page_size,
            total,
            has_more,
            next_cursor,
        })
    }
}

fn feed_row(row: &Row<'_>) -> rusqlite::Result<FeedRow> {
    Ok(FeedRow {
        id: row.get("id")?,
        kind: row.get("kind")?,
        title: row.get("title")?,
        occurred_at: time::column(row, "occurred_at")?,
        color: row.get("color")?,
        icon: row.get("icon")?,
        url: row.get("url")?,
        owner_id: row.get("owner_id")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::TableSource;
    use crate::schema;
    use crate::types::{FeedCursor, FeedKind};
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        schema::migrate(&mut conn).unwrap();

        let base = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        for i in 0..4i64 {
            let ts = time::encode(&(base + Duration::minutes(i)));
            conn.execute(
                "INSERT INTO tasks (id, team_id, title, owner_id, created_at) VALUES (?1, 'acme', ?2, 'u1', ?3)",
                rusqlite::params![format!("t{i}"), format!("task {i}"), ts],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO notes (id, team_id, body, owner_id, created_at) VALUES (?1, 'acme', ?2, 'u2', ?3)",
                rusqlite::params![format!("n{i}"), "x".repeat(200), ts],
            )
            .unwrap();
        }
        conn.execute(
            "INSERT INTO cases (id, team_id, subject, opened_at) VALUES ('c0', 'globex', 'elsewhere', ?1)",
            rusqlite::params![time::encode(&base)],
        )
        .unwrap();
        conn
    }

    fn offset(page: usize, page_size: usize) -> Pagination {
        Pagination::Offset { page, page_size }
    }

    #[test]
    fn test_sorted_with_deterministic_ties() {
        let conn = setup();
        let page = FeedQuery::default()
            .fetch(
                &conn,
                &TeamId::from_string("acme"),
                &FeedFilter::default(),
                &offset(1, 15),
                "/app",
            )
            .unwrap();

        assert_eq!(page.total, 8);
        assert!(!page.has_more);
        let ids: Vec<&str> = page.rows.iter().map(|r| r.id.as_str()).collect();
        // Same timestamp: note sorts before task
        assert_eq!(ids, vec!["n3", "t3", "n2", "t2", "n1", "t1", "n0", "t0"]);
        assert_eq!(page.rows[0].title.len(), 80);
        assert_eq!(page.rows[1].url, "/app/tasks/t3");
    }

    #[test]
    fn test_offset_pages() {
        let conn = setup();
        let team = TeamId::from_string("acme");
        let query = FeedQuery::default();

        let first = query
            .fetch(&conn, &team, &FeedFilter::default(), &offset(1, 3), "/app")
            .unwrap();
        assert_eq!(first.rows.len(), 3);
        assert!(first.has_more);
        assert_eq!(first.page, Some(1));

        let last = query
            .fetch(&conn, &team, &FeedFilter::default(), &offset(3, 3), "/app")
            .unwrap();
        assert_eq!(last.rows.len(), 2);
        assert!(!last.has_more);
        assert_eq!(last.total, 8);
    }

    #[test]
    fn test_keyset_walks_whole_feed() {
        let conn = setup();
        let team = TeamId::from_string("acme");
        let query = FeedQuery::default();

        let mut after: Option<FeedCursor> = None;
        let mut seen = Vec::new();
        loop {
            let page = query
                .fetch(
                    &conn,
                    &team,
                    &FeedFilter::default(),
                    &Pagination::Keyset {
                        after: after.clone(),
                        page_size: 3,
                    },
                    "/app",
                )
                .unwrap();
            assert_eq!(page.total, 8);
            seen.extend(page.rows.iter().map(|r| r.id.clone()));
            match page.next_cursor {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }
        assert_eq!(seen, vec!["n3", "t3", "n2", "t2", "n1", "t1", "n0", "t0"]);
    }

    #[test]
    fn test_kind_and_owner_filters() {
        let conn = setup();
        let team = TeamId::from_string("acme");
        let query = FeedQuery::default();

        let notes = query
            .fetch(
                &conn,
                &team,
                &FeedFilter::default().with_kind(FeedKind::Note),
                &offset(1, 15),
                "/app",
            )
            .unwrap();
        assert_eq!(notes.total, 4);
        assert!(notes.rows.iter().all(|r| r.kind == FeedKind::Note));

        let mine = query
            .fetch(
                &conn,
                &team,
                &FeedFilter::default().with_owner("u1"),
                &offset(1, 15),
                "/app",
            )
            .unwrap();
        assert!(mine.rows.iter().all(|r| r.kind == FeedKind::Task));
    }

    #[test]
    fn test_no_selected_source_is_empty() {
        let conn = setup();
        let query = FeedQuery::new(vec![]).with_source(TableSource::cases());
        let page = query
            .fetch(
                &conn,
                &TeamId::from_string("acme"),
                &FeedFilter::default().with_kind(FeedKind::Task),
                &offset(1, 15),
                "/app",
            )
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.rows.is_empty());
    }
}
