//! Feed sources: one sub-query per entity table

use crate::types::{time, FeedCursor, FeedFilter, FeedKind, TeamId};
use rusqlite::types::Value;
use std::cmp::Ordering;

/// Everything a source needs to render its sub-query
#[derive(Debug, Clone, Copy)]
pub struct FeedScope<'a> {
    pub team: &'a TeamId,
    pub filter: &'a FeedFilter,
    /// Only rows sorting after this cursor
    pub after: Option<&'a FeedCursor>,
    /// Prefix of detail URLs, without trailing slash
    pub url_base: &'a str,
}

/// One entity participating in the feed.
///
/// `render` returns a `SELECT` producing the columns
/// `id, kind, title, occurred_at, color, icon, url, owner_id` together with
/// the values of its `?` placeholders, in order.
pub trait FeedSource: Send + Sync {
    fn kind(&self) -> FeedKind;

    fn render(&self, scope: &FeedScope<'_>) -> (String, Vec<Value>);
}

/// A source backed by a single table with `id`, `team_id`, `owner_id` and
/// `deleted_at` columns
#[derive(Debug, Clone)]
pub struct TableSource {
    kind: FeedKind,
    table: &'static str,
    /// SQL expression for the row title
    title: &'static str,
    /// Timestamp column the feed sorts by
    timestamp: &'static str,
}

impl TableSource {
    pub const fn new(
        kind: FeedKind,
        table: &'static str,
        title: &'static str,
        timestamp: &'static str,
    ) -> Self {
        Self {
            kind,
            table,
            title,
            timestamp,
        }
    }

    pub fn tasks() -> Self {
        Self::new(FeedKind::Task, "tasks", "title", "created_at")
    }

    /// Notes show the start of their body
    pub fn notes() -> Self {
        Self::new(FeedKind::Note, "notes", "substr(body, 1, 80)", "created_at")
    }

    pub fn opportunities() -> Self {
        Self::new(FeedKind::Opportunity, "opportunities", "title", "created_at")
    }

    pub fn cases() -> Self {
        Self::new(FeedKind::Case, "cases", "subject", "opened_at")
    }

    /// Keyset predicate for rows of this source after `cursor` in
    /// `occurred_at DESC, kind ASC, id DESC` order. The kind is constant per
    /// source, so it folds into the choice of comparison.
    fn after_cursor(&self, cursor: &FeedCursor, params: &mut Vec<Value>) -> String {
        let ts = time::encode(&cursor.occurred_at);
        let col = self.timestamp;
        match self.kind.cmp(&cursor.kind) {
            Ordering::Greater => {
                params.push(Value::Text(ts));
                format!("{col} <= ?")
            }
            Ordering::Less => {
                params.push(Value::Text(ts));
                format!("{col} < ?")
            }
            Ordering::Equal => {
                params.push(Value::Text(ts.clone()));
                params.push(Value::Text(ts));
                params.push(Value::Text(cursor.id.clone()));
                format!("({col} < ? OR ({col} = ? AND id < ?))")
            }
        }
    }
}

/// Quote a constant for inlining into SQL
fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl FeedSource for TableSource {
    fn kind(&self) -> FeedKind {
        self.kind
    }

    fn render(&self, scope: &FeedScope<'_>) -> (String, Vec<Value>) {
        let col = self.timestamp;
        let mut params = vec![Value::Text(format!(
            "{}/{}/",
            scope.url_base.trim_end_matches('/'),
            self.kind.path()
        ))];

        let mut predicates = vec!["team_id = ?".to_string(), "deleted_at IS NULL".to_string()];
        params.push(Value::Text(scope.team.to_string()));

        if let Some(from) = &scope.filter.from {
            predicates.push(format!("{col} >= ?"));
            params.push(Value::Text(time::encode(from)));
        }
        if let Some(to) = &scope.filter.to {
            predicates.push(format!("{col} < ?"));
            params.push(Value::Text(time::encode(to)));
        }
        if let Some(owner) = &scope.filter.owner {
            predicates.push("owner_id = ?".to_string());
            params.push(Value::Text(owner.to_string()));
        }
        if let Some(cursor) = scope.after {
            predicates.push(self.after_cursor(cursor, &mut params));
        }

        let sql = format!(
            "SELECT id, {kind} AS kind, {title} AS title, {col} AS occurred_at, \
             {color} AS color, {icon} AS icon, ? || id AS url, owner_id \
             FROM {table} WHERE {predicates}",
            kind = literal(self.kind.as_str()),
            title = self.title,
            color = literal(self.kind.color()),
            icon = literal(self.kind.icon()),
            table = self.table,
            predicates = predicates.join(" AND "),
        );
        (sql, params)
    }
}

/// The four standard sources
pub(crate) fn default_sources() -> Vec<Box<dyn FeedSource>> {
    vec![
        Box::new(TableSource::tasks()),
        Box::new(TableSource::notes()),
        Box::new(TableSource::opportunities()),
        Box::new(TableSource::cases()),
    ]
}
