//! Feed types: the unified projection, filters and pages

use super::ids::UserId;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Discriminator of a feed row. Declaration order is the tie-break order
/// of rows sharing a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Case,
    Note,
    Opportunity,
    Task,
}

impl FeedKind {
    pub const ALL: [FeedKind; 4] = [
        FeedKind::Case,
        FeedKind::Note,
        FeedKind::Opportunity,
        FeedKind::Task,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Case => "case",
            FeedKind::Note => "note",
            FeedKind::Opportunity => "opportunity",
            FeedKind::Task => "task",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            FeedKind::Case => "heroicon-o-lifebuoy",
            FeedKind::Note => "heroicon-o-document-text",
            FeedKind::Opportunity => "heroicon-o-currency-dollar",
            FeedKind::Task => "heroicon-o-check-circle",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            FeedKind::Case => "danger",
            FeedKind::Note => "gray",
            FeedKind::Opportunity => "success",
            FeedKind::Task => "warning",
        }
    }

    /// URL path segment of the detail page
    pub fn path(&self) -> &'static str {
        match self {
            FeedKind::Case => "cases",
            FeedKind::Note => "notes",
            FeedKind::Opportunity => "opportunities",
            FeedKind::Task => "tasks",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown feed type '{s}'"))
    }
}

impl FromSql for FeedKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| s.parse().map_err(|e: String| FromSqlError::Other(e.into())))
    }
}

/// One row of the unified feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRow {
    pub id: String,
    pub kind: FeedKind,
    pub title: String,
    pub occurred_at: DateTime<Utc>,
    pub color: String,
    pub icon: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
}

impl FeedRow {
    /// Keyset cursor pointing just past this row
    pub fn cursor(&self) -> FeedCursor {
        FeedCursor {
            occurred_at: self.occurred_at,
            kind: self.kind,
            id: self.id.clone(),
        }
    }
}

/// Predicates pushed into every feed sub-query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedFilter {
    /// Kinds to include; empty means every kind
    #[serde(default)]
    pub kinds: BTreeSet<FeedKind>,
    /// Inclusive lower bound
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub owner: Option<UserId>,
}

impl FeedFilter {
    pub fn includes(&self, kind: FeedKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }

    pub fn with_kind(mut self, kind: FeedKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    pub fn with_owner(mut self, owner: impl Into<UserId>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_range(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }
}

/// Position in the feed's sort order (`occurred_at DESC, kind ASC, id DESC`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCursor {
    pub occurred_at: DateTime<Utc>,
    pub kind: FeedKind,
    pub id: String,
}

/// How to slice the sorted feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pagination {
    /// 1-based page number
    Offset { page: usize, page_size: usize },
    /// Rows strictly after `after` (from the start when `None`)
    Keyset {
        after: Option<FeedCursor>,
        page_size: usize,
    },
}

impl Pagination {
    pub fn page_size(&self) -> usize {
        match self {
            Pagination::Offset { page_size, .. } | Pagination::Keyset { page_size, .. } => {
                *page_size
            }
        }
    }
}

/// A page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    /// Set for offset pagination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    pub page_size: usize,
    /// Matching rows across all selected sources, ignoring pagination
    pub total: usize,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<FeedCursor>,
}
