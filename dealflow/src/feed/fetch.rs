//! FetchFeed command

use super::query::row_offset;
use super::FeedQuery;
use crate::context::BoardContext;
use crate::error::{DealflowError, Result};
use crate::types::{FeedCursor, FeedFilter, FeedKind, Pagination, TeamId, UserId};
use chrono::{DateTime, Utc};
use dealflow_operations::{async_trait, operation, Execute};
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fetch a page of the team's activity feed: tasks, notes, opportunities and
/// cases merged newest first.
///
/// Offset pagination uses `page`/`page_size`; passing `after` switches to
/// keyset pagination from that cursor.
#[operation(verb = "fetch", noun = "feed", description = "Fetch the unified activity feed", read_only = true)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchFeed {
    pub team: TeamId,
    /// Kind names to include (`task`, `note`, `opportunity`, `case`); empty
    /// means all
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub owner: Option<UserId>,
    /// 1-based; defaults to 1
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub after: Option<FeedCursor>,
}

impl FetchFeed {
    pub fn new(team: impl Into<TeamId>) -> Self {
        Self {
            team: team.into(),
            kinds: Vec::new(),
            from: None,
            to: None,
            owner: None,
            page: None,
            page_size: None,
            after: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kinds.push(kind.into());
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

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    pub fn after(mut self, cursor: FeedCursor) -> Self {
        self.after = Some(cursor);
        self
    }

    fn filter(&self) -> Result<FeedFilter> {
        let mut filter = FeedFilter::default().with_range(self.from, self.to);
        filter.owner = self.owner.clone();
        for name in &self.kinds {
            let kind: FeedKind = name.parse().map_err(|_| DealflowError::InvalidFilter {
                field: "type".to_string(),
                value: name.clone(),
            })?;
            filter = filter.with_kind(kind);
        }

        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from >= to {
                return Err(DealflowError::invalid_value("to", "must be later than from"));
            }
        }
        Ok(filter)
    }

    fn pagination(&self, ctx: &BoardContext) -> Result<Pagination> {
        let limits = &ctx.config().feed;
        let page_size = self.page_size.unwrap_or(limits.default_page_size);
        if page_size == 0 || page_size > limits.max_page_size {
            return Err(DealflowError::invalid_value(
                "page_size",
                format!("must be between 1 and {}", limits.max_page_size),
            ));
        }

        match (&self.after, self.page) {
            (Some(_), Some(_)) => Err(DealflowError::invalid_value(
                "page",
                "cannot be combined with a cursor",
            )),
            (Some(after), None) => Ok(Pagination::Keyset {
                after: Some(after.clone()),
                page_size,
            }),
            (None, Some(0)) => Err(DealflowError::invalid_value("page", "must be at least 1")),
            (None, page) => {
                let page = page.unwrap_or(1);
                row_offset(page, page_size)?;
                Ok(Pagination::Offset { page, page_size })
            }
        }
    }
}

#[async_trait]
impl Execute<BoardContext, DealflowError> for FetchFeed {
    async fn execute(&self, ctx: &BoardContext) -> Result<Value> {
        let filter = self.filter()?;
        let pagination = self.pagination(ctx)?;

        // Count and rows come from one snapshot
        let mut conn = ctx.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let page = FeedQuery::default().fetch(
            &tx,
            &self.team,
            &filter,
            &pagination,
            &ctx.config().feed.url_base,
        )?;
        tx.commit()?;
        Ok(serde_json::to_value(&page)?)
    }
}
