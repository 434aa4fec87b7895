//! AddRecord command

use crate::context::BoardContext;
use crate::error::{DealflowError, Result};
use crate::store;
use crate::types::{time, Record, RecordId, RecordKind, TeamId, UserId};
use chrono::{DateTime, Utc};
use dealflow_operations::{async_trait, operation, Execute};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Create a task, note or case
#[operation(verb = "add", noun = "record", description = "Create a task, note or case")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRecord {
    pub team: TeamId,
    pub kind: RecordKind,
    /// Task title, note body or case subject
    pub title: String,
    #[serde(default)]
    pub owner: Option<UserId>,
    /// Defaults to now
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl AddRecord {
    pub fn new(team: impl Into<TeamId>, kind: RecordKind, title: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            kind,
            title: title.into(),
            owner: None,
            occurred_at: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<UserId>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }
}

#[async_trait]
impl Execute<BoardContext, DealflowError> for AddRecord {
    async fn execute(&self, ctx: &BoardContext) -> Result<Value> {
        if self.title.trim().is_empty() {
            return Err(DealflowError::invalid_value("title", "must not be empty"));
        }

        let record = Record {
            id: RecordId::new(),
            team_id: self.team.clone(),
            kind: self.kind,
            title: self.title.clone(),
            owner_id: self.owner.clone(),
            // Round-trip through the stored precision so the returned value
            // matches what the feed reads back
            occurred_at: self
                .occurred_at
                .and_then(|ts| time::decode(&time::encode(&ts)).ok())
                .unwrap_or_else(time::now),
        };
        store::insert_record(&ctx.conn(), &record)?;

        info!(record = %record.id, kind = record.kind.as_str(), "added record");
        Ok(serde_json::to_value(&record)?)
    }
}
