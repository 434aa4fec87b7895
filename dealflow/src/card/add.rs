//! AddCard command

use super::resolve::place;
use super::retry::retry_write;
use crate::context::{BoardContext, FailPoint};
use crate::error::{DealflowError, Result};
use crate::events::BoardEvent;
use crate::store;
use crate::types::{time, Card, CardId, CardKind, ColumnId, LeadStatus, TeamId, UserId};
use dealflow_operations::{async_trait, operation, Execute};
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Add a lead or opportunity at the end of a column
#[operation(verb = "add", noun = "card", description = "Create a lead or opportunity on its board")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCard {
    pub team: TeamId,
    pub kind: CardKind,
    pub title: String,
    /// Target column; defaults to the first column of the board
    #[serde(default)]
    pub column: Option<ColumnId>,
    #[serde(default)]
    pub owner: Option<UserId>,
}

impl AddCard {
    pub fn new(team: impl Into<TeamId>, kind: CardKind, title: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            kind,
            title: title.into(),
            column: None,
            owner: None,
        }
    }

    /// A lead with the given status
    pub fn lead(team: impl Into<TeamId>, title: impl Into<String>, status: LeadStatus) -> Self {
        Self::new(team, CardKind::Lead, title).in_column(status.column_id())
    }

    pub fn in_column(mut self, column: impl Into<ColumnId>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<UserId>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    fn create(&self, ctx: &BoardContext) -> Result<(Card, bool)> {
        if self.title.trim().is_empty() {
            return Err(DealflowError::invalid_value("title", "must not be empty"));
        }

        let mut conn = ctx.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let column = match &self.column {
            Some(column) => {
                if !store::column_exists(&tx, &self.team, self.kind, column)? {
                    return Err(DealflowError::InvalidColumn {
                        kind: self.kind.to_string(),
                        column: column.to_string(),
                    });
                }
                column.clone()
            }
            None => store::list_columns(&tx, &self.team, self.kind)?
                .into_iter()
                .next()
                .map(|c| c.id)
                .ok_or_else(|| DealflowError::InvalidColumn {
                    kind: self.kind.to_string(),
                    column: "(board has no columns)".to_string(),
                })?,
        };

        let placement = place(
            &tx,
            &self.team,
            self.kind,
            &column,
            None,
            None,
            None,
            ctx.config().max_rank_len,
        )?;

        let now = time::now();
        let card = Card {
            id: CardId::new(),
            team_id: self.team.clone(),
            kind: self.kind,
            title: self.title.trim().to_string(),
            column,
            position: placement.rank,
            owner_id: self.owner.clone(),
            created_at: now,
            updated_at: now,
        };
        store::insert_card(&tx, &card)?;
        ctx.check_fail_point(FailPoint::RankConflict)?;
        tx.commit()?;

        Ok((card, placement.renormalized))
    }
}

#[async_trait]
impl Execute<BoardContext, DealflowError> for AddCard {
    async fn execute(&self, ctx: &BoardContext) -> Result<Value> {
        let (card, renormalized) = retry_write(ctx, Self::OP, || self.create(ctx)).await?;
        info!(card = %card.id, kind = %card.kind, column = %card.column, rank = %card.position, renormalized, "added card");

        ctx.publish(BoardEvent::CardAdded {
            card_id: card.id.clone(),
            kind: card.kind,
            column: card.column.clone(),
            rank: card.position.clone(),
        });
        Ok(serde_json::to_value(&card)?)
    }
}
