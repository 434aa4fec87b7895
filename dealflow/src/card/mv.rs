//! MoveCard command

use super::resolve::{check_neighbor, place};
use super::retry::retry_write;
use crate::context::{BoardContext, FailPoint};
use crate::error::{DealflowError, Result};
use crate::events::BoardEvent;
use crate::store;
use crate::types::{time, Card, CardId, CardMove, ColumnId, MoveId, TeamId};
use dealflow_operations::{async_trait, operation, Execute};
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Move a card to a column, optionally between two neighbors.
///
/// Column and rank change in one statement inside one transaction, together
/// with the `card_moves` row. Either all of it commits or none of it does.
/// `after`/`before` name cards the client saw around the drop target; the
/// rank is computed from the column as it is now, so a stale view cannot
/// produce a duplicate rank.
#[operation(verb = "move", noun = "card", description = "Move a card to another column or position")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveCard {
    pub team: TeamId,
    /// The card to move
    pub id: CardId,
    /// Target column: a lead status or an opportunity stage id
    pub column: ColumnId,
    /// Card that should end up directly above the moved card
    #[serde(default)]
    pub after: Option<CardId>,
    /// Card that should end up directly below the moved card
    #[serde(default)]
    pub before: Option<CardId>,
}

/// Result of a committed move
#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    #[serde(flatten)]
    pub card: Card,
    pub from_column: ColumnId,
    /// The target column was re-ranked to make room
    pub renormalized: bool,
}

impl MoveCard {
    /// Move to the end of `column`
    pub fn to_column(
        team: impl Into<TeamId>,
        id: impl Into<CardId>,
        column: impl Into<ColumnId>,
    ) -> Self {
        Self {
            team: team.into(),
            id: id.into(),
            column: column.into(),
            after: None,
            before: None,
        }
    }

    /// Place directly below `after`
    pub fn after(mut self, after: impl Into<CardId>) -> Self {
        self.after = Some(after.into());
        self
    }

    /// Place directly above `before`
    pub fn before(mut self, before: impl Into<CardId>) -> Self {
        self.before = Some(before.into());
        self
    }

    /// One attempt, start to commit. Holds the connection for its duration.
    #[tracing::instrument(level = "debug", skip_all, fields(card = %self.id, column = %self.column))]
    fn apply(&self, ctx: &BoardContext) -> Result<MoveOutcome> {
        let mut conn = ctx.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let card = store::find_card(&tx, &self.team, &self.id)?;
        if !store::column_exists(&tx, &self.team, card.kind, &self.column)? {
            return Err(DealflowError::InvalidColumn {
                kind: card.kind.to_string(),
                column: self.column.to_string(),
            });
        }
        for neighbor in self.after.iter().chain(self.before.iter()) {
            check_neighbor(&tx, &self.team, Some(&self.id), card.kind, &self.column, neighbor)?;
        }

        let placement = place(
            &tx,
            &self.team,
            card.kind,
            &self.column,
            Some(&self.id),
            self.after.as_ref(),
            self.before.as_ref(),
            ctx.config().max_rank_len,
        )?;

        let now = time::now();
        store::update_card_position(&tx, &card, &self.column, &placement.rank, &now)?;
        ctx.check_fail_point(FailPoint::AfterCardUpdate)?;

        store::insert_move(
            &tx,
            &CardMove {
                id: MoveId::new(),
                team_id: self.team.clone(),
                card_id: card.id.clone(),
                kind: card.kind,
                from_column: card.column.clone(),
                to_column: self.column.clone(),
                position: placement.rank.clone(),
                moved_at: now,
            },
        )?;
        ctx.check_fail_point(FailPoint::BeforeCommit)?;
        ctx.check_fail_point(FailPoint::RankConflict)?;

        tx.commit()?;

        let from_column = card.column.clone();
        Ok(MoveOutcome {
            card: Card {
                column: self.column.clone(),
                position: placement.rank,
                updated_at: now,
                ..card
            },
            from_column,
            renormalized: placement.renormalized,
        })
    }
}

#[async_trait]
impl Execute<BoardContext, DealflowError> for MoveCard {
    async fn execute(&self, ctx: &BoardContext) -> Result<Value> {
        let outcome = retry_write(ctx, Self::OP, || self.apply(ctx)).await?;

        info!(
            card = %outcome.card.id,
            from = %outcome.from_column,
            to = %outcome.card.column,
            rank = %outcome.card.position,
            renormalized = outcome.renormalized,
            "moved card"
        );

        ctx.publish(BoardEvent::CardMoved {
            card_id: outcome.card.id.clone(),
            kind: outcome.card.kind,
            from_column: outcome.from_column.clone(),
            column: outcome.card.column.clone(),
            rank: outcome.card.position.clone(),
            renormalized: outcome.renormalized,
        });

        Ok(serde_json::to_value(&outcome)?)
    }
}
