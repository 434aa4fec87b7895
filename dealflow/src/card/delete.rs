//! DeleteCard command

use crate::context::BoardContext;
use crate::error::{DealflowError, Result};
use crate::events::BoardEvent;
use crate::store;
use crate::types::{time, CardId, TeamId};
use dealflow_operations::{async_trait, operation, Execute};
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

/// Soft-delete a card. Its rank is released for the rest of the column.
#[operation(verb = "delete", noun = "card", description = "Delete a card from its board")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCard {
    pub team: TeamId,
    pub id: CardId,
}

impl DeleteCard {
    pub fn new(team: impl Into<TeamId>, id: impl Into<CardId>) -> Self {
        Self {
            team: team.into(),
            id: id.into(),
        }
    }
}

#[async_trait]
impl Execute<BoardContext, DealflowError> for DeleteCard {
    async fn execute(&self, ctx: &BoardContext) -> Result<Value> {
        let card = {
            let mut conn = ctx.conn();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let card = store::find_card(&tx, &self.team, &self.id)?;
            store::soft_delete_card(&tx, &card, &time::now())?;
            tx.commit()?;
            card
        };

        info!(card = %card.id, kind = %card.kind, "deleted card");
        ctx.publish(BoardEvent::CardDeleted {
            card_id: card.id.clone(),
            kind: card.kind,
        });
        Ok(json!({ "deleted": true, "id": card.id, "kind": card.kind }))
    }
}
