//! CardHistory command

use crate::context::BoardContext;
use crate::error::{DealflowError, Result};
use crate::store;
use crate::types::{CardId, TeamId};
use dealflow_operations::{async_trait, operation, Execute};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// List the committed moves of a card, oldest first
#[operation(verb = "history", noun = "card", description = "List the moves of a card", read_only = true)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardHistory {
    pub team: TeamId,
    pub id: CardId,
}

impl CardHistory {
    pub fn new(team: impl Into<TeamId>, id: impl Into<CardId>) -> Self {
        Self {
            team: team.into(),
            id: id.into(),
        }
    }
}

#[async_trait]
impl Execute<BoardContext, DealflowError> for CardHistory {
    async fn execute(&self, ctx: &BoardContext) -> Result<Value> {
        let conn = ctx.conn();
        let card = store::find_card(&conn, &self.team, &self.id)?;
        let moves = store::list_moves(&conn, &self.team, &card.id)?;
        Ok(json!({ "card": card, "count": moves.len(), "moves": moves }))
    }
}
