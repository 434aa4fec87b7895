//! GetCard command

use crate::context::BoardContext;
use crate::error::{DealflowError, Result};
use crate::store;
use crate::types::{CardId, TeamId};
use dealflow_operations::{async_trait, operation, Execute};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Get a card by ID
#[operation(verb = "get", noun = "card", description = "Get a card by ID", read_only = true)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetCard {
    pub team: TeamId,
    pub id: CardId,
}

impl GetCard {
    pub fn new(team: impl Into<TeamId>, id: impl Into<CardId>) -> Self {
        Self {
            team: team.into(),
            id: id.into(),
        }
    }
}

#[async_trait]
impl Execute<BoardContext, DealflowError> for GetCard {
    async fn execute(&self, ctx: &BoardContext) -> Result<Value> {
        let card = store::find_card(&ctx.conn(), &self.team, &self.id)?;
        Ok(serde_json::to_value(&card)?)
    }
}
