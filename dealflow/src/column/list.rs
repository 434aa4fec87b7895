//! ListColumns command

use crate::context::BoardContext;
use crate::error::{DealflowError, Result};
use crate::store;
use crate::types::{CardKind, TeamId};
use dealflow_operations::{async_trait, operation, Execute};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// List the columns of a board in display order
#[operation(verb = "list", noun = "columns", description = "List the columns of a board", read_only = true)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListColumns {
    pub team: TeamId,
    pub kind: CardKind,
}

impl ListColumns {
    pub fn new(team: impl Into<TeamId>, kind: CardKind) -> Self {
        Self {
            team: team.into(),
            kind,
        }
    }
}

#[async_trait]
impl Execute<BoardContext, DealflowError> for ListColumns {
    async fn execute(&self, ctx: &BoardContext) -> Result<Value> {
        let columns = store::list_columns(&ctx.conn(), &self.team, self.kind)?;
        Ok(json!({ "columns": columns, "count": columns.len() }))
    }
}
