//! GetBoard command

use crate::context::BoardContext;
use crate::error::{DealflowError, Result};
use crate::store;
use crate::types::{Card, CardKind, Column, TeamId};
use dealflow_operations::{async_trait, operation, Execute};
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read a board: its columns in display order, each with its cards in rank order
#[operation(verb = "get", noun = "board", description = "Read a board with its columns and cards", read_only = true)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBoard {
    pub team: TeamId,
    pub kind: CardKind,
}

#[derive(Debug, Serialize)]
struct BoardColumn {
    #[serde(flatten)]
    column: Column,
    cards: Vec<Card>,
}

impl GetBoard {
    pub fn new(team: impl Into<TeamId>, kind: CardKind) -> Self {
        Self {
            team: team.into(),
            kind,
        }
    }
}

#[async_trait]
impl Execute<BoardContext, DealflowError> for GetBoard {
    async fn execute(&self, ctx: &BoardContext) -> Result<Value> {
        // All columns are read from one snapshot so a concurrent move is
        // seen either entirely or not at all
        let mut conn = ctx.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let columns = store::list_columns(&tx, &self.team, self.kind)?
            .into_iter()
            .map(|column| {
                let cards = store::column_cards(&tx, &self.team, self.kind, &column.id, None)?;
                Ok(BoardColumn { column, cards })
            })
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;

        Ok(serde_json::json!({
            "team": self.team,
            "kind": self.kind,
            "columns": columns,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::AddCard;
    use crate::config::DealflowConfig;
    use crate::types::LeadStatus;

    #[tokio::test]
    async fn test_lead_board_layout() {
        let ctx = BoardContext::open_in_memory(DealflowConfig::default()).unwrap();
        ctx.migrate().unwrap();

        for (title, status) in [
            ("a", LeadStatus::New),
            ("b", LeadStatus::New),
            ("c", LeadStatus::Qualified),
        ] {
            AddCard::lead("acme", title, status)
                .execute(&ctx)
                .await
                .unwrap();
        }
        AddCard::lead("globex", "other team", LeadStatus::New)
            .execute(&ctx)
            .await
            .unwrap();

        let board = GetBoard::new("acme", CardKind::Lead)
            .execute(&ctx)
            .await
            .unwrap();
        let columns = board["columns"].as_array().unwrap();
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[0]["id"], "new");
        assert_eq!(columns[0]["label"], "New");

        let titles: Vec<&str> = columns[0]["cards"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["a", "b"]);
        assert_eq!(columns[2]["cards"].as_array().unwrap().len(), 1);
    }
}
