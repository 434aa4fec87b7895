//! RebalanceColumn command

use crate::context::BoardContext;
use crate::error::{DealflowError, Result};
use crate::events::BoardEvent;
use crate::store;
use crate::types::{CardId, CardKind, ColumnId, TeamId};
use dealflow_operations::{async_trait, operation, Execute};
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

/// Give every card of a column a fresh, short rank while keeping the order
#[operation(verb = "rebalance", noun = "column", description = "Re-rank the cards of a column")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceColumn {
    pub team: TeamId,
    pub kind: CardKind,
    pub column: ColumnId,
}

impl RebalanceColumn {
    pub fn new(team: impl Into<TeamId>, kind: CardKind, column: impl Into<ColumnId>) -> Self {
        Self {
            team: team.into(),
            kind,
            column: column.into(),
        }
    }
}

#[async_trait]
impl Execute<BoardContext, DealflowError> for RebalanceColumn {
    async fn execute(&self, ctx: &BoardContext) -> Result<Value> {
        let (ids, ranks) = {
            let mut conn = ctx.conn();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !store::column_exists(&tx, &self.team, self.kind, &self.column)? {
                return Err(DealflowError::InvalidColumn {
                    kind: self.kind.to_string(),
                    column: self.column.to_string(),
                });
            }

            let ids: Vec<CardId> =
                store::column_cards(&tx, &self.team, self.kind, &self.column, None)?
                    .into_iter()
                    .map(|c| c.id)
                    .collect();
            let ranks = store::rewrite_ranks(&tx, &self.team, self.kind, &self.column, &ids)?;
            tx.commit()?;
            (ids, ranks)
        };

        info!(kind = %self.kind, column = %self.column, count = ids.len(), "rebalanced column");
        ctx.publish(BoardEvent::ColumnRebalanced {
            team_id: self.team.clone(),
            kind: self.kind,
            column: self.column.clone(),
            count: ids.len(),
        });

        let cards: Vec<Value> = ids
            .iter()
            .zip(&ranks)
            .map(|(id, rank)| json!({ "id": id, "position": rank }))
            .collect();
        Ok(json!({ "column": self.column, "count": ids.len(), "cards": cards }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{AddCard, MoveCard};
    use crate::config::DealflowConfig;
    use crate::types::LeadStatus;

    #[tokio::test]
    async fn test_rebalance_keeps_order_and_shortens_ranks() {
        let ctx = BoardContext::open_in_memory(DealflowConfig::default()).unwrap();
        ctx.migrate().unwrap();

        let top = AddCard::lead("acme", "top", LeadStatus::New)
            .execute(&ctx)
            .await
            .unwrap();
        let top = top["id"].as_str().unwrap().to_string();
        for i in 0..10 {
            let added = AddCard::lead("acme", format!("c{i}"), LeadStatus::Contacted)
                .execute(&ctx)
                .await
                .unwrap();
            MoveCard::to_column("acme", added["id"].as_str().unwrap(), "new")
                .after(top.as_str())
                .execute(&ctx)
                .await
                .unwrap();
        }

        let result = RebalanceColumn::new("acme", CardKind::Lead, "new")
            .execute(&ctx)
            .await
            .unwrap();
        assert_eq!(result["count"], 11);

        let cards = result["cards"].as_array().unwrap();
        assert_eq!(cards[0]["id"], top.as_str());
        let ranks: Vec<&str> = cards.iter().map(|c| c["position"].as_str().unwrap()).collect();
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
        assert!(ranks.iter().all(|r| r.len() == 1));
    }

    #[tokio::test]
    async fn test_rebalance_unknown_column() {
        let ctx = BoardContext::open_in_memory(DealflowConfig::default()).unwrap();
        ctx.migrate().unwrap();
        let err = RebalanceColumn::new("acme", CardKind::Opportunity, "nope")
            .execute(&ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, DealflowError::InvalidColumn { .. }));
    }
}
