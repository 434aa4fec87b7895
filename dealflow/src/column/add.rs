//! AddStage command

use crate::context::BoardContext;
use crate::error::{DealflowError, Result};
use crate::store;
use crate::types::{time, CardKind, Column, ColumnId, TeamId};
use dealflow_operations::{async_trait, operation, Execute};
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Append a stage (opportunity column) to a team's board
#[operation(verb = "add", noun = "stage", description = "Add an opportunity stage")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddStage {
    pub team: TeamId,
    /// Display label
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl AddStage {
    pub fn new(team: impl Into<TeamId>, label: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            label: label.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

#[async_trait]
impl Execute<BoardContext, DealflowError> for AddStage {
    async fn execute(&self, ctx: &BoardContext) -> Result<Value> {
        let label = self.label.trim();
        if label.is_empty() {
            return Err(DealflowError::invalid_value("label", "must not be empty"));
        }

        let stage = {
            let mut conn = ctx.conn();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let stage = Column {
                id: ColumnId::new(),
                kind: CardKind::Opportunity,
                label: label.to_string(),
                color: self.color.clone(),
                order: store::next_stage_order(&tx, &self.team)?,
            };
            store::insert_stage(&tx, &self.team, &stage, &time::now())?;
            tx.commit()?;
            stage
        };

        info!(stage = %stage.id, label = %stage.label, order = stage.order, "added stage");
        Ok(serde_json::to_value(&stage)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ListColumns;
    use crate::config::DealflowConfig;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_stages_get_distinct_orders() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("crm.db");
        let setup = BoardContext::open(&path, DealflowConfig::default()).unwrap();
        setup.migrate().unwrap();

        let mut handles = Vec::new();
        for i in 0..6 {
            let ctx = Arc::new(BoardContext::open(&path, DealflowConfig::default()).unwrap());
            handles.push(tokio::spawn(async move {
                AddStage::new("acme", format!("Stage {i}"))
                    .execute(ctx.as_ref())
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let listed = ListColumns::new("acme", CardKind::Opportunity)
            .execute(&setup)
            .await
            .unwrap();
        let orders: BTreeSet<i64> = listed["columns"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["order"].as_i64().unwrap())
            .collect();
        assert_eq!(orders.len(), 6);
    }
}
