//! Board operation processor
//!
//! Runs operations and records every state-changing one in the
//! `operation_log` table, with the actor, input, output and duration.

use crate::context::BoardContext;
use crate::error::{DealflowError, Result};
use async_trait::async_trait;
use dealflow_operations::{Execute, LogEntry, Operation, OperationProcessor};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

/// Processor that writes an operation log entry for each non-read-only
/// operation, successful or not
#[derive(Debug, Clone, Default)]
pub struct BoardOperationProcessor {
    actor: Option<String>,
}

impl BoardOperationProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute logged operations to `actor`
    pub fn with_actor(actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
        }
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }
}

#[async_trait]
impl OperationProcessor<BoardContext, DealflowError> for BoardOperationProcessor {
    async fn process<O>(&self, op: &O, ctx: &BoardContext) -> Result<Value>
    where
        O: Operation + Execute<BoardContext, DealflowError> + Serialize + Send + Sync,
    {
        let start = Instant::now();
        let result = op.execute(ctx).await;
        let took = start.elapsed();

        debug!(op = %op.op_string(), ?took, ok = result.is_ok(), "processed operation");
        if op.is_read_only() {
            return result;
        }

        let input = serde_json::to_value(op).unwrap_or(Value::Null);
        let entry = match &result {
            Ok(output) => LogEntry::success(op.op_string(), input, output.clone(), took),
            Err(e) => LogEntry::failure(op.op_string(), input, e, took),
        };
        let entry = match &self.actor {
            Some(actor) => entry.by(actor.as_str()),
            None => entry,
        };

        // The operation already committed; a log failure must not turn it
        // into an error for the caller
        if let Err(e) = ctx.append_operation_log(&entry) {
            warn!(op = %entry.op, error = %e, "failed to write operation log");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{AddCard, GetCard, MoveCard};
    use crate::config::DealflowConfig;
    use crate::types::CardKind;

    #[tokio::test]
    async fn test_logs_mutations_with_actor() {
        let ctx = BoardContext::open_in_memory(DealflowConfig::default()).unwrap();
        ctx.migrate().unwrap();
        let processor = BoardOperationProcessor::with_actor("alice");

        let added = processor
            .process(&AddCard::new("acme", CardKind::Lead, "Globex"), &ctx)
            .await
            .unwrap();
        let id = added["id"].as_str().unwrap();

        processor
            .process(&GetCard::new("acme", id), &ctx)
            .await
            .unwrap();
        processor
            .process(&MoveCard::to_column("acme", id, "nowhere"), &ctx)
            .await
            .unwrap_err();

        let entries = ctx.read_operation_log(None).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].op, "move card");
        assert!(entries[0].is_failure());
        assert_eq!(entries[1].op, "add card");
        assert_eq!(entries[1].input["title"], "Globex");
        assert_eq!(entries[1].output["id"], id);
        assert!(entries.iter().all(|e| e.actor.as_deref() == Some("alice")));
    }
}
