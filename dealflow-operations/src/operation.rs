//! Core operation traits

use async_trait::async_trait;
use serde_json::Value;

/// Metadata every operation carries. Usually generated by `#[operation]`.
pub trait Operation {
    /// The verb, e.g. "move"
    fn verb(&self) -> &'static str;

    /// The noun, e.g. "card"
    fn noun(&self) -> &'static str;

    /// Human readable description
    fn description(&self) -> &'static str;

    /// Read-only operations are never written to the operation log
    fn is_read_only(&self) -> bool {
        false
    }

    /// Canonical op string, e.g. "move card"
    fn op_string(&self) -> String {
        format!("{} {}", self.verb(), self.noun())
    }
}

/// Execute an operation against a context `C`, failing with `E`
#[async_trait]
pub trait Execute<C, E>: Send + Sync
where
    C: Send + Sync,
{
    async fn execute(&self, ctx: &C) -> Result<Value, E>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation;
    use serde::{Deserialize, Serialize};

    #[operation(verb = "ping", noun = "board", description = "Ping the board")]
    #[derive(Debug, Serialize, Deserialize)]
    struct PingBoard {
        count: u32,
    }

    #[operation(
        verb = "peek",
        noun = "board",
        description = "Look without touching",
        read_only = true
    )]
    #[derive(Debug, Serialize, Deserialize)]
    struct PeekBoard;

    #[async_trait]
    impl Execute<(), String> for PingBoard {
        async fn execute(&self, _ctx: &()) -> Result<Value, String> {
            Ok(serde_json::json!({ "pong": self.count }))
        }
    }

    #[test]
    fn test_operation_metadata() {
        let op = PingBoard { count: 2 };
        assert_eq!(op.verb(), "ping");
        assert_eq!(op.noun(), "board");
        assert_eq!(op.op_string(), "ping board");
        assert!(!op.is_read_only());
        assert!(PeekBoard.is_read_only());
        assert_eq!(PeekBoard::OP, "peek board");
    }

    #[tokio::test]
    async fn test_execute() {
        let value = PingBoard { count: 3 }.execute(&()).await.unwrap();
        assert_eq!(value["pong"], 3);
    }
}
