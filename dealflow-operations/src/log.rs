//! Audit records of executed operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Display;
use std::time::Duration;
use ulid::Ulid;

/// One executed operation: what ran, with which parameters, what came out
/// and who asked for it. Failures carry `{"error": "..."}` as output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Ulid,
    pub timestamp: DateTime<Utc>,
    /// Canonical op string, e.g. "move card"
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub input: Value,
    pub output: Value,
    pub duration_ms: u64,
}

impl LogEntry {
    fn record(op: impl Into<String>, input: Value, output: Value, took: Duration) -> Self {
        Self {
            id: Ulid::new(),
            timestamp: Utc::now(),
            op: op.into(),
            actor: None,
            input,
            output,
            duration_ms: u64::try_from(took.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn success(op: impl Into<String>, input: Value, output: Value, took: Duration) -> Self {
        Self::record(op, input, output, took)
    }

    pub fn failure(
        op: impl Into<String>,
        input: Value,
        error: &dyn Display,
        took: Duration,
    ) -> Self {
        Self::record(op, input, json!({ "error": error.to_string() }), took)
    }

    /// Attribute the entry to a user or agent
    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Error message of a failed operation
    pub fn error(&self) -> Option<&str> {
        self.output.get("error").and_then(Value::as_str)
    }

    pub fn is_failure(&self) -> bool {
        self.error().is_some()
    }
}
