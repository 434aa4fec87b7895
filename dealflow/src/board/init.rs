//! InitBoard command

use crate::context::BoardContext;
use crate::error::{DealflowError, Result};
use crate::schema;
use dealflow_operations::{async_trait, operation, Execute};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Create or upgrade the database schema. Safe to run repeatedly.
#[operation(verb = "init", noun = "board", description = "Initialize the board database")]
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct InitBoard {}

impl InitBoard {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl Execute<BoardContext, DealflowError> for InitBoard {
    async fn execute(&self, ctx: &BoardContext) -> Result<Value> {
        let applied = ctx.migrate()?;
        Ok(json!({
            "applied": applied,
            "version": schema::latest_version(),
            "path": ctx.path().map(|p| p.display().to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DealflowConfig;

    #[tokio::test]
    async fn test_init_twice() {
        let ctx = BoardContext::open_in_memory(DealflowConfig::default()).unwrap();

        let first = InitBoard::new().execute(&ctx).await.unwrap();
        assert_eq!(first["applied"], schema::latest_version());
        assert!(first["path"].is_null());

        let second = InitBoard::new().execute(&ctx).await.unwrap();
        assert_eq!(second["applied"], 0);
        ctx.ensure_initialized().unwrap();
    }
}
