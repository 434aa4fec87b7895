//! Operation processor trait

use crate::{Execute, Operation};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Runs operations and takes care of cross-cutting concerns (audit logging,
/// actor attribution, timing). Implementations decide where log entries go.
#[async_trait]
pub trait OperationProcessor<C, E>: Send + Sync
where
    C: Send + Sync,
{
    /// Execute `op` against `ctx`, recording it unless it is read-only
    async fn process<O>(&self, op: &O, ctx: &C) -> Result<Value, E>
    where
        O: Operation + Execute<C, E> + Serialize + Send + Sync;
}
