//! Retry loop for card writes that can lose a rank race

use crate::context::BoardContext;
use crate::error::Result;
use tracing::{debug, warn};

/// Run `attempt` until it succeeds, fails with a non-retryable error, or has
/// been retried `move_retries` times. Each attempt is a whole transaction.
pub(crate) async fn retry_write<T>(
    ctx: &BoardContext,
    op: &'static str,
    mut attempt: impl FnMut() -> Result<T>,
) -> Result<T> {
    let retries = ctx.config().move_retries;
    let mut retried = 0;

    loop {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && retried < retries => {
                retried += 1;
                warn!(op, attempt = retried, error = %e, "write conflicted, retrying");
                tokio::task::yield_now().await;
            }
            Err(e) => {
                debug!(op, retried, error = %e, "write failed");
                return Err(e);
            }
        }
    }
}
