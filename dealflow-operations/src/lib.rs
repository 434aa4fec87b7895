//! Operation plumbing shared by the dealflow crates.
//!
//! A board operation is a plain struct whose fields are its parameters.
//! `#[operation]` attaches the verb/noun metadata, [`Execute`] runs it against
//! a context, and an [`OperationProcessor`] decides what gets recorded as a
//! [`LogEntry`].
//!
//! ```ignore
//! #[operation(verb = "archive", noun = "card", description = "Archive a card")]
//! #[derive(Debug, Serialize, Deserialize)]
//! pub struct ArchiveCard {
//!     pub id: CardId,
//! }
//!
//! #[async_trait]
//! impl Execute<BoardContext, DealflowError> for ArchiveCard {
//!     async fn execute(&self, ctx: &BoardContext) -> Result<Value, DealflowError> {
//!         todo!()
//!     }
//! }
//!
//! assert_eq!(ArchiveCard::OP, "archive card");
//! ```

// `#[operation]` expands to `dealflow_operations::...` paths, also in this crate's tests
extern crate self as dealflow_operations;

mod log;
mod operation;
mod processor;

pub use async_trait::async_trait;
pub use dealflow_operations_macros::operation;
pub use log::LogEntry;
pub use operation::{Execute, Operation};
pub use processor::OperationProcessor;
pub use serde_json::Value;
