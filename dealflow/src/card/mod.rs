//! Card commands: leads and opportunities on their boards

mod add;
mod delete;
mod get;
mod history;
mod mv;
mod rebalance;
pub(crate) mod resolve;
mod retry;

pub use add::AddCard;
pub use delete::DeleteCard;
pub use get::GetCard;
pub use history::CardHistory;
pub use mv::{MoveCard, MoveOutcome};
pub use rebalance::RebalanceColumn;
