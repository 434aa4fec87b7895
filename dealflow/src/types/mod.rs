//! Core types for the dealflow engine

mod card;
mod column;
mod feed;
mod ids;
mod rank;
pub(crate) mod time;

// Re-export all types
pub use card::{Card, CardKind, CardMove, LeadStatus, Record, RecordKind};
pub use column::Column;
pub use feed::{FeedCursor, FeedFilter, FeedKind, FeedRow, Page, Pagination};
pub use ids::{CardId, ColumnId, MoveId, RecordId, TeamId, UserId};
pub use rank::{Rank, RankError, DEFAULT_MAX_RANK_LEN};
