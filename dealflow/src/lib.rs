//! Ranked kanban boards and a unified activity feed for a multi-tenant CRM,
//! stored in SQLite.
//!
//! ## Overview
//!
//! - **Boards**: leads are grouped by status, opportunities by pipeline stage.
//!   Cards within a column are ordered by a [`Rank`], a short base-62 string
//!   that can always be split again until it hits the configured length,
//!   after which the column is re-ranked.
//! - **Moves**: [`card::MoveCard`] changes column and rank in one transaction
//!   together with a `card_moves` history row, retries on rank conflicts and
//!   publishes a [`BoardEvent`] after commit.
//! - **Feed**: [`feed::FetchFeed`] merges tasks, notes, opportunities and cases
//!   into one newest-first stream with filters pushed into every sub-query.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use dealflow::{card::{AddCard, MoveCard}, board::InitBoard, BoardContext, DealflowConfig, Execute};
//! use dealflow::types::{CardKind, LeadStatus};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = BoardContext::open("crm.db", DealflowConfig::default())?;
//! InitBoard::new().execute(&ctx).await?;
//!
//! let card = AddCard::new("acme", CardKind::Lead, "Globex").execute(&ctx).await?;
//! let id = card["id"].as_str().unwrap_or_default();
//! MoveCard::to_column("acme", id, LeadStatus::Qualified.as_str())
//!     .execute(&ctx)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod context;
mod error;
mod events;
mod processor;
pub mod schema;
mod store;
pub mod types;

// Command modules
pub mod board;
pub mod card;
pub mod column;
pub mod feed;
pub mod record;

// Re-export Execute trait and types from operations crate
pub use dealflow_operations::{async_trait, Execute, LogEntry, Operation, OperationProcessor};

pub use config::{DealflowConfig, FeedConfig};
pub use context::{BoardContext, FailPoint};
pub use error::{DealflowError, Result};
pub use events::{BoardEvent, EventBus};
pub use processor::BoardOperationProcessor;

// Re-export commonly used types
pub use types::{
    Card, CardId, CardKind, Column, ColumnId, FeedCursor, FeedFilter, FeedKind, FeedRow,
    LeadStatus, Page, Pagination, Rank, RankError, Record, RecordKind, TeamId, UserId,
};
