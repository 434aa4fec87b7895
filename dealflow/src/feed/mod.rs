//! Unified activity feed
//!
//! Every entity that shows up in the feed is a [`FeedSource`]: it renders
//! one `SELECT` projecting the common row shape with the team, filter and
//! cursor predicates already applied. [`FeedQuery`] glues the selected
//! sources together with `UNION ALL`, sorts and paginates.

mod fetch;
mod query;
mod source;

pub use fetch::FetchFeed;
pub use query::FeedQuery;
pub use source::{FeedScope, FeedSource, TableSource};
