//! Column commands. Lead columns are fixed; opportunity columns are the
//! team's `stage` options.

mod add;
mod list;

pub use add::AddStage;
pub use list::ListColumns;
