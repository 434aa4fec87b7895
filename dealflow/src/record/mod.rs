//! Activity record commands (tasks, notes, cases)

mod add;

pub use add::AddRecord;
