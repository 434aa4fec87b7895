//! Board columns

use super::card::{CardKind, LeadStatus};
use super::ids::ColumnId;
use serde::{Deserialize, Serialize};

/// A column of a board: a lead status or an opportunity stage option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub kind: CardKind,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub order: usize,
}

impl Column {
    /// The fixed lead columns, one per status
    pub fn lead_columns() -> Vec<Column> {
        LeadStatus::ALL
            .iter()
            .enumerate()
            .map(|(order, status)| Column {
                id: status.column_id(),
                kind: CardKind::Lead,
                label: status.label().to_string(),
                color: Some(status.color().to_string()),
                order,
            })
            .collect()
    }
}
