//! Card and record types: Lead/Opportunity cards, tasks, notes, cases

use super::ids::{CardId, ColumnId, MoveId, RecordId, TeamId, UserId};
use super::rank::Rank;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which board a card lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    /// Columns are [`LeadStatus`] values
    Lead,
    /// Columns are `stage` custom-field options of the team
    Opportunity,
}

impl CardKind {
    pub const ALL: [CardKind; 2] = [CardKind::Lead, CardKind::Opportunity];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Lead => "lead",
            CardKind::Opportunity => "opportunity",
        }
    }

    pub(crate) fn table(&self) -> &'static str {
        match self {
            CardKind::Lead => "leads",
            CardKind::Opportunity => "opportunities",
        }
    }

    /// The discriminator column of the table
    pub(crate) fn column_field(&self) -> &'static str {
        match self {
            CardKind::Lead => "status",
            CardKind::Opportunity => "stage_id",
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lead" => Ok(CardKind::Lead),
            "opportunity" => Ok(CardKind::Opportunity),
            other => Err(format!("unknown card kind '{other}'")),
        }
    }
}

/// Lead pipeline status. Doubles as the lead board's column set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Unqualified,
    Converted,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Unqualified,
        LeadStatus::Converted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Unqualified => "unqualified",
            LeadStatus::Converted => "converted",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Qualified => "Qualified",
            LeadStatus::Unqualified => "Unqualified",
            LeadStatus::Converted => "Converted",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            LeadStatus::New => "gray",
            LeadStatus::Contacted => "info",
            LeadStatus::Qualified => "success",
            LeadStatus::Unqualified => "danger",
            LeadStatus::Converted => "primary",
        }
    }

    pub fn column_id(&self) -> ColumnId {
        ColumnId::from_string(self.as_str())
    }

    pub fn from_column(column: &ColumnId) -> Option<LeadStatus> {
        Self::ALL.into_iter().find(|s| s.as_str() == column.as_str())
    }
}

/// An orderable record: a lead or an opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub team_id: TeamId,
    pub kind: CardKind,
    pub title: String,
    /// Status slug (leads) or stage option id (opportunities)
    pub column: ColumnId,
    pub position: Rank,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A committed move, as recorded in `card_moves`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardMove {
    pub id: MoveId,
    pub team_id: TeamId,
    pub card_id: CardId,
    pub kind: CardKind,
    pub from_column: ColumnId,
    pub to_column: ColumnId,
    pub position: Rank,
    pub moved_at: DateTime<Utc>,
}

/// Activity records that only show up in the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Task,
    Note,
    Case,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Task => "task",
            RecordKind::Note => "note",
            RecordKind::Case => "case",
        }
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(RecordKind::Task),
            "note" => Ok(RecordKind::Note),
            "case" => Ok(RecordKind::Case),
            other => Err(format!("unknown record kind '{other}'")),
        }
    }
}

/// A task, note or case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub team_id: TeamId,
    pub kind: RecordKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}
