use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use dealflow::{CardKind, FeedCursor, RecordKind};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

// The library's kinds don't derive ValueEnum
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Default)]
pub enum CardKindArg {
    #[default]
    Lead,
    Opportunity,
}

impl From<CardKindArg> for CardKind {
    fn from(arg: CardKindArg) -> Self {
        match arg {
            CardKindArg::Lead => CardKind::Lead,
            CardKindArg::Opportunity => CardKind::Opportunity,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum RecordKindArg {
    Task,
    Note,
    Case,
}

impl From<RecordKindArg> for RecordKind {
    fn from(arg: RecordKindArg) -> Self {
        match arg {
            RecordKindArg::Task => RecordKind::Task,
            RecordKindArg::Note => RecordKind::Note,
            RecordKindArg::Case => RecordKind::Case,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dealflow")]
#[command(version)]
#[command(about = "Ranked CRM boards and a unified activity feed")]
#[command(long_about = "
dealflow keeps lead and opportunity boards in a SQLite database. Cards are
ordered within their column by a rank, moves are atomic and recorded, and
tasks, notes, cases and opportunities can be read as one activity feed.

Configuration is read from dealflow.toml / dealflow.yaml / dealflow.json in
the working directory and DEALFLOW_* environment variables.

Example usage:
  dealflow init
  dealflow --team acme card add \"Globex\"
  dealflow --team acme card move <ID> qualified --after <OTHER_ID>
  dealflow --team acme feed --type task --type note --page-size 20
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log at trace level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// How results are printed
    #[arg(long, value_enum, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Database file, overriding the configured `database_path`
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Team (tenant) the command acts on
    #[arg(long, global = true, default_value = "default")]
    pub team: String,

    /// Recorded as the actor of logged operations
    #[arg(long, global = true)]
    pub actor: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or upgrade the database schema
    Init,
    /// Manage opportunity stages
    Stage {
        #[command(subcommand)]
        action: StageCommands,
    },
    /// Manage cards
    Card {
        #[command(subcommand)]
        action: CardCommands,
    },
    /// Show a board with its columns and cards
    Board {
        #[arg(long, value_enum, default_value = "lead")]
        kind: CardKindArg,
    },
    /// Manage tasks, notes and cases
    Record {
        #[command(subcommand)]
        action: RecordCommands,
    },
    /// Show the activity feed, newest first
    Feed {
        /// Only these kinds (task, note, opportunity, case); repeatable
        #[arg(long = "type", value_name = "KIND")]
        kinds: Vec<String>,
        #[arg(long)]
        owner: Option<String>,
        /// Inclusive lower bound (RFC 3339)
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// Exclusive upper bound (RFC 3339)
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        page_size: Option<usize>,
        /// Continue after a `next_cursor` from a previous page (JSON)
        #[arg(long, value_parser = parse_cursor, conflicts_with = "page")]
        after: Option<FeedCursor>,
    },
    /// Show the operation log, newest first
    Log {
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum StageCommands {
    /// Append a stage to the opportunity board
    Add {
        label: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// List the columns of a board
    List {
        #[arg(long, value_enum, default_value = "opportunity")]
        kind: CardKindArg,
    },
}

#[derive(Subcommand, Debug)]
pub enum CardCommands {
    /// Add a card at the end of a column
    Add {
        title: String,
        #[arg(long, value_enum, default_value = "lead")]
        kind: CardKindArg,
        /// Defaults to the first column of the board
        #[arg(long)]
        column: Option<String>,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show a card
    Get { id: String },
    /// Move a card to a column, optionally between two cards
    Move {
        id: String,
        column: String,
        /// Card to land directly below
        #[arg(long)]
        after: Option<String>,
        /// Card to land directly above
        #[arg(long)]
        before: Option<String>,
    },
    /// Delete a card
    Delete { id: String },
    /// Give the cards of a column fresh ranks
    Rebalance {
        column: String,
        #[arg(long, value_enum, default_value = "lead")]
        kind: CardKindArg,
    },
    /// Show the moves of a card
    History { id: String },
}

#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// Add a task, note or case
    Add {
        #[arg(value_enum)]
        kind: RecordKindArg,
        title: String,
        #[arg(long)]
        owner: Option<String>,
        /// When it happened (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

fn parse_cursor(s: &str) -> Result<FeedCursor, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid cursor: {e}"))
}

impl Cli {
    #[allow(dead_code)]
    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(args)
    }
}
