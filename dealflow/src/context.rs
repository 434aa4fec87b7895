//! Storage handle shared by all board operations
//!
//! The context owns the SQLite connection, the configuration and the event
//! bus. It has no business logic: operations do all the work, using the
//! row-level primitives in [`crate::store`] inside their own transactions.

use crate::config::DealflowConfig;
use crate::error::{DealflowError, Result};
use crate::events::{BoardEvent, EventBus};
use crate::schema;
use crate::store;
use dealflow_operations::LogEntry;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// Points inside a card move where a test can inject a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// The card row has its new column and rank, nothing else is written yet
    AfterCardUpdate,
    /// Everything is written, commit has not happened
    BeforeCommit,
    /// Just before commit, failing as if another writer took the rank
    RankConflict,
}

/// Connection, config and event bus handed to each operation
pub struct BoardContext {
    conn: Mutex<Connection>,
    /// Database file, `None` for in-memory databases
    path: Option<PathBuf>,
    config: DealflowConfig,
    events: EventBus,
    #[cfg(any(test, feature = "test-support"))]
    fail_point: Mutex<Option<(FailPoint, u32)>>,
}

impl BoardContext {
    /// Open (or create) the database file at `path`.
    ///
    /// File databases use WAL so readers never block the single writer, and
    /// wait up to `busy_timeout_ms` for other writers.
    pub fn open(path: impl AsRef<Path>, config: DealflowConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        debug!(path = %path.display(), "opened database");

        Self::with_connection(conn, Some(path), config)
    }

    /// Open the database named by `config.database_path`
    pub fn from_config(config: DealflowConfig) -> Result<Self> {
        let path = config.database_path.clone();
        Self::open(path, config)
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory(config: DealflowConfig) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None, config)
    }

    fn with_connection(
        conn: Connection,
        path: Option<PathBuf>,
        config: DealflowConfig,
    ) -> Result<Self> {
        config.validate()?;
        conn.pragma_update(None, "foreign_keys", true)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
            events: EventBus::new(config.event_capacity),
            config,
            #[cfg(any(test, feature = "test-support"))]
            fail_point: Mutex::new(None),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &DealflowConfig {
        &self.config
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Lock the connection. Never hold the guard across an `.await`.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: BoardEvent) {
        self.events.publish(event);
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Apply pending migrations; returns how many ran
    pub fn migrate(&self) -> Result<usize> {
        schema::migrate(&mut self.conn())
    }

    pub fn is_initialized(&self) -> Result<bool> {
        Ok(schema::current_version(&self.conn())? >= schema::latest_version())
    }

    /// Fail with `NotInitialized` unless all migrations are applied
    pub fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized()? {
            Ok(())
        } else {
            Err(DealflowError::NotInitialized {
                path: self.path.clone().unwrap_or_else(|| PathBuf::from(":memory:")),
            })
        }
    }

    // =========================================================================
    // Operation log
    // =========================================================================

    pub fn append_operation_log(&self, entry: &LogEntry) -> Result<()> {
        store::insert_log_entry(&self.conn(), entry)
    }

    /// Newest first
    pub fn read_operation_log(&self, limit: Option<usize>) -> Result<Vec<LogEntry>> {
        store::read_log_entries(&self.conn(), limit)
    }

    // =========================================================================
    // Fail points
    // =========================================================================

    /// Arm a one-shot failure at `point` for the next card write
    #[cfg(any(test, feature = "test-support"))]
    pub fn set_fail_point(&self, point: Option<FailPoint>) {
        *self.fail_point.lock().unwrap_or_else(PoisonError::into_inner) =
            point.map(|p| (p, 1));
    }

    /// Fail the next `times` card writes that reach `point`
    #[cfg(any(test, feature = "test-support"))]
    pub fn arm_fail_point(&self, point: FailPoint, times: u32) {
        *self.fail_point.lock().unwrap_or_else(PoisonError::into_inner) =
            (times > 0).then_some((point, times));
    }

    pub(crate) fn check_fail_point(&self, point: FailPoint) -> Result<()> {
        #[cfg(any(test, feature = "test-support"))]
        {
            let mut armed = self.fail_point.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((armed_point, remaining)) = armed.as_mut() {
                if *armed_point == point {
                    *remaining -= 1;
                    if *remaining == 0 {
                        *armed = None;
                    }
                    return Err(match point {
                        FailPoint::RankConflict => DealflowError::RankConflict {
                            message: "injected".to_string(),
                        },
                        _ => DealflowError::FailPoint {
                            point: format!("{point:?}"),
                        },
                    });
                }
            }
        }
        #[cfg(not(any(test, feature = "test-support")))]
        let _ = point;
        Ok(())
    }
}
