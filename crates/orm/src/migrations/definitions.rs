//! Migration Definitions - Core types and structures for migrations
//!
//! Defines the change-set, the ledger row, the engine configuration and the
//! reports returned by runs and rollbacks.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::PathBuf;
use strata_core::MigrationSettings;

/// Marker opening the apply part of a change-set file
pub const UP_MARKER: &str = "-- +++ UP Migration";

/// Marker opening the revert part of a change-set file
pub const DOWN_MARKER: &str = "-- --- DOWN Migration";

/// Extension of change-set files
pub const CHANGE_SET_EXTENSION: &str = "sql";

/// A parsed change-set file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// File name without extension; also the key recorded in the ledger
    pub name: String,
    /// Statements executed, in order, to apply the change
    pub apply_statements: Vec<String>,
    /// Statements executed, in order, to revert the change
    pub revert_statements: Vec<String>,
}

/// One row of the ledger table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub filename: String,
    pub batch: i64,
    pub migrated_at: Option<NaiveDateTime>,
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory where change-set files are stored
    pub migrations_dir: PathBuf,
    /// Table name of the ledger on every connection
    pub migrations_table: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        MigrationSettings::default().into()
    }
}

impl From<MigrationSettings> for MigrationConfig {
    fn from(settings: MigrationSettings) -> Self {
        Self {
            migrations_dir: settings.directory,
            migrations_table: settings.table,
        }
    }
}

/// Result of applying change-sets
#[derive(Debug, Clone, Serialize)]
pub struct MigrationRunResult {
    /// Connection the run targeted
    pub connection: String,
    /// Batch number recorded, `None` when nothing was applied
    pub batch: Option<i64>,
    /// Change-sets applied, in application order
    pub applied_migrations: Vec<String>,
    /// Change-sets that were already recorded and therefore skipped
    pub skipped_count: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationRunResult {
    pub fn applied_count(&self) -> usize {
        self.applied_migrations.len()
    }
}

/// Result of rolling back change-sets
#[derive(Debug, Clone, Serialize)]
pub struct RollbackResult {
    /// Connection the rollback targeted
    pub connection: String,
    /// Batches that were rolled back, newest first
    pub batches: Vec<i64>,
    /// Change-sets reverted, in revert order
    pub rolled_back_migrations: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl RollbackResult {
    pub fn rolled_back_count(&self) -> usize {
        self.rolled_back_migrations.len()
    }
}

/// State of a change-set on one connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MigrationState {
    /// File exists and is not recorded
    Pending,
    /// File exists and is recorded
    Applied {
        batch: i64,
        migrated_at: Option<NaiveDateTime>,
    },
    /// Recorded in the ledger, but the file is gone
    Missing { batch: i64 },
}

/// Status line for one change-set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub name: String,
    #[serde(flatten)]
    pub state: MigrationState,
}
