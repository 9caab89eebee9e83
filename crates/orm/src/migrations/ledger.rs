//! Migration ledger
//!
//! The ledger table lives on the connection it describes. It has no
//! uniqueness constraint on `filename`; callers check `is_applied` before
//! recording when they want at-most-once semantics.

use chrono::{DateTime, NaiveDateTime};

use super::definitions::LedgerEntry;
use crate::backends::{BackendError, DatabaseConnection, DatabaseValue};
use crate::error::{MigrationError, MigrationResult};

/// Ledger operations bound to one connection
pub struct LedgerStore<'a> {
    connection: &'a dyn DatabaseConnection,
    connection_name: &'a str,
    table: &'a str,
}

impl<'a> LedgerStore<'a> {
    pub fn new(connection: &'a dyn DatabaseConnection, connection_name: &'a str, table: &'a str) -> Self {
        Self {
            connection,
            connection_name,
            table,
        }
    }

    pub fn connection_name(&self) -> &str {
        self.connection_name
    }

    fn error(&self, source: BackendError) -> MigrationError {
        MigrationError::ledger(self.connection_name, source)
    }

    /// Read an integer column, failing instead of guessing on anything else
    fn integer(&self, value: &DatabaseValue, index: usize, column: &str) -> MigrationResult<i64> {
        value.as_i64().ok_or_else(|| {
            self.error(BackendError::Decode {
                index,
                reason: format!("expected an integer for {}, got {:?}", column, value),
            })
        })
    }

    fn placeholder(&self, index: usize) -> String {
        self.connection.backend_type().placeholder(index)
    }

    /// Create the ledger table if it does not exist yet
    pub async fn ensure(&self) -> MigrationResult<()> {
        let sql = self.connection.backend_type().ledger_table_sql(self.table);
        self.connection
            .execute(&sql, &[])
            .await
            .map_err(|e| self.error(e))?;
        Ok(())
    }

    /// Highest recorded batch, 0 for an empty ledger
    pub async fn last_batch(&self) -> MigrationResult<i64> {
        let sql = format!("SELECT COALESCE(MAX(batch), 0) FROM {}", self.table);
        let value = self
            .connection
            .fetch_scalar(&sql, &[])
            .await
            .map_err(|e| self.error(e))?;
        self.integer(&value, 0, "last batch")
    }

    /// Check if a change-set is recorded
    pub async fn is_applied(&self, filename: &str) -> MigrationResult<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE filename = {}",
            self.table,
            self.placeholder(1)
        );
        let value = self
            .connection
            .fetch_scalar(&sql, &[filename.into()])
            .await
            .map_err(|e| self.error(e))?;
        Ok(self.integer(&value, 0, "applied count")? > 0)
    }

    /// Record a change-set as applied in `batch`
    pub async fn record(&self, filename: &str, batch: i64) -> MigrationResult<()> {
        let sql = format!(
            "INSERT INTO {} (filename, batch) VALUES ({}, {})",
            self.table,
            self.placeholder(1),
            self.placeholder(2)
        );
        self.connection
            .execute(&sql, &[filename.into(), batch.into()])
            .await
            .map_err(|e| self.error(e))?;
        Ok(())
    }

    /// Delete the record of a change-set, returning how many rows went away
    pub async fn forget(&self, filename: &str) -> MigrationResult<u64> {
        let sql = format!("DELETE FROM {} WHERE filename = {}", self.table, self.placeholder(1));
        self.connection
            .execute(&sql, &[filename.into()])
            .await
            .map_err(|e| self.error(e))
    }

    /// Change-sets of one batch, most recently applied first
    pub async fn entries_for_batch(&self, batch: i64) -> MigrationResult<Vec<String>> {
        let sql = format!(
            "SELECT filename FROM {} WHERE batch = {} ORDER BY id DESC",
            self.table,
            self.placeholder(1)
        );
        let rows = self
            .connection
            .fetch_rows(&sql, &[batch.into()])
            .await
            .map_err(|e| self.error(e))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next().and_then(DatabaseValue::into_string))
            .collect())
    }

    /// Every ledger row in insertion order
    pub async fn entries(&self) -> MigrationResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT id, filename, batch, {} FROM {} ORDER BY id",
            self.connection.backend_type().timestamp_text("migrated_at"),
            self.table
        );
        let rows = self
            .connection
            .fetch_rows(&sql, &[])
            .await
            .map_err(|e| self.error(e))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let mut values = row.into_iter();
            let (Some(id), Some(filename), Some(batch), migrated_at) =
                (values.next(), values.next(), values.next(), values.next())
            else {
                return Err(self.error(BackendError::Decode {
                    index: 0,
                    reason: "ledger row has fewer than three columns".to_string(),
                }));
            };

            let id = self.integer(&id, 0, "id")?;
            let batch = self.integer(&batch, 2, "batch")?;
            let Some(filename) = filename.into_string() else {
                return Err(self.error(BackendError::Decode {
                    index: 1,
                    reason: "expected text for filename".to_string(),
                }));
            };

            entries.push(LedgerEntry {
                id,
                filename,
                batch,
                migrated_at: migrated_at
                    .as_ref()
                    .and_then(DatabaseValue::as_str)
                    .and_then(parse_timestamp),
            });
        }
        Ok(entries)
    }

    /// Empty the ledger and reset its id counter
    pub async fn clear(&self) -> MigrationResult<()> {
        for sql in self.connection.backend_type().truncate_sql(self.table) {
            self.connection
                .execute(&sql, &[])
                .await
                .map_err(|e| self.error(e))?;
        }
        Ok(())
    }
}

/// Parse the textual form a backend gives for a `TIMESTAMP`
fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.naive_utc()))
}
