//! Batch bookkeeping on top of the ledger

use super::ledger::LedgerStore;
use crate::error::MigrationResult;

/// Computes batch numbers and pending change-sets for one connection
pub struct BatchSequencer<'a> {
    ledger: &'a LedgerStore<'a>,
}

impl<'a> BatchSequencer<'a> {
    pub fn new(ledger: &'a LedgerStore<'a>) -> Self {
        Self { ledger }
    }

    /// Batch number for the next apply run
    pub async fn next_batch(&self) -> MigrationResult<i64> {
        Ok(self.ledger.last_batch().await? + 1)
    }

    /// Available change-sets without a ledger row, sorted ascending
    pub async fn pending_change_sets(&self, available: &[String]) -> MigrationResult<Vec<String>> {
        let mut pending = Vec::new();
        for name in available {
            if !self.ledger.is_applied(name).await? {
                pending.push(name.clone());
            }
        }
        pending.sort();
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{BackendResult, DatabaseBackendType, DatabaseConnection, DatabasePoolStats, DatabaseValue};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Answers the two ledger queries the sequencer issues
    struct FakeLedgerConnection {
        recorded: Vec<&'static str>,
        last_batch: i64,
    }

    #[async_trait]
    impl DatabaseConnection for FakeLedgerConnection {
        fn backend_type(&self) -> DatabaseBackendType {
            DatabaseBackendType::SQLite
        }

        async fn execute(&self, _sql: &str, _params: &[DatabaseValue]) -> BackendResult<u64> {
            Ok(0)
        }

        async fn fetch_scalar(&self, sql: &str, params: &[DatabaseValue]) -> BackendResult<DatabaseValue> {
            if sql.starts_with("SELECT COUNT(*)") {
                let name = params.first().and_then(DatabaseValue::as_str).unwrap_or_default();
                let count = self.recorded.iter().filter(|r| **r == name).count();
                return Ok(DatabaseValue::Int64(count as i64));
            }
            Ok(DatabaseValue::Int64(self.last_batch))
        }

        async fn fetch_rows(&self, _sql: &str, _params: &[DatabaseValue]) -> BackendResult<Vec<Vec<DatabaseValue>>> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> BackendResult<Duration> {
            Ok(Duration::ZERO)
        }

        fn stats(&self) -> DatabasePoolStats {
            DatabasePoolStats::default()
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn test_next_batch_follows_last_batch() {
        let connection = FakeLedgerConnection {
            recorded: Vec::new(),
            last_batch: 3,
        };
        let ledger = LedgerStore::new(&connection, "sqlite", "migrations");

        assert_eq!(BatchSequencer::new(&ledger).next_batch().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_pending_excludes_recorded_and_sorts() {
        let connection = FakeLedgerConnection {
            recorded: vec!["20250101000000_a"],
            last_batch: 1,
        };
        let ledger = LedgerStore::new(&connection, "sqlite", "migrations");
        let available = vec![
            "20250103000000_c".to_string(),
            "20250101000000_a".to_string(),
            "20250102000000_b".to_string(),
        ];

        let pending = BatchSequencer::new(&ledger)
            .pending_change_sets(&available)
            .await
            .unwrap();
        assert_eq!(pending, vec!["20250102000000_b", "20250103000000_c"]);
    }
}
