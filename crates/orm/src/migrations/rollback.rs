//! Migration Rollback - Reverting change-sets one by one or by batch
//!
//! A change-set is forgotten by the ledger only after all of its revert
//! statements succeeded. Batches are reverted newest change-set first.

use std::time::Instant;

use super::definitions::RollbackResult;
use super::ledger::LedgerStore;
use super::manager::MigrationManager;
use super::runner::MigrationRunner;
use crate::backends::DatabaseConnection;
use crate::error::MigrationResult;

impl MigrationRunner {
    /// Revert one change-set and delete its ledger row
    ///
    /// The ledger is not consulted first; the revert statements run even
    /// for a change-set that was never applied.
    pub async fn revert_one(&self, filename: &str, connection: Option<&str>) -> MigrationResult<RollbackResult> {
        let start_time = Instant::now();
        let connection_name = self.connection_name(connection);
        let connection = self.open(connection_name).await?;
        let ledger = self.ledger(connection.as_ref(), connection_name);

        ledger.ensure().await?;
        let name = MigrationManager::normalize_name(filename);
        self.revert_change_set(connection.as_ref(), &ledger, name).await?;

        Ok(RollbackResult {
            connection: connection_name.to_string(),
            batches: Vec::new(),
            rolled_back_migrations: vec![name.to_string()],
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Revert every change-set recorded in `batch`
    pub async fn revert_batch(&self, batch: i64, connection: Option<&str>) -> MigrationResult<RollbackResult> {
        let start_time = Instant::now();
        let connection_name = self.connection_name(connection);
        let connection = self.open(connection_name).await?;
        let ledger = self.ledger(connection.as_ref(), connection_name);

        ledger.ensure().await?;
        let rolled_back_migrations = self.revert_recorded_batch(connection.as_ref(), &ledger, batch).await?;

        Ok(RollbackResult {
            connection: connection_name.to_string(),
            batches: vec![batch],
            rolled_back_migrations,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Revert the most recent batch; nothing happens on an empty ledger
    ///
    /// Issues no DDL, so the ledger must already exist.
    pub async fn revert_last_batch(&self, connection: Option<&str>) -> MigrationResult<RollbackResult> {
        let start_time = Instant::now();
        let connection_name = self.connection_name(connection);
        let connection = self.open(connection_name).await?;
        let ledger = self.ledger(connection.as_ref(), connection_name);

        let last_batch = ledger.last_batch().await?;
        if last_batch == 0 {
            println!("No batch to rollback.");
            return Ok(RollbackResult {
                connection: connection_name.to_string(),
                batches: Vec::new(),
                rolled_back_migrations: Vec::new(),
                execution_time_ms: start_time.elapsed().as_millis(),
            });
        }

        let rolled_back_migrations = self
            .revert_recorded_batch(connection.as_ref(), &ledger, last_batch)
            .await?;

        Ok(RollbackResult {
            connection: connection_name.to_string(),
            batches: vec![last_batch],
            rolled_back_migrations,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Revert every batch, newest first, stopping at the first failure
    pub async fn revert_all(&self, connection: Option<&str>) -> MigrationResult<RollbackResult> {
        let start_time = Instant::now();
        let connection_name = self.connection_name(connection);
        let connection = self.open(connection_name).await?;
        let ledger = self.ledger(connection.as_ref(), connection_name);

        ledger.ensure().await?;
        let last_batch = ledger.last_batch().await?;

        let mut batches = Vec::new();
        let mut rolled_back_migrations = Vec::new();
        for batch in (1..=last_batch).rev() {
            let reverted = self.revert_recorded_batch(connection.as_ref(), &ledger, batch).await?;
            batches.push(batch);
            rolled_back_migrations.extend(reverted);
        }

        Ok(RollbackResult {
            connection: connection_name.to_string(),
            batches,
            rolled_back_migrations,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    async fn revert_recorded_batch(
        &self,
        connection: &dyn DatabaseConnection,
        ledger: &LedgerStore<'_>,
        batch: i64,
    ) -> MigrationResult<Vec<String>> {
        let names = ledger.entries_for_batch(batch).await?;

        for name in &names {
            println!("Rolling back: {}", name);
            self.revert_change_set(connection, ledger, name).await?;
        }

        println!("Batch {} rolled back.", batch);
        tracing::info!(connection = ledger.connection_name(), batch, "batch rolled back");
        Ok(names)
    }

    async fn revert_change_set(
        &self,
        connection: &dyn DatabaseConnection,
        ledger: &LedgerStore<'_>,
        name: &str,
    ) -> MigrationResult<()> {
        let connection_name = ledger.connection_name();
        let change_set = self.manager().load(name)?;

        self.execute_statements(connection, connection_name, &change_set.name, &change_set.revert_statements)
            .await?;

        if ledger.forget(&change_set.name).await? == 0 {
            tracing::warn!(
                connection = connection_name,
                "{} was reverted but had no ledger entry",
                change_set.name
            );
        }

        println!("Rolled back: {}", change_set.name);
        tracing::info!(connection = connection_name, "reverted {}", change_set.name);
        Ok(())
    }
}
