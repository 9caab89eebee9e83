//! Migration Runner - Executes change-sets against named connections
//!
//! The runner holds no state between calls beyond what the ledger of each
//! connection records. Statements run one at a time, in file order, and
//! each one auto-commits on its own: a failure part way through a
//! change-set leaves the earlier statements applied and the ledger
//! untouched for that change-set.
//!
//! Two runners working on the same connection at once can pick the same
//! batch number or apply the same change-set twice. Run one at a time.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use super::definitions::{MigrationRunResult, MigrationState, MigrationStatus};
use super::ledger::LedgerStore;
use super::manager::MigrationManager;
use super::sequencer::BatchSequencer;
use crate::backends::DatabaseConnection;
use crate::connection::ConnectionResolver;
use crate::error::{MigrationError, MigrationResult};

/// Migration runner that applies and reverts change-sets
pub struct MigrationRunner {
    manager: MigrationManager,
    resolver: Arc<dyn ConnectionResolver>,
}

impl MigrationRunner {
    /// Create a new migration runner
    pub fn new(manager: MigrationManager, resolver: Arc<dyn ConnectionResolver>) -> Self {
        Self { manager, resolver }
    }

    /// Get the migration manager
    pub fn manager(&self) -> &MigrationManager {
        &self.manager
    }

    /// Get the connection resolver
    pub fn resolver(&self) -> &Arc<dyn ConnectionResolver> {
        &self.resolver
    }

    /// Name of the connection to use, falling back to the default one
    pub fn connection_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.resolver.default_connection(),
        }
    }

    pub(super) async fn open(&self, name: &str) -> MigrationResult<Arc<dyn DatabaseConnection>> {
        self.resolver.resolve(name).await
    }

    pub(super) fn ledger<'a>(&'a self, connection: &'a dyn DatabaseConnection, name: &'a str) -> LedgerStore<'a> {
        LedgerStore::new(connection, name, &self.manager.config().migrations_table)
    }

    /// Run statements in order, stopping at the first failure
    pub(super) async fn execute_statements(
        &self,
        connection: &dyn DatabaseConnection,
        connection_name: &str,
        change_set: &str,
        statements: &[String],
    ) -> MigrationResult<()> {
        for statement in statements {
            tracing::debug!(connection = connection_name, change_set, "{}", statement);

            connection
                .execute(statement, &[])
                .await
                .map_err(|source| MigrationError::Statement {
                    connection: connection_name.to_string(),
                    filename: change_set.to_string(),
                    statement: statement.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Apply one change-set and record it in a new batch
    ///
    /// The ledger is not consulted first: applying a recorded change-set
    /// again runs its statements again and adds a second ledger row.
    pub async fn apply_one(&self, filename: &str, connection: Option<&str>) -> MigrationResult<MigrationRunResult> {
        let start_time = Instant::now();
        let connection_name = self.connection_name(connection);
        let connection = self.open(connection_name).await?;
        let ledger = self.ledger(connection.as_ref(), connection_name);

        ledger.ensure().await?;
        let batch = BatchSequencer::new(&ledger).next_batch().await?;

        let change_set = self.manager.load(filename)?;
        self.execute_statements(
            connection.as_ref(),
            connection_name,
            &change_set.name,
            &change_set.apply_statements,
        )
        .await?;
        ledger.record(&change_set.name, batch).await?;

        println!("Migrated: {}", change_set.name);
        tracing::info!(connection = connection_name, batch, "applied {}", change_set.name);

        Ok(MigrationRunResult {
            connection: connection_name.to_string(),
            batch: Some(batch),
            applied_migrations: vec![change_set.name],
            skipped_count: 0,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Apply every pending change-set under one new batch number
    pub async fn apply_all(&self, connection: Option<&str>) -> MigrationResult<MigrationRunResult> {
        let start_time = Instant::now();
        let connection_name = self.connection_name(connection);
        let connection = self.open(connection_name).await?;
        let ledger = self.ledger(connection.as_ref(), connection_name);

        ledger.ensure().await?;
        self.apply_pending(connection.as_ref(), &ledger, start_time).await
    }

    /// Forget the whole ledger, then apply every change-set again
    ///
    /// No revert statements run and no schema objects are dropped, so this
    /// only succeeds against a populated schema when the apply statements
    /// tolerate existing objects.
    pub async fn fresh(&self, connection: Option<&str>) -> MigrationResult<MigrationRunResult> {
        let start_time = Instant::now();
        let connection_name = self.connection_name(connection);
        let connection = self.open(connection_name).await?;
        let ledger = self.ledger(connection.as_ref(), connection_name);

        ledger.ensure().await?;
        ledger.clear().await?;
        tracing::info!(connection = connection_name, "ledger cleared");

        self.apply_pending(connection.as_ref(), &ledger, start_time).await
    }

    async fn apply_pending(
        &self,
        connection: &dyn DatabaseConnection,
        ledger: &LedgerStore<'_>,
        start_time: Instant,
    ) -> MigrationResult<MigrationRunResult> {
        let connection_name = ledger.connection_name();
        let sequencer = BatchSequencer::new(ledger);
        let batch = sequencer.next_batch().await?;

        let available = self.manager.available()?;
        let pending = sequencer.pending_change_sets(&available).await?;
        let skipped_count = available.len() - pending.len();

        if pending.is_empty() {
            println!("Nothing to migrate.");
            return Ok(MigrationRunResult {
                connection: connection_name.to_string(),
                batch: None,
                applied_migrations: Vec::new(),
                skipped_count,
                execution_time_ms: start_time.elapsed().as_millis(),
            });
        }

        let mut applied_migrations = Vec::with_capacity(pending.len());
        for name in pending {
            println!("Migrating: {}", name);

            let change_set = self.manager.load(&name)?;
            self.execute_statements(connection, connection_name, &name, &change_set.apply_statements)
                .await?;
            ledger.record(&name, batch).await?;

            tracing::info!(connection = connection_name, batch, "applied {}", name);
            applied_migrations.push(name);
        }

        println!("Batch {} applied.", batch);

        Ok(MigrationRunResult {
            connection: connection_name.to_string(),
            batch: Some(batch),
            applied_migrations,
            skipped_count,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// State of every known change-set on a connection
    ///
    /// Files come first in name order, followed by ledger rows whose file is
    /// gone, in the order they were recorded.
    pub async fn status(&self, connection: Option<&str>) -> MigrationResult<Vec<MigrationStatus>> {
        let connection_name = self.connection_name(connection);
        let connection = self.open(connection_name).await?;
        let ledger = self.ledger(connection.as_ref(), connection_name);

        ledger.ensure().await?;
        let entries = ledger.entries().await?;
        let available = self.manager.available()?;

        let mut statuses: Vec<MigrationStatus> = available
            .iter()
            .map(|name| {
                let state = match entries.iter().find(|entry| &entry.filename == name) {
                    Some(entry) => MigrationState::Applied {
                        batch: entry.batch,
                        migrated_at: entry.migrated_at,
                    },
                    None => MigrationState::Pending,
                };
                MigrationStatus {
                    name: name.clone(),
                    state,
                }
            })
            .collect();

        let mut seen: HashSet<&str> = available.iter().map(String::as_str).collect();
        for entry in &entries {
            if seen.insert(entry.filename.as_str()) {
                statuses.push(MigrationStatus {
                    name: entry.filename.clone(),
                    state: MigrationState::Missing { batch: entry.batch },
                });
            }
        }

        Ok(statuses)
    }
}
