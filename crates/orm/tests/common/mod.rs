//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use std::fs;
use std::sync::Arc;

use strata_core::{DatabaseConfig, DatabaseConfigs};
use strata_orm::{
    ConnectionRegistry, ConnectionResolver, DatabaseConnection, MigrationConfig, MigrationManager, MigrationRunner,
};
use strata_orm::migrations::LedgerStore;
use tempfile::TempDir;

pub const CONNECTION: &str = "sqlite";
pub const LEDGER_TABLE: &str = "migrations";

/// A SQLite database file and a change-set directory in a temp dir
pub struct Fixture {
    pub dir: TempDir,
    pub registry: Arc<ConnectionRegistry>,
    pub runner: MigrationRunner,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let database = dir.path().join("app.db");
        let configs = DatabaseConfigs::default()
            .with_connection(CONNECTION, DatabaseConfig::sqlite(database.to_string_lossy()))
            .with_default(CONNECTION);

        let registry = Arc::new(ConnectionRegistry::new(configs));
        let manager = MigrationManager::with_config(MigrationConfig {
            migrations_dir: dir.path().join("migrations"),
            migrations_table: LEDGER_TABLE.to_string(),
        });
        fs::create_dir_all(&manager.config().migrations_dir).unwrap();

        let resolver: Arc<dyn ConnectionResolver> = registry.clone();
        let runner = MigrationRunner::new(manager, resolver);

        Self { dir, registry, runner }
    }

    /// Write a change-set file with both markers
    pub fn write_change_set(&self, name: &str, up: &str, down: &str) {
        let content = format!("-- +++ UP Migration\n{}\n-- --- DOWN Migration\n{}\n", up, down);
        fs::write(self.runner.manager().path_for(name), content).unwrap();
    }

    pub async fn connection(&self) -> Arc<dyn DatabaseConnection> {
        self.registry.resolve(CONNECTION).await.unwrap()
    }

    pub async fn scalar(&self, sql: &str) -> i64 {
        self.connection()
            .await
            .fetch_scalar(sql, &[])
            .await
            .unwrap()
            .as_i64()
            .unwrap()
    }

    pub async fn table_exists(&self, table: &str) -> bool {
        let sql = format!(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '{}'",
            table
        );
        self.scalar(&sql).await > 0
    }

    pub async fn ledger_rows(&self, filename: &str) -> i64 {
        self.scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE filename = '{}'",
            LEDGER_TABLE, filename
        ))
        .await
    }

    pub async fn last_batch(&self) -> i64 {
        let connection = self.connection().await;
        LedgerStore::new(connection.as_ref(), CONNECTION, LEDGER_TABLE)
            .last_batch()
            .await
            .unwrap()
    }
}
