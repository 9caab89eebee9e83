//! Connection Registry
//!
//! Lazily established, process-wide set of named connections. The first
//! request for a name validates its configuration, dials it and probes it;
//! later requests get the cached handle. Nothing is dialed eagerly.
//!
//! Each name owns a slot that is filled once. The map lock is only held to
//! find or create a slot, never across a dial, so a slow connection does
//! not hold up lookups of other names.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use strata_core::{DatabaseConfig, DatabaseConfigs};
use tokio::sync::{OnceCell, RwLock};

use super::health::ConnectionHealth;
use crate::backends::{BackendResult, DatabaseConnection, DatabasePoolStats, SqlxConnection};
use crate::error::{MigrationError, MigrationResult};

/// Resolves connection names to live handles
#[async_trait]
pub trait ConnectionResolver: Send + Sync {
    /// Get the handle for `name`, establishing it on first use
    async fn resolve(&self, name: &str) -> MigrationResult<Arc<dyn DatabaseConnection>>;

    /// Name used when a caller does not pick a connection
    fn default_connection(&self) -> &str;
}

/// Dials a connection from its configuration
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, name: &str, config: &DatabaseConfig) -> BackendResult<Arc<dyn DatabaseConnection>>;
}

/// Production connector backed by sqlx pools
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlxConnector;

#[async_trait]
impl Connector for SqlxConnector {
    async fn connect(&self, _name: &str, config: &DatabaseConfig) -> BackendResult<Arc<dyn DatabaseConnection>> {
        let connection = SqlxConnection::connect(config).await?;
        Ok(Arc::new(connection))
    }
}

type Slot = Arc<OnceCell<Arc<dyn DatabaseConnection>>>;

/// Registry of named connections
pub struct ConnectionRegistry {
    configs: DatabaseConfigs,
    connector: Arc<dyn Connector>,
    connections: RwLock<HashMap<String, Slot>>,
}

impl ConnectionRegistry {
    /// Create a registry that dials through sqlx
    pub fn new(configs: DatabaseConfigs) -> Self {
        Self::with_connector(configs, Arc::new(SqlxConnector))
    }

    /// Create a registry with a custom connector
    pub fn with_connector(configs: DatabaseConfigs, connector: Arc<dyn Connector>) -> Self {
        Self {
            configs,
            connector,
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub fn configs(&self) -> &DatabaseConfigs {
        &self.configs
    }

    /// Names of all configured connections, sorted
    pub fn list_connections(&self) -> Vec<String> {
        self.configs.names()
    }

    /// Establish a connection, or return the cached one
    ///
    /// Concurrent callers for the same name share a single dial.
    pub async fn connect(&self, name: &str) -> MigrationResult<Arc<dyn DatabaseConnection>> {
        let config = self.configs.get(name).ok_or_else(|| {
            MigrationError::configuration(name, format!("database configuration '{}' not found", name))
        })?;

        config
            .validate(name)
            .map_err(|e| MigrationError::configuration(name, e.to_string()))?;

        let slot = self.slot(name).await;
        let connection = slot
            .get_or_try_init(|| async move {
                let connection = self
                    .connector
                    .connect(name, config)
                    .await
                    .map_err(|source| MigrationError::Connectivity {
                        connection: name.to_string(),
                        source,
                    })?;

                tracing::info!(
                    connection = name,
                    backend = %connection.backend_type(),
                    "database connection established"
                );
                Ok::<_, MigrationError>(connection)
            })
            .await?;

        Ok(Arc::clone(connection))
    }

    async fn slot(&self, name: &str) -> Slot {
        if let Some(slot) = self.connections.read().await.get(name) {
            return Arc::clone(slot);
        }

        let mut connections = self.connections.write().await;
        Arc::clone(connections.entry(name.to_string()).or_default())
    }

    async fn established(&self, name: &str) -> Option<Arc<dyn DatabaseConnection>> {
        self.connections
            .read()
            .await
            .get(name)
            .and_then(|slot| slot.get().cloned())
    }

    /// Check if a connection is established and answers a probe
    pub async fn is_connected(&self, name: &str) -> bool {
        match self.established(name).await {
            Some(connection) => connection.ping().await.is_ok(),
            None => false,
        }
    }

    /// Pool statistics of an established connection
    pub async fn stats(&self, name: &str) -> Option<DatabasePoolStats> {
        self.established(name).await.map(|c| c.stats())
    }

    /// Resolve `name` and probe it
    pub async fn health(&self, name: &str) -> MigrationResult<ConnectionHealth> {
        let connection = self.resolve(name).await?;
        let latency = connection
            .ping()
            .await
            .map_err(|source| MigrationError::Connectivity {
                connection: name.to_string(),
                source,
            })?;

        Ok(ConnectionHealth {
            name: name.to_string(),
            backend: connection.backend_type(),
            latency,
            stats: connection.stats(),
        })
    }

    /// Close one connection and forget it; a later resolve dials again
    pub async fn close(&self, name: &str) {
        let removed = self.connections.write().await.remove(name);
        if let Some(connection) = removed.as_ref().and_then(|slot| slot.get()) {
            connection.close().await;
            tracing::info!(connection = name, "database connection closed");
        }
    }

    /// Close every established connection
    pub async fn teardown(&self) {
        let drained: Vec<_> = self.connections.write().await.drain().collect();
        for (name, slot) in drained {
            let Some(connection) = slot.get() else { continue };
            connection.close().await;
            tracing::info!(connection = %name, "database connection closed");
        }
    }
}

#[async_trait]
impl ConnectionResolver for ConnectionRegistry {
    async fn resolve(&self, name: &str) -> MigrationResult<Arc<dyn DatabaseConnection>> {
        if let Some(connection) = self.established(name).await {
            return Ok(connection);
        }

        self.connect(name).await
    }

    fn default_connection(&self) -> &str {
        &self.configs.default
    }
}
