//! Wiring shared by every command

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

use strata_core::ProjectConfig;
use strata_orm::{ConnectionRegistry, ConnectionResolver, MigrationManager, MigrationRunner};

/// Configuration, connection registry and migration runner for one invocation
pub struct AppContext {
    pub config: ProjectConfig,
    pub registry: Arc<ConnectionRegistry>,
    pub runner: MigrationRunner,
}

impl AppContext {
    /// Resolve configuration from `path`, the conventional file or the environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = ProjectConfig::resolve(path).with_context(|| match path {
            Some(path) => format!("failed to load configuration from {}", path.display()),
            None => "failed to load configuration".to_string(),
        })?;

        Ok(Self::from_config(config))
    }

    pub fn from_config(config: ProjectConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.database.clone()));
        let manager = MigrationManager::with_config(config.migrations.clone().into());
        let resolver: Arc<dyn ConnectionResolver> = registry.clone();

        Self {
            runner: MigrationRunner::new(manager, resolver),
            registry,
            config,
        }
    }

    /// Connection a command targets, falling back to the configured default
    pub fn connection_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        self.runner.connection_name(requested)
    }
}
