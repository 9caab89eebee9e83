use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::database::DatabaseConfigs;
use super::validation::ConfigError;

/// Where change-set files live and which ledger table records them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationSettings {
    #[serde(default = "default_migrations_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_migrations_table")]
    pub table: String,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("database/migrations")
}

fn default_migrations_table() -> String {
    "migrations".to_string()
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            directory: default_migrations_dir(),
            table: default_migrations_table(),
        }
    }
}

/// Top-level project configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub database: DatabaseConfigs,
    #[serde(default)]
    pub migrations: MigrationSettings,
}

impl ProjectConfig {
    /// Conventional location of the project configuration file
    pub fn default_path() -> PathBuf {
        PathBuf::from("config/database.yaml")
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve configuration the way the CLI does
    ///
    /// An explicit path must exist. Without one, the conventional file is
    /// used when present, otherwise connections come from the environment.
    /// `MIGRATIONS_DIR` overrides the change-set directory in every case.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let conventional = Self::default_path();
                if conventional.exists() {
                    tracing::debug!("loading configuration from {}", conventional.display());
                    Self::load(&conventional)?
                } else {
                    tracing::debug!("no configuration file found, reading connections from environment");
                    Self {
                        database: DatabaseConfigs::from_env(),
                        migrations: MigrationSettings::default(),
                    }
                }
            }
        };

        if let Ok(dir) = std::env::var("MIGRATIONS_DIR") {
            if !dir.is_empty() {
                config.migrations.directory = PathBuf::from(dir);
            }
        }

        Ok(config)
    }
}
