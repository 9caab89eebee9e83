//! # strata-core
//!
//! Configuration layer for strata: named database connections, their
//! dialects and pool settings, and where change-set files live.

pub mod config;

pub use config::{
    ConfigError, DatabaseConfig, DatabaseConfigs, DatabaseType, MigrationSettings, ProjectConfig,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
