//! Migration Manager - File system operations for migrations
//!
//! Handles listing, loading and creating change-set files in the
//! configured migrations directory.

use chrono::Local;
use std::fs;
use std::path::PathBuf;

use super::definitions::{ChangeSet, MigrationConfig, CHANGE_SET_EXTENSION, DOWN_MARKER, UP_MARKER};
use super::parser::parse_change_set;
use crate::error::{MigrationError, MigrationResult};

/// Migration manager for creating and loading change-sets
#[derive(Debug, Clone)]
pub struct MigrationManager {
    config: MigrationConfig,
}

impl MigrationManager {
    /// Create a new migration manager with default configuration
    pub fn new() -> Self {
        Self::with_config(MigrationConfig::default())
    }

    /// Create a new migration manager with custom configuration
    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Strip a trailing `.sql` so both spellings name the same change-set
    pub fn normalize_name(name: &str) -> &str {
        name.strip_suffix(".sql").unwrap_or(name)
    }

    /// Path of the file for a change-set name
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.config
            .migrations_dir
            .join(format!("{}.{}", Self::normalize_name(name), CHANGE_SET_EXTENSION))
    }

    /// Names of all change-set files, sorted ascending
    ///
    /// A missing directory means there are no change-sets yet.
    pub fn available(&self) -> MigrationResult<Vec<String>> {
        let dir = &self.config.migrations_dir;
        if !dir.exists() {
            tracing::warn!("migrations directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(dir).map_err(|e| MigrationError::file(dir, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| MigrationError::file(dir, e))?.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != CHANGE_SET_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Read and parse one change-set
    pub fn load(&self, name: &str) -> MigrationResult<ChangeSet> {
        let path = self.path_for(name);
        let content = fs::read_to_string(&path).map_err(|e| MigrationError::file(&path, e))?;
        let (apply_statements, revert_statements) = parse_change_set(&content);

        Ok(ChangeSet {
            name: Self::normalize_name(name).to_string(),
            apply_statements,
            revert_statements,
        })
    }

    /// Create a new change-set file named `<timestamp>_<name>.sql`
    pub fn create_migration(&self, name: &str) -> MigrationResult<PathBuf> {
        let dir = &self.config.migrations_dir;
        fs::create_dir_all(dir).map_err(|e| MigrationError::file(dir, e))?;

        let slug = name.trim().replace(' ', "_").to_lowercase();
        let timestamp = Local::now().format("%Y%m%d%H%M%S");
        let path = dir.join(format!("{}_{}.{}", timestamp, slug, CHANGE_SET_EXTENSION));

        let (up, down) = migration_template(&slug);
        let content = format!("{}\n{}\n{}\n{}\n", UP_MARKER, up, DOWN_MARKER, down);

        fs::write(&path, content).map_err(|e| MigrationError::file(&path, e))?;
        tracing::info!("created change-set {}", path.display());
        Ok(path)
    }
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply and revert bodies for a new change-set, guessed from its name
fn migration_template(name: &str) -> (String, String) {
    if let Some(table) = name.strip_prefix("create_") {
        let table = table.strip_suffix("_table").unwrap_or(table);
        let up = format!(
            "CREATE TABLE {} (\n    \
                id BIGINT AUTO_INCREMENT PRIMARY KEY,\n    \
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,\n    \
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,\n    \
                deleted_at TIMESTAMP NULL DEFAULT NULL\n\
            );",
            table
        );
        return (up, format!("DROP TABLE IF EXISTS {};", table));
    }

    if let Some(table) = name.strip_prefix("alter_") {
        let table = table.strip_suffix("_table").unwrap_or(table);
        let up = format!("ALTER TABLE {}\n-- ADD COLUMN new_column_name DATA_TYPE;\n", table);
        let down = format!("ALTER TABLE {}\n-- DROP COLUMN new_column_name;\n", table);
        return (up, down);
    }

    ("-- up SQL here".to_string(), "-- down SQL here".to_string())
}
