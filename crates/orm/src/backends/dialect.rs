//! Dialect-specific SQL for the ledger table
//!
//! The logical ledger shape is identical on every backend:
//! `id` (auto-increment key), `filename`, `batch`, `migrated_at` (defaults to
//! the server's current time). Only the spelling differs.

use super::DatabaseBackendType;

impl DatabaseBackendType {
    /// Bind parameter placeholder for the 1-based position `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            DatabaseBackendType::PostgreSQL => format!("${}", index),
            DatabaseBackendType::MySQL | DatabaseBackendType::SQLite => "?".to_string(),
        }
    }

    /// Idempotent DDL creating the ledger table
    pub fn ledger_table_sql(&self, table: &str) -> String {
        match self {
            DatabaseBackendType::PostgreSQL => format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    \
                    id SERIAL PRIMARY KEY,\n    \
                    filename VARCHAR(255) NOT NULL,\n    \
                    batch INTEGER NOT NULL,\n    \
                    migrated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n\
                )",
                table
            ),
            DatabaseBackendType::MySQL => format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    \
                    id INT PRIMARY KEY AUTO_INCREMENT,\n    \
                    filename VARCHAR(255) NOT NULL,\n    \
                    batch INT NOT NULL,\n    \
                    migrated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n\
                )",
                table
            ),
            DatabaseBackendType::SQLite => format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    \
                    id INTEGER PRIMARY KEY AUTOINCREMENT,\n    \
                    filename VARCHAR(255) NOT NULL,\n    \
                    batch INTEGER NOT NULL,\n    \
                    migrated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n\
                )",
                table
            ),
        }
    }

    /// Statements that empty the ledger and reset its id counter, in order
    pub fn truncate_sql(&self, table: &str) -> Vec<String> {
        match self {
            DatabaseBackendType::PostgreSQL => vec![format!("TRUNCATE {} RESTART IDENTITY", table)],
            DatabaseBackendType::MySQL => vec![format!("TRUNCATE {}", table)],
            // SQLite has no TRUNCATE; AUTOINCREMENT counters live in sqlite_sequence
            DatabaseBackendType::SQLite => vec![
                format!("DELETE FROM {}", table),
                format!("DELETE FROM sqlite_sequence WHERE name = '{}'", table),
            ],
        }
    }

    /// Expression reading a timestamp column as text
    pub fn timestamp_text(&self, column: &str) -> String {
        match self {
            DatabaseBackendType::MySQL => format!("CAST({} AS CHAR)", column),
            DatabaseBackendType::PostgreSQL | DatabaseBackendType::SQLite => {
                format!("CAST({} AS TEXT)", column)
            }
        }
    }
}
