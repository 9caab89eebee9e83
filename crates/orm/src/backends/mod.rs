//! Database Backend Abstractions
//!
//! The narrow interface the migration engine consumes: execute a statement,
//! read a scalar or a column, and report which SQL dialect the backend
//! speaks. `DatabaseBackendType` doubles as the dialect strategy that
//! supplies ledger DDL and truncation statements.

pub mod core;
pub mod dialect;
pub mod sqlx_any;

pub use self::core::*;
pub use sqlx_any::SqlxConnection;

use strata_core::DatabaseType;

/// Database backend type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseBackendType {
    PostgreSQL,
    MySQL,
    SQLite,
}

impl DatabaseBackendType {
    pub fn is_postgres(&self) -> bool {
        matches!(self, DatabaseBackendType::PostgreSQL)
    }

    pub fn is_mysql(&self) -> bool {
        matches!(self, DatabaseBackendType::MySQL)
    }
}

impl From<DatabaseType> for DatabaseBackendType {
    fn from(kind: DatabaseType) -> Self {
        match kind {
            DatabaseType::MySql => DatabaseBackendType::MySQL,
            DatabaseType::Postgres => DatabaseBackendType::PostgreSQL,
            DatabaseType::Sqlite => DatabaseBackendType::SQLite,
        }
    }
}

impl std::fmt::Display for DatabaseBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseBackendType::PostgreSQL => write!(f, "postgresql"),
            DatabaseBackendType::MySQL => write!(f, "mysql"),
            DatabaseBackendType::SQLite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for DatabaseBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(DatabaseBackendType::PostgreSQL),
            "mysql" | "mariadb" => Ok(DatabaseBackendType::MySQL),
            "sqlite" => Ok(DatabaseBackendType::SQLite),
            _ => Err(format!("Unsupported database backend: {}", s)),
        }
    }
}
