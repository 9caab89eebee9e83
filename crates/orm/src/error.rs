//! Error types for the migration engine
//!
//! Every failure carries the connection it happened on and, where one is
//! involved, the change-set it belongs to. Nothing here is retried.

use std::path::PathBuf;
use thiserror::Error;

use crate::backends::BackendError;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

#[derive(Debug, Error)]
pub enum MigrationError {
    /// The connection name has no usable configuration
    #[error("Connection '{connection}' is not configured: {reason}")]
    Configuration { connection: String, reason: String },

    /// The connection is configured but could not be dialed or pinged
    #[error("Connection '{connection}' is unreachable: {source}")]
    Connectivity {
        connection: String,
        #[source]
        source: BackendError,
    },

    /// A change-set file or the change-set directory could not be read or written
    #[error("Change-set file error at {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A statement of a change-set failed while applying or reverting it
    #[error("Statement failed in '{filename}' on connection '{connection}': {source}\n    {statement}")]
    Statement {
        connection: String,
        filename: String,
        statement: String,
        #[source]
        source: BackendError,
    },

    /// The ledger table could not be created, queried or written
    #[error("Migration ledger error on connection '{connection}': {source}")]
    Ledger {
        connection: String,
        #[source]
        source: BackendError,
    },
}

impl MigrationError {
    pub fn configuration(connection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            connection: connection.into(),
            reason: reason.into(),
        }
    }

    pub fn ledger(connection: impl Into<String>, source: BackendError) -> Self {
        Self::Ledger {
            connection: connection.into(),
            source,
        }
    }

    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    /// Name of the connection involved, when the error is tied to one
    pub fn connection(&self) -> Option<&str> {
        match self {
            MigrationError::Configuration { connection, .. }
            | MigrationError::Connectivity { connection, .. }
            | MigrationError::Statement { connection, .. }
            | MigrationError::Ledger { connection, .. } => Some(connection),
            MigrationError::File { .. } => None,
        }
    }
}
