use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration for connection '{connection}': {reason}")]
    Invalid { connection: String, reason: String },

    #[error("Cannot build connection url for database '{database}': {reason}")]
    Url { database: String, reason: String },

    #[error("Unsupported database type: '{0}'. Expected one of: mysql, postgres, sqlite")]
    UnknownDatabaseType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// Create an invalid connection configuration error
    pub fn invalid(connection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            connection: connection.into(),
            reason: reason.into(),
        }
    }

    /// Create a connection url error
    pub fn url(database: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Url {
            database: database.into(),
            reason: reason.into(),
        }
    }
}
