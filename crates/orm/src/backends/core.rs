//! Core Database Backend Traits
//!
//! This module defines the connection handle the migration engine talks to.
//! Implementations own their pooling; the engine only borrows a handle by
//! name for the duration of one operation.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::DatabaseBackendType;

/// Result type for backend calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Failure reported by a backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Cannot decode column {index}: {reason}")]
    Decode { index: usize, reason: String },

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Pool is closed")]
    PoolClosed,
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolClosed => BackendError::PoolClosed,
            sqlx::Error::PoolTimedOut
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_) => BackendError::Connect(err.to_string()),
            _ => BackendError::Query(err.to_string()),
        }
    }
}

/// Connection handle consumed by the migration engine
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// Dialect family of the backend, used to pick DDL variants
    fn backend_type(&self) -> DatabaseBackendType;

    /// Execute a statement and return the affected row count
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> BackendResult<u64>;

    /// First column of the first row, or `Null` when no row comes back
    async fn fetch_scalar(&self, sql: &str, params: &[DatabaseValue]) -> BackendResult<DatabaseValue>;

    /// Every row, each as its column values in select order
    async fn fetch_rows(&self, sql: &str, params: &[DatabaseValue]) -> BackendResult<Vec<Vec<DatabaseValue>>>;

    /// Round-trip a trivial query, returning how long it took
    async fn ping(&self) -> BackendResult<Duration>;

    /// Current pool statistics
    fn stats(&self) -> DatabasePoolStats;

    /// Close the handle; later calls fail with `PoolClosed`
    async fn close(&self);
}

/// Database pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabasePoolStats {
    pub total_connections: u32,
    pub idle_connections: u32,
    pub active_connections: u32,
}

/// Parameter and scalar values exchanged with a backend
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int64(i64),
    String(String),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Integer view of the value; numeric text is accepted since some
    /// drivers report aggregates as strings
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DatabaseValue::Int64(i) => Some(*i),
            DatabaseValue::Bool(b) => Some(i64::from(*b)),
            DatabaseValue::String(s) => s.trim().parse().ok(),
            DatabaseValue::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            DatabaseValue::String(s) => Some(s),
            DatabaseValue::Int64(i) => Some(i.to_string()),
            DatabaseValue::Bool(b) => Some(b.to_string()),
            DatabaseValue::Null => None,
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int64(i64::from(value))
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}
