//! sqlx Backend Implementation
//!
//! One `AnyPool` per named connection. The concrete driver (MySQL,
//! PostgreSQL, SQLite) is picked from the connection URL; the dialect is
//! remembered separately so DDL generation never has to sniff URLs.

use async_trait::async_trait;
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Row, ValueRef};
use std::time::{Duration, Instant};
use strata_core::{DatabaseConfig, DatabaseType};

use super::core::*;
use super::DatabaseBackendType;

/// Pooled connection handle backed by `sqlx::AnyPool`
pub struct SqlxConnection {
    pool: AnyPool,
    backend: DatabaseBackendType,
}

impl SqlxConnection {
    /// Open a pool for `config` and probe it once
    pub async fn connect(config: &DatabaseConfig) -> BackendResult<Self> {
        sqlx::any::install_default_drivers();

        let url = config
            .build_url()
            .map_err(|e| BackendError::Connect(e.to_string()))?;

        let pool = pool_options(config)
            .connect(&url)
            .await
            .map_err(|e| BackendError::Connect(e.to_string()))?;

        let connection = Self {
            pool,
            backend: DatabaseBackendType::from(config.kind),
        };

        connection
            .ping()
            .await
            .map_err(|e| BackendError::Connect(e.to_string()))?;

        Ok(connection)
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

/// Pool settings for one connection
///
/// Idle connections above `max_idle_conns` are reaped after the idle
/// timeout; up to that many stay open.
fn pool_options(config: &DatabaseConfig) -> AnyPoolOptions {
    let options = AnyPoolOptions::new()
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .test_before_acquire(true);

    // Every connection to an in-memory SQLite database is a separate database
    if config.kind == DatabaseType::Sqlite && config.database == ":memory:" {
        return options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let max_connections = config.max_open_conns.max(1);
    options
        .max_connections(max_connections)
        .min_connections(config.max_idle_conns.min(max_connections))
        .idle_timeout(Duration::from_secs(config.conn_max_idle_time_secs))
        .max_lifetime(Duration::from_secs(config.conn_max_lifetime_secs))
}

#[async_trait]
impl DatabaseConnection for SqlxConnection {
    fn backend_type(&self) -> DatabaseBackendType {
        self.backend
    }

    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> BackendResult<u64> {
        // Without arguments the statement goes over the text protocol, so
        // DDL the server refuses to prepare (MySQL triggers) still runs
        if params.is_empty() {
            let result = sqlx::Executor::execute(&self.pool, sql).await?;
            return Ok(result.rows_affected());
        }

        let mut query = sqlx::query(sql);

        for param in params {
            query = bind_database_value(query, param);
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn fetch_scalar(&self, sql: &str, params: &[DatabaseValue]) -> BackendResult<DatabaseValue> {
        let mut query = sqlx::query(sql);

        for param in params {
            query = bind_database_value(query, param);
        }

        match query.fetch_optional(&self.pool).await? {
            Some(row) => any_value_to_database_value(&row, 0),
            None => Ok(DatabaseValue::Null),
        }
    }

    async fn fetch_rows(&self, sql: &str, params: &[DatabaseValue]) -> BackendResult<Vec<Vec<DatabaseValue>>> {
        let mut query = sqlx::query(sql);

        for param in params {
            query = bind_database_value(query, param);
        }

        let rows = query.fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|index| any_value_to_database_value(row, index))
                    .collect()
            })
            .collect()
    }

    async fn ping(&self) -> BackendResult<Duration> {
        if self.pool.is_closed() {
            return Err(BackendError::PoolClosed);
        }

        let start = Instant::now();
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(start.elapsed())
    }

    fn stats(&self) -> DatabasePoolStats {
        let total = self.pool.size();
        let idle = self.pool.num_idle() as u32;

        DatabasePoolStats {
            total_connections: total,
            idle_connections: idle,
            active_connections: total.saturating_sub(idle),
        }
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn bind_database_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &DatabaseValue,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::String(s) => query.bind(s.clone()),
    }
}

/// Convert a column of an `AnyRow` to a `DatabaseValue`
///
/// Integer widths differ between drivers (`MAX(int)` is 32-bit on
/// PostgreSQL, 64-bit on SQLite), so narrower integers are widened.
fn any_value_to_database_value(row: &AnyRow, index: usize) -> BackendResult<DatabaseValue> {
    let raw = row.try_get_raw(index).map_err(|e| BackendError::Decode {
        index,
        reason: e.to_string(),
    })?;

    if raw.is_null() {
        return Ok(DatabaseValue::Null);
    }

    if let Ok(value) = row.try_get::<i64, _>(index) {
        return Ok(DatabaseValue::Int64(value));
    }
    if let Ok(value) = row.try_get::<i32, _>(index) {
        return Ok(DatabaseValue::Int64(i64::from(value)));
    }
    if let Ok(value) = row.try_get::<i16, _>(index) {
        return Ok(DatabaseValue::Int64(i64::from(value)));
    }
    if let Ok(value) = row.try_get::<String, _>(index) {
        return Ok(DatabaseValue::String(value));
    }
    if let Ok(value) = row.try_get::<bool, _>(index) {
        return Ok(DatabaseValue::Bool(value));
    }

    Err(BackendError::Decode {
        index,
        reason: "unsupported column type".to_string(),
    })
}
