//! Connection Health Reporting
//!
//! Snapshot of one resolved connection, produced for `db status`.

use std::time::Duration;

use crate::backends::{DatabaseBackendType, DatabasePoolStats};

/// Health snapshot of a named connection
#[derive(Debug, Clone)]
pub struct ConnectionHealth {
    pub name: String,
    pub backend: DatabaseBackendType,
    pub latency: Duration,
    pub stats: DatabasePoolStats,
}

impl ConnectionHealth {
    /// Check if the probe completed quickly
    pub fn is_responsive(&self) -> bool {
        self.latency < Duration::from_millis(1000)
    }

    /// Get pool utilization percentage
    pub fn utilization(&self) -> f64 {
        if self.stats.total_connections > 0 {
            (self.stats.active_connections as f64 / self.stats.total_connections as f64) * 100.0
        } else {
            0.0
        }
    }
}
