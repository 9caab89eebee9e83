//! # strata-orm: migration engine for strata
//!
//! Applies idempotent, reversible, batch-tracked schema changes across
//! several independently configured database connections. Each connection
//! keeps its own `migrations` ledger next to the data it migrates.
//!
//! The pieces, leaf first:
//! - [`migrations::parser`] splits a change-set file into apply and revert statements
//! - [`connection`] resolves named connections through an injected registry
//! - [`migrations::ledger`] owns the ledger table of one connection
//! - [`migrations::sequencer`] computes batch numbers and pending change-sets
//! - [`migrations::MigrationRunner`] orchestrates apply, revert and fresh runs

pub mod backends;
pub mod connection;
pub mod error;
pub mod migrations;

pub use backends::{BackendError, DatabaseBackendType, DatabaseConnection, DatabaseValue};
pub use connection::{ConnectionRegistry, ConnectionResolver, Connector, SqlxConnector};
pub use error::{MigrationError, MigrationResult};
pub use migrations::{
    ChangeSet, LedgerEntry, MigrationConfig, MigrationManager, MigrationRunResult, MigrationRunner,
    MigrationState, MigrationStatus, RollbackResult,
};
