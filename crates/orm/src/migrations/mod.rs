//! Migration System
//!
//! Change-sets are plain SQL files holding an apply part and a revert part.
//! Each connection records what it has applied in its own ledger table,
//! grouped into batches so the last deploy can be undone on its own.

pub mod definitions;
pub mod ledger;
pub mod manager;
pub mod parser;
pub mod rollback;
pub mod runner;
pub mod sequencer;

pub use definitions::*;
pub use ledger::LedgerStore;
pub use manager::MigrationManager;
pub use parser::{parse_change_set, split_sql_statements};
pub use runner::MigrationRunner;
pub use sequencer::BatchSequencer;
