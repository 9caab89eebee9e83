//! Connection Management
//!
//! Named connections are resolved through a registry service that is
//! injected into the migration runner, never reached as ambient state.

pub mod health;
pub mod registry;

pub use health::*;
pub use registry::*;
