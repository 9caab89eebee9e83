pub mod database;
pub mod project;
pub mod validation;

pub use database::*;
pub use project::*;
pub use validation::*;
