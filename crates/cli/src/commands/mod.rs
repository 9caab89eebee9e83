pub mod db;
pub mod migrate;
