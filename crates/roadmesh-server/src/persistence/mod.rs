//! Persistence layer for the route network server.
//!
//! SQLite key-value storage. Saved path segments are kept as one JSON
//! document and replaced whole on every change.

pub mod db;
pub mod kv;
pub mod segments;

pub use db::{init_database, Database};
