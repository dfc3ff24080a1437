//! Loads basketball statistics from the balldontlie REST API into SQLite.
//!
//! The binary in `main.rs` wires these modules together; the library split
//! exists so the loaders can be driven from integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod etl;
pub mod monitoring;
