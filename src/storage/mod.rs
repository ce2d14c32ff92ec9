//! SQLite storage layer.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - One transaction per bulk write
//! - Natural-key primary keys on dimension tables
//! - An FTS5 index over normalised alternate titles
//!
//! # Submodules
//!
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation

pub mod schema;
pub mod sqlite;

pub use sqlite::{SearchSource, SqliteStorage, TitleFilter};
