// Database Module for the History Merge Tool
// Connection handling and row models for the two history stores

// Module organization:
// - connection.rs: target connection, read-only source attach, transactions
// - models.rs: row-level data models
// - error.rs: error handling

pub mod connection;
pub mod error;
pub mod models;

pub use connection::{HistoryDb, SOURCE_ALIAS};
pub use error::{DatabaseError, Result};
pub use models::{PlaceRecord, SourceVisit, StagedVisit};
