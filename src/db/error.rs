// Database Error Handling
// Defines error types for the history store layer

use std::error::Error;
use std::fmt;

/// Represents errors that can occur while talking to a history store
#[derive(Debug)]
pub enum DatabaseError {
    /// Error opening the target store
    Connection(String),
    /// Error attaching or detaching the source store
    Attach(String),
    /// Error executing a query or statement
    Query(String),
    /// Error beginning, committing or rolling back a transaction
    Transaction(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DatabaseError::Connection(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::Attach(msg) => write!(f, "Attach error: {}", msg),
            DatabaseError::Query(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::Transaction(msg) => write!(f, "Transaction error: {}", msg),
        }
    }
}

impl Error for DatabaseError {}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::Query(err.to_string())
    }
}

/// Result type for database operations
pub type Result<T> = std::result::Result<T, DatabaseError>;
