// Merge Error Handling
// Defines error types for the merge engine, one per failure phase

use std::error::Error;
use std::fmt;

use crate::db::DatabaseError;

/// Represents errors that can abort or roll back a merge run
#[derive(Debug)]
pub enum MergeError {
    /// A store could not be opened or attached
    Connection(String),
    /// A required history table is absent or unreadable
    SchemaMissing(String),
    /// The id offset could not be computed from the target store
    Offset(String),
    /// The pre-merge backup copy could not be created
    Backup(String),
    /// A statement inside the merge transaction failed; the whole
    /// transaction has been rolled back
    Statement(String),
    /// Post-commit cleanup failed; the merge itself succeeded
    Cleanup(String),
    /// The operator declined the confirmation prompt
    Declined,
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MergeError::Connection(msg) => write!(f, "Store connection failed: {}", msg),
            MergeError::SchemaMissing(msg) => write!(f, "Schema check failed: {}", msg),
            MergeError::Offset(msg) => write!(f, "Offset computation failed: {}", msg),
            MergeError::Backup(msg) => write!(f, "Backup failed: {}", msg),
            MergeError::Statement(msg) => write!(f, "Merge statement failed: {}", msg),
            MergeError::Cleanup(msg) => write!(f, "Cleanup failed: {}", msg),
            MergeError::Declined => write!(f, "Merge declined by operator"),
        }
    }
}

impl Error for MergeError {}

impl From<DatabaseError> for MergeError {
    fn from(err: DatabaseError) -> Self {
        // Database errors surface inside the transactional phase unless a
        // component maps them to a more specific kind first
        MergeError::Statement(err.to_string())
    }
}

impl From<rusqlite::Error> for MergeError {
    fn from(err: rusqlite::Error) -> Self {
        MergeError::Statement(err.to_string())
    }
}

/// Result type for merge operations
pub type Result<T> = std::result::Result<T, MergeError>;
