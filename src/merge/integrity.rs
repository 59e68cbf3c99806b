// Integrity Checker
// Verifies that a store exposes the two required history tables

use rusqlite::Connection;

use super::error::{MergeError, Result};

/// Tables every history store must expose before a merge may start
pub const REQUIRED_TABLES: [&str; 2] = ["moz_places", "moz_historyvisits"];

/// Checks that the store behind `alias` has both history tables and that
/// they answer a bounded read
///
/// `alias` is `main` for the target store and the attach alias for the
/// source store. The check is advisory: it takes no locks, it only ensures
/// the merge will not start against a database that cannot satisfy it.
pub fn check_store(conn: &Connection, alias: &str) -> Result<()> {
    for table in REQUIRED_TABLES {
        let exists: bool = conn
            .query_row(
                &format!(
                    "SELECT EXISTS(SELECT 1 FROM {}.sqlite_master WHERE type = 'table' AND name = ?1)",
                    alias
                ),
                [table],
                |row| row.get(0),
            )
            .map_err(|e| MergeError::SchemaMissing(format!("{} ({}): {}", table, alias, e)))?;

        if !exists {
            return Err(MergeError::SchemaMissing(format!(
                "store '{}' has no '{}' table",
                alias, table
            )));
        }

        // A trivial bounded read proves the table is actually queryable,
        // not just present in the catalog
        conn.query_row(
            &format!("SELECT 1 FROM {}.{} LIMIT 1", alias, table),
            [],
            |_row| Ok(()),
        )
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(()),
            other => Err(MergeError::SchemaMissing(format!(
                "table '{}.{}' is not readable: {}",
                alias, table, other
            ))),
        })?;
    }

    Ok(())
}
