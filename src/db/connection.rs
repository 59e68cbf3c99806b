// History Store Connection
// Handles opening the target store and attaching the source store read-only

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};

use super::error::{DatabaseError, Result};

/// Logical alias under which the source store is attached
pub const SOURCE_ALIAS: &str = "source";

/// A connection to the target history store, with the source store
/// optionally attached under a read-only alias
pub struct HistoryDb {
    /// Path to the target database file
    pub path: PathBuf,
    /// The underlying SQLite connection
    conn: Connection,
}

impl HistoryDb {
    /// Opens the target store read-write
    ///
    /// The file must already exist; this tool never creates a history
    /// database from scratch.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DatabaseError::Connection(format!(
                "no database file at {}",
                path.display()
            )));
        }

        // No SQLITE_OPEN_CREATE: opening must fail rather than leave an
        // empty database behind. URI open is needed for the read-only attach.
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    /// Attaches a second store under `alias`, read-only
    ///
    /// The source store must never be written to, so it is attached through
    /// a `file:` URI with `mode=ro`.
    pub fn attach_read_only(&self, path: &Path, alias: &str) -> Result<()> {
        let uri = read_only_uri(path);
        self.conn
            .execute(&format!("ATTACH DATABASE ?1 AS {}", alias), [uri.as_str()])
            .map_err(|e| DatabaseError::Attach(e.to_string()))?;
        Ok(())
    }

    /// Detaches a previously attached store
    pub fn detach(&self, alias: &str) -> Result<()> {
        self.conn
            .execute(&format!("DETACH DATABASE {}", alias), [])
            .map_err(|e| DatabaseError::Attach(e.to_string()))?;
        Ok(())
    }

    /// Gives direct access to the connection for read-only queries
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Executes a batch of SQL statements outside any managed transaction
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }

    /// Runs `f` inside a single exclusive transaction
    ///
    /// The exclusive lock spans the whole closure, so a maximum-id read and
    /// the inserts that depend on it cannot be interleaved with another
    /// writer. On any error the transaction is rolled back and the target
    /// file is left exactly as it was.
    pub fn transaction<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        E: From<DatabaseError>,
        F: FnOnce(&Transaction<'_>) -> std::result::Result<T, E>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)
            .map_err(|e| DatabaseError::Transaction(e.to_string()))?;

        match f(&tx) {
            Ok(result) => {
                tx.commit()
                    .map_err(|e| DatabaseError::Transaction(e.to_string()))?;
                Ok(result)
            }
            Err(e) => {
                // Rollback failure is unreportable here; the original error
                // is the one the caller needs to see.
                let _ = tx.rollback();
                Err(e)
            }
        }
    }
}

/// Builds a `file:` URI that opens `path` read-only when attached
fn read_only_uri(path: &Path) -> String {
    // Percent-encode the few characters that would change the meaning of
    // the URI; everything else passes through unchanged.
    let mut encoded = String::new();
    for c in path.to_string_lossy().chars() {
        match c {
            '%' => encoded.push_str("%25"),
            '?' => encoded.push_str("%3F"),
            '#' => encoded.push_str("%23"),
            _ => encoded.push(c),
        }
    }
    format!("file:{}?mode=ro", encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_db(path: &Path) {
        let conn = Connection::open(path).expect("Failed to create database");
        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)", [])
            .expect("Failed to create table");
    }

    #[test]
    fn test_open_requires_existing_file() {
        let dir = tempdir().expect("Failed to create temp directory");
        let missing = dir.path().join("missing.sqlite");

        let result = HistoryDb::open(&missing);
        assert!(matches!(result, Err(DatabaseError::Connection(_))));
    }

    #[test]
    fn test_attached_store_is_read_only() {
        let dir = tempdir().expect("Failed to create temp directory");
        let target_path = dir.path().join("target.sqlite");
        let source_path = dir.path().join("source.sqlite");
        create_db(&target_path);
        create_db(&source_path);

        let db = HistoryDb::open(&target_path).expect("Failed to open target");
        db.attach_read_only(&source_path, SOURCE_ALIAS)
            .expect("Failed to attach source");

        // Reads through the alias work, writes must fail
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM source.t", [], |row| row.get(0))
            .expect("Failed to read attached store");
        assert_eq!(count, 0);

        let write = db
            .conn()
            .execute("INSERT INTO source.t (v) VALUES ('x')", []);
        assert!(write.is_err());

        db.detach(SOURCE_ALIAS).expect("Failed to detach source");
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let dir = tempdir().expect("Failed to create temp directory");
        let target_path = dir.path().join("target.sqlite");
        create_db(&target_path);

        let mut db = HistoryDb::open(&target_path).expect("Failed to open target");

        let result: std::result::Result<(), DatabaseError> = db.transaction(|tx| {
            tx.execute("INSERT INTO t (v) VALUES ('staged')", [])?;
            Err(DatabaseError::Query("injected failure".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .expect("Failed to count rows");
        assert_eq!(count, 0);
    }
}
