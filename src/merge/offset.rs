// Offset Calculator
// Computes the id shift that keeps the two visit key spaces disjoint

use rusqlite::Connection;

use super::error::{MergeError, Result};

/// Reads the highest visit id currently in the target store (0 when the
/// table is empty)
///
/// Every migrated visit id and every nonzero `from_visit` reference is
/// shifted by exactly this value. SQLite assigns rowids starting at 1, so
/// `source_id + offset` is always at least `offset + 1`, strictly above
/// every pre-existing target id. The guarantee only holds if no other
/// writer inserts between this read and the final insert, which is why the
/// engine calls this inside the same exclusive transaction that performs
/// the inserts.
pub fn compute_offset(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT IFNULL(MAX(id), 0) FROM moz_historyvisits",
        [],
        |row| row.get(0),
    )
    .map_err(|e| MergeError::Offset(e.to_string()))
}
