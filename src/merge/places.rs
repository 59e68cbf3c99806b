// Place Reconciler
// Insert-if-absent set union of the two place tables, keyed by URL

use rusqlite::Connection;

use super::error::Result;

/// Copies every source place whose URL does not yet exist in the target
///
/// Returns the number of places inserted. URLs already present in the
/// target are left completely untouched: the target's metadata for a known
/// URL always wins and the source's metadata for it is discarded. This is
/// a set union on the URL string, not a field-level merge.
pub fn reconcile_places(conn: &Connection, source_alias: &str) -> Result<usize> {
    let inserted = conn.execute(
        &format!(
            "INSERT INTO main.moz_places
                 (url, title, visit_count, hidden, typed, frecency, last_visit_date)
             SELECT s.url, s.title, s.visit_count, s.hidden, s.typed, s.frecency, s.last_visit_date
             FROM {alias}.moz_places s
             WHERE NOT EXISTS (
                 SELECT 1 FROM main.moz_places p WHERE p.url = s.url
             )",
            alias = source_alias
        ),
        [],
    )?;

    Ok(inserted)
}
