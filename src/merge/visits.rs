// Visit Merger
// Remaps source visits into the target key space and inserts them

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{SourceVisit, StagedVisit};

use super::engine::ProgressObserver;
use super::error::Result;

/// Counters describing what happened to the source visit set
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VisitStats {
    /// Visits read from the source store
    pub source_total: usize,
    /// Visits inserted into the target
    pub migrated: usize,
    /// Visits excluded because their place did not resolve to a target URL
    pub unresolved_place: usize,
    /// Exact (place, timestamp) duplicates collapsed
    pub duplicate_rows: usize,
    /// Rows skipped because the migrated id already existed in the target
    pub id_collisions: usize,
}

/// Merges every source visit into the target store
///
/// Runs inside the engine's exclusive transaction, after place
/// reconciliation. The staged rows live in an in-memory sequence owned by
/// this call, so they are discarded on every exit path.
pub fn merge_visits(
    conn: &Connection,
    source_alias: &str,
    offset: i64,
    progress: &mut dyn ProgressObserver,
) -> Result<VisitStats> {
    let mut stats = VisitStats::default();

    let source_visits = load_source_visits(conn, source_alias)?;
    stats.source_total = source_visits.len();

    let target_places = load_target_place_ids(conn)?;
    let existing_ids = load_existing_visit_ids(conn)?;
    let existing_keys = load_existing_visit_keys(conn)?;

    let staged = remap_visits(&source_visits, &target_places, offset, &mut stats);
    let staged = dedupe_staged(staged, &existing_ids, &existing_keys, &mut stats);

    stats.migrated = insert_staged(conn, &staged, progress)?;

    Ok(stats)
}

/// Loads every source visit joined to its place's URL
///
/// The join is LEFT so a visit whose `place_id` dangles in the source still
/// comes back (with no URL) and can be counted as excluded, instead of
/// disappearing silently in SQL.
pub fn load_source_visits(conn: &Connection, source_alias: &str) -> Result<Vec<SourceVisit>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT v.id, IFNULL(v.from_visit, 0), IFNULL(v.visit_date, 0),
                IFNULL(v.visit_type, 0), p.url
         FROM {alias}.moz_historyvisits v
         LEFT JOIN {alias}.moz_places p ON p.id = v.place_id
         ORDER BY v.id",
        alias = source_alias
    ))?;

    let rows = stmt.query_map([], |row| {
        Ok(SourceVisit {
            id: row.get(0)?,
            from_visit: row.get(1)?,
            visit_date: row.get(2)?,
            visit_type: row.get(3)?,
            url: row.get(4)?,
        })
    })?;

    let mut visits = Vec::new();
    for row in rows {
        visits.push(row?);
    }
    Ok(visits)
}

/// Maps every URL in the target place table to its target-space place id
pub fn load_target_place_ids(conn: &Connection) -> Result<HashMap<String, i64>> {
    let mut stmt = conn.prepare("SELECT url, id FROM main.moz_places")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut places = HashMap::new();
    for row in rows {
        let (url, id) = row?;
        places.insert(url, id);
    }
    Ok(places)
}

/// Loads the set of visit ids already present in the target
pub fn load_existing_visit_ids(conn: &Connection) -> Result<HashSet<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM main.moz_historyvisits")?;
    let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;

    let mut ids = HashSet::new();
    for row in rows {
        ids.insert(row?);
    }
    Ok(ids)
}

/// Loads the (place_id, visit_date) pairs already present in the target
pub fn load_existing_visit_keys(conn: &Connection) -> Result<HashSet<(i64, i64)>> {
    let mut stmt =
        conn.prepare("SELECT place_id, IFNULL(visit_date, 0) FROM main.moz_historyvisits")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut keys = HashSet::new();
    for row in rows {
        keys.insert(row?);
    }
    Ok(keys)
}

/// Remaps source visits into the target key space
///
/// Pure function over the staged sequence: id becomes `id + offset`, and a
/// nonzero `from_visit` is shifted identically so every predecessor chain
/// keeps its shape without a second pass. `from_visit = 0` is the "root of
/// chain" sentinel, not an id, and is never offset. A visit whose place
/// cannot be resolved to a target URL is excluded here rather than inserted
/// with a dangling place reference.
pub fn remap_visits(
    source_visits: &[SourceVisit],
    target_places: &HashMap<String, i64>,
    offset: i64,
    stats: &mut VisitStats,
) -> Vec<StagedVisit> {
    let mut staged = Vec::with_capacity(source_visits.len());

    for visit in source_visits {
        let place_id = match visit.url.as_deref().and_then(|u| target_places.get(u)) {
            Some(&id) => id,
            None => {
                stats.unresolved_place += 1;
                continue;
            }
        };

        let from_visit = if visit.from_visit == 0 {
            0
        } else {
            visit.from_visit + offset
        };

        staged.push(StagedVisit {
            place_id,
            id: visit.id + offset,
            from_visit,
            visit_date: visit.visit_date,
            visit_type: visit.visit_type,
            session: 0,
        });
    }

    staged
}

/// Drops staged rows that would collide or duplicate existing data
///
/// Two rules, both applied against the target and within the batch itself:
/// a row whose migrated id already exists is skipped (offset arithmetic
/// should make this unreachable in a single-writer run), and exact
/// (place_id, visit_date) duplicates collapse to one row, since repeated
/// loads of the same page produce legitimate duplicates in the source.
///
/// A `from_visit` pointing at a visit that was dropped here is left as-is;
/// the reference legitimately never resolves and guessing a repair would
/// corrupt the chain.
pub fn dedupe_staged(
    staged: Vec<StagedVisit>,
    existing_ids: &HashSet<i64>,
    existing_keys: &HashSet<(i64, i64)>,
    stats: &mut VisitStats,
) -> Vec<StagedVisit> {
    let mut seen_keys: HashSet<(i64, i64)> = HashSet::new();
    let mut seen_ids: HashSet<i64> = HashSet::new();
    let mut kept = Vec::with_capacity(staged.len());

    for row in staged {
        if existing_ids.contains(&row.id) || seen_ids.contains(&row.id) {
            stats.id_collisions += 1;
            continue;
        }
        let key = row.dedup_key();
        if existing_keys.contains(&key) || seen_keys.contains(&key) {
            stats.duplicate_rows += 1;
            continue;
        }
        seen_ids.insert(row.id);
        seen_keys.insert(key);
        kept.push(row);
    }

    kept
}

/// Bulk-inserts the staged rows into the target visit table
pub fn insert_staged(
    conn: &Connection,
    staged: &[StagedVisit],
    progress: &mut dyn ProgressObserver,
) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO main.moz_historyvisits
             (id, from_visit, place_id, visit_date, visit_type, session)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    let total = staged.len();
    for (index, row) in staged.iter().enumerate() {
        stmt.execute(row.to_params())?;
        progress.on_progress(index + 1, total);
    }

    Ok(total)
}
