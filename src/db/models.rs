// Database Models
// Row-level data models for the two history tables

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::error::Result;

/// Represents a row of `moz_places`: one unique URL with its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRecord {
    /// Store-local numeric id; not meaningful across stores
    pub id: i64,
    /// The full URL; the natural dedup key across stores
    pub url: String,
    /// Page title, if any
    pub title: Option<String>,
    /// Denormalized visit count
    pub visit_count: i64,
    /// Hidden flag
    pub hidden: i64,
    /// Typed flag
    pub typed: i64,
    /// Frecency relevance score
    pub frecency: i64,
    /// Last visit timestamp, microseconds since the Unix epoch
    pub last_visit_date: Option<i64>,
}

impl PlaceRecord {
    /// Creates a record from a SQLite row, columns in table order
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            visit_count: row.get(3)?,
            hidden: row.get(4)?,
            typed: row.get(5)?,
            frecency: row.get(6)?,
            last_visit_date: row.get(7)?,
        })
    }
}

/// A source-store visit joined to its place's URL
///
/// The URL is the only identifier a visit can carry across stores, so it is
/// recovered here by joining `moz_historyvisits` to `moz_places` on the
/// source side. A dangling `place_id` leaves `url` as `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceVisit {
    /// Visit id in the source store's key space
    pub id: i64,
    /// Id of the navigationally preceding visit, 0 for "no predecessor"
    pub from_visit: i64,
    /// Visit timestamp, microseconds since the Unix epoch
    pub visit_date: i64,
    /// Visit type code
    pub visit_type: i64,
    /// URL of the visited place, if the place join resolved
    pub url: Option<String>,
}

/// A visit remapped into the target store's key space, awaiting insertion
///
/// Staged rows live only in memory for the duration of one merge run; they
/// are dropped on every exit path, so no staging state can outlive a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedVisit {
    /// Target-space place id resolved through the URL
    pub place_id: i64,
    /// Migrated visit id (source id + offset)
    pub id: i64,
    /// Migrated predecessor reference; 0 stays 0, anything else is offset
    pub from_visit: i64,
    /// Visit timestamp, carried over unchanged
    pub visit_date: i64,
    /// Visit type code, carried over unchanged
    pub visit_type: i64,
    /// Session marker; migrated rows always start a fresh session (0)
    pub session: i64,
}

impl StagedVisit {
    /// Converts this row to SQLite parameters for insertion
    pub fn to_params(&self) -> [&dyn rusqlite::ToSql; 6] {
        [
            &self.id,
            &self.from_visit,
            &self.place_id,
            &self.visit_date,
            &self.visit_type,
            &self.session,
        ]
    }

    /// The deduplication key: repeated loads of the same page legitimately
    /// produce identical (place, timestamp) pairs and must collapse to one row
    pub fn dedup_key(&self) -> (i64, i64) {
        (self.place_id, self.visit_date)
    }
}
