// Merge Engine
// Orchestrates one merge run through its phases

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::backup;
use crate::db::{DatabaseError, HistoryDb, SOURCE_ALIAS};
use crate::logging::MergeLog;

use super::error::{MergeError, Result};
use super::integrity;
use super::offset;
use super::places;
use super::visits::{self, VisitStats};

/// Explicit configuration for one merge run
///
/// Everything the engine needs is passed in here; there is no ambient
/// state.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Path to the target store (mutated)
    pub target_path: PathBuf,
    /// Path to the source store (read-only)
    pub source_path: PathBuf,
    /// Directory for the pre-merge backup; defaults to the target's directory
    pub backup_dir: Option<PathBuf>,
    /// Skip the VACUUM / optimize pass before merging
    pub skip_vacuum: bool,
    /// Path of the append-only merge log, if any
    pub log_path: Option<PathBuf>,
}

/// The phase a merge run is in, or ended in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MergePhase {
    /// Nothing has happened yet
    Idle,
    /// Both stores passed the integrity check
    Checked,
    /// The target has been backed up
    BackedUp,
    /// The merge transaction is in flight
    Merging,
    /// The merge transaction committed
    Committed,
    /// The merge transaction failed and was rolled back
    RolledBack,
    /// The run stopped before touching the target's transactional state
    Aborted,
}

impl fmt::Display for MergePhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            MergePhase::Idle => "idle",
            MergePhase::Checked => "checked",
            MergePhase::BackedUp => "backed-up",
            MergePhase::Merging => "merging",
            MergePhase::Committed => "committed",
            MergePhase::RolledBack => "rolled-back",
            MergePhase::Aborted => "aborted",
        };
        write!(f, "{}", name)
    }
}

/// Yes/no gate consulted before the first destructive step
///
/// The engine never runs unattended past this gate unless the caller wires
/// in [`AutoConfirm`] explicitly.
pub trait ConfirmationGate {
    /// Returns true if the operator approves the prompt
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Confirmation bypass for explicitly non-interactive runs
pub struct AutoConfirm;

impl ConfirmationGate for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Receives coarse progress while visits are inserted
///
/// Reporting must never block or alter merge semantics; implementations
/// should do nothing heavier than logging.
pub trait ProgressObserver {
    /// Called after each inserted row with (processed, total)
    fn on_progress(&mut self, processed: usize, total: usize);
}

/// Observer that ignores all progress
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(&mut self, _processed: usize, _total: usize) {}
}

/// Summary of a committed merge run
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    /// Final phase (always `Committed` for a returned report)
    pub phase: MergePhase,
    /// The id offset applied to migrated visits
    pub offset: i64,
    /// Places copied into the target
    pub places_inserted: usize,
    /// What happened to the source visit set
    pub visits: VisitStats,
    /// Where the pre-merge backup was written
    pub backup_path: PathBuf,
}

/// Drives one source-into-target merge from integrity check to commit
pub struct MergeEngine {
    config: MergeConfig,
    log: MergeLog,
    phase: MergePhase,
}

impl MergeEngine {
    /// Creates an engine for the given configuration
    pub fn new(config: MergeConfig) -> Self {
        let log = MergeLog::new(config.log_path.as_deref());
        Self {
            config,
            log,
            phase: MergePhase::Idle,
        }
    }

    /// The phase the last run ended in
    pub fn phase(&self) -> MergePhase {
        self.phase
    }

    /// Runs the merge to completion or failure
    ///
    /// Order: integrity check both stores, back up the target, consult the
    /// confirmation gate, vacuum (unless skipped), then run the offset read,
    /// place reconciliation and visit merge inside a single exclusive
    /// transaction. Any failure inside that transaction rolls the target
    /// back to its pre-run state; any failure before it leaves the target
    /// completely untouched.
    pub fn run(
        &mut self,
        gate: &mut dyn ConfirmationGate,
        progress: &mut dyn ProgressObserver,
    ) -> Result<MergeReport> {
        let mut db = self.open_stores()?;

        self.check_integrity(&db)?;
        let backup_path = self.back_up()?;

        if !gate.confirm(&format!(
            "Merge {} into {}?",
            self.config.source_path.display(),
            self.config.target_path.display()
        )) {
            self.phase = MergePhase::Aborted;
            self.log.record("merge declined by operator");
            return Err(MergeError::Declined);
        }

        if !self.config.skip_vacuum {
            self.vacuum(&db)?;
        }

        self.phase = MergePhase::Merging;
        self.log.record("merge started");

        let merge_result = db.transaction(|tx| {
            // The offset read shares the exclusive lock with the inserts
            // that depend on it, closing the read-then-write race
            let offset = offset::compute_offset(tx)?;
            let places_inserted = places::reconcile_places(tx, SOURCE_ALIAS)?;
            let visit_stats = visits::merge_visits(tx, SOURCE_ALIAS, offset, progress)?;
            Ok::<_, MergeError>((offset, places_inserted, visit_stats))
        });

        let (offset, places_inserted, visit_stats) = match merge_result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.phase = MergePhase::RolledBack;
                self.log.record(&format!("merge rolled back: {}", e));
                return Err(e);
            }
        };

        self.phase = MergePhase::Committed;
        self.log.record(&format!(
            "merge committed: {} places, {} visits (offset {})",
            places_inserted, visit_stats.migrated, offset
        ));

        // The merge is durable at this point; a detach failure is logged
        // but must not be reported as a merge failure
        if let Err(e) = db.detach(SOURCE_ALIAS) {
            let cleanup = MergeError::Cleanup(e.to_string());
            self.log.record(&cleanup.to_string());
        }

        Ok(MergeReport {
            phase: self.phase,
            offset,
            places_inserted,
            visits: visit_stats,
            backup_path,
        })
    }

    /// Opens the target and attaches the source read-only
    fn open_stores(&mut self) -> Result<HistoryDb> {
        let db = HistoryDb::open(&self.config.target_path)
            .map_err(|e| self.abort(MergeError::Connection(e.to_string())))?;
        db.attach_read_only(&self.config.source_path, SOURCE_ALIAS)
            .map_err(|e| self.abort(MergeError::Connection(e.to_string())))?;
        Ok(db)
    }

    /// Verifies both stores expose the required tables
    fn check_integrity(&mut self, db: &HistoryDb) -> Result<()> {
        for alias in ["main", SOURCE_ALIAS] {
            if let Err(e) = integrity::check_store(db.conn(), alias) {
                self.log
                    .record(&format!("integrity check failed for '{}': {}", alias, e));
                return Err(self.abort(e));
            }
        }
        self.phase = MergePhase::Checked;
        self.log.record("integrity checks passed for both stores");
        Ok(())
    }

    /// Writes the pre-merge backup copy
    fn back_up(&mut self) -> Result<PathBuf> {
        let backup_path =
            backup::create_backup(&self.config.target_path, self.config.backup_dir.as_deref())
                .map_err(|e| {
                    self.log.record(&format!("backup failed: {}", e));
                    self.abort(MergeError::Backup(e.to_string()))
                })?;
        self.phase = MergePhase::BackedUp;
        self.log
            .record(&format!("backup written to {}", backup_path.display()));
        Ok(backup_path)
    }

    /// Runs the VACUUM / optimize pass on the target
    fn vacuum(&mut self, db: &HistoryDb) -> Result<()> {
        self.log.record("vacuum started");
        db.execute_batch("VACUUM; PRAGMA optimize;")
            .map_err(|e: DatabaseError| {
                self.log.record(&format!("vacuum failed: {}", e));
                self.abort(MergeError::Statement(e.to_string()))
            })?;
        self.log.record("vacuum completed");
        Ok(())
    }

    /// Marks the run aborted and passes the error through
    fn abort(&mut self, err: MergeError) -> MergeError {
        self.phase = MergePhase::Aborted;
        err
    }
}
