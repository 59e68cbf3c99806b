// Merge Module
// The four ordered steps of a history merge, plus the engine driving them

// Module organization:
// - integrity.rs: required-table checks on both stores
// - offset.rs: id offset keeping the two visit key spaces disjoint
// - places.rs: URL-keyed insert-if-absent union of the place tables
// - visits.rs: remap / dedup / insert of the visit rows
// - engine.rs: state machine wiring the steps into one transactional run
// - error.rs: error handling

pub mod engine;
pub mod error;
pub mod integrity;
pub mod offset;
pub mod places;
pub mod visits;


pub use engine::{
    AutoConfirm, ConfirmationGate, MergeConfig, MergeEngine, MergePhase, MergeReport,
    NoopProgress, ProgressObserver,
};
pub use error::{MergeError, Result};
pub use visits::VisitStats;
