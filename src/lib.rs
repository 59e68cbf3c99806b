// places-merge
// Merges the browsing history of a source places.sqlite into a target one:
// URL-keyed place reconciliation plus an id-offset scheme that keeps the
// two visit key spaces disjoint.

pub mod backup;
pub mod db;
pub mod logging;
pub mod merge;
