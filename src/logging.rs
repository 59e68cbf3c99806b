// Logging
// Diagnostic tracing setup plus the append-only merge log file

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber
///
/// Call once at program startup. Safe to call again (subsequent calls are
/// no-ops). `RUST_LOG` overrides the default level.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("places_merge=info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Append-only, timestamped line sink for merge lifecycle events
///
/// The engine records discrete events here (checks passed/failed, backup
/// written, vacuum started/completed, merge started/committed/rolled back).
/// Writes are best-effort: a log failure must never change the outcome of
/// a merge, so errors are demoted to a tracing warning.
pub struct MergeLog {
    path: Option<PathBuf>,
}

impl MergeLog {
    /// Creates a log that appends to `path`, or a disabled log when `None`
    pub fn new(path: Option<&Path>) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
        }
    }

    /// Appends one timestamped line and mirrors it to the diagnostic log
    pub fn record(&self, message: &str) {
        tracing::info!("{}", message);

        let Some(path) = &self.path else {
            return;
        };

        let line = format!("{}  {}\n", Utc::now().format("%Y-%m-%dT%H:%M:%SZ"), message);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        if let Err(e) = result {
            tracing::warn!("could not append to merge log {}: {}", path.display(), e);
        }
    }
}
