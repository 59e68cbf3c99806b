// Backup Service
// Byte-for-byte copy of the target store before any mutation

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;

/// Copies the target database to a timestamped backup path
///
/// The backup lands in `backup_dir` when given, otherwise next to the
/// target file. The directory is created if needed. Returns the path of
/// the new backup. A failure here must abort the merge before the core
/// runs; the caller owns that policy.
pub fn create_backup(target: &Path, backup_dir: Option<&Path>) -> io::Result<PathBuf> {
    let dir = match backup_dir {
        Some(dir) => dir.to_path_buf(),
        None => target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    fs::create_dir_all(&dir)?;

    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("places.sqlite");
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let backup_path = dir.join(format!("{}.{}.bak", file_name, stamp));

    fs::copy(target, &backup_path)?;

    Ok(backup_path)
}
