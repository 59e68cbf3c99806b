// Firefox History Merge Tool - Entry Point
// Merges the browsing history of a source places.sqlite into a target one

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use places_merge::logging;
use places_merge::merge::{
    AutoConfirm, ConfirmationGate, MergeConfig, MergeEngine, MergeError, MergeReport,
    ProgressObserver,
};

/// Merge two Firefox places.sqlite history databases into one
#[derive(Parser)]
#[command(name = "places-merge", version)]
struct Cli {
    /// The history database to merge into (will be modified)
    target: PathBuf,

    /// The history database to merge from (read-only)
    source: PathBuf,

    /// Directory for the pre-merge backup (default: next to the target)
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Skip the VACUUM / optimize pass before merging
    #[arg(long)]
    skip_vacuum: bool,

    /// Answer yes to the confirmation prompt (non-interactive runs)
    #[arg(short, long)]
    yes: bool,

    /// Append merge lifecycle events to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the merge report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

/// Confirmation gate backed by a yes/no question on stdin
struct StdinGate;

impl ConfirmationGate for StdinGate {
    fn confirm(&mut self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }

        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// Progress observer that logs coarse checkpoints through tracing
struct TracingProgress {
    next_report: usize,
}

impl TracingProgress {
    const STEP: usize = 5000;

    fn new() -> Self {
        Self {
            next_report: Self::STEP,
        }
    }
}

impl ProgressObserver for TracingProgress {
    fn on_progress(&mut self, processed: usize, total: usize) {
        if processed >= self.next_report || processed == total {
            tracing::info!("migrated {}/{} visits", processed, total);
            self.next_report = processed + Self::STEP;
        }
    }
}

/// Prints the human-readable summary of a committed merge
fn print_summary(report: &MergeReport) {
    println!("Merge committed.");
    println!("  Backup:          {}", report.backup_path.display());
    println!("  Id offset:       {}", report.offset);
    println!("  Places inserted: {}", report.places_inserted);
    println!(
        "  Visits:          {} migrated of {} in source",
        report.visits.migrated, report.visits.source_total
    );
    if report.visits.duplicate_rows > 0 {
        println!(
            "  Duplicates:      {} collapsed",
            report.visits.duplicate_rows
        );
    }
    if report.visits.unresolved_place > 0 {
        println!(
            "  Excluded:        {} visits with unresolvable places",
            report.visits.unresolved_place
        );
    }
    if report.visits.id_collisions > 0 {
        println!(
            "  Id collisions:   {} rows skipped",
            report.visits.id_collisions
        );
    }
}

fn main() -> ExitCode {
    logging::init();

    let cli = Cli::parse();

    let config = MergeConfig {
        target_path: cli.target,
        source_path: cli.source,
        backup_dir: cli.backup_dir,
        skip_vacuum: cli.skip_vacuum,
        log_path: cli.log_file,
    };

    let mut engine = MergeEngine::new(config);
    let mut gate: Box<dyn ConfirmationGate> = if cli.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(StdinGate)
    };
    let mut progress = TracingProgress::new();

    match engine.run(gate.as_mut(), &mut progress) {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Could not serialize report: {}", e);
                        return ExitCode::from(1);
                    }
                }
            } else {
                print_summary(&report);
            }
            ExitCode::SUCCESS
        }
        Err(MergeError::Declined) => {
            eprintln!("Merge aborted; target left unmodified.");
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("Merge failed in phase '{}': {}", engine.phase(), e);
            eprintln!("Target left as it was before the run.");
            ExitCode::from(1)
        }
    }
}
