/**
 * Batch engine: file enumeration, bounded worker pool and outcome tallying
 */

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default worker pool width for I/O bound per-file work.
pub const DEFAULT_WORKERS: usize = 5;

/// Terminal classification of one file in one pass. Exactly one per file,
/// never retried within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Updated,
    Skipped,
    Failed,
}

/// Why a file was left untouched. Surfaced at debug verbosity only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    IneligiblePattern,
    IneligibleExtension,
    AlreadyRenamed,
    AlreadyWritten,
    ForeignDescription,
    NoMatchingPrefix,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SkipReason::IneligiblePattern => "is not in the list of acceptable file patterns",
            SkipReason::IneligibleExtension => "not an allowed extension",
            SkipReason::AlreadyRenamed => "seems to already be renamed",
            SkipReason::AlreadyWritten => "description already written",
            SkipReason::ForeignDescription => "existing description was not written by us",
            SkipReason::NoMatchingPrefix => "no matching prefix in description",
        };
        write!(f, "{}", msg)
    }
}

/// Counts of each outcome over one batch. Exists only for one invocation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Updated => self.updated += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    /// Combine two partial summaries. Associative, so per-worker tallies can
    /// be reduced in any order.
    pub fn merge(self, other: RunSummary) -> RunSummary {
        RunSummary {
            updated: self.updated + other.updated,
            skipped: self.skipped + other.skipped,
            failed: self.failed + other.failed,
        }
    }

    pub fn total(&self) -> usize {
        self.updated + self.skipped + self.failed
    }
}

/// Recursively enumerate every regular file under `root`.
///
/// Extension/pattern filtering is the engines' job, not the enumerator's.
/// A missing or non-directory root is a setup failure and aborts the run.
pub fn enumerate_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        anyhow::bail!(
            "Root directory does not exist or is not a directory: {}",
            root.display()
        );
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    Ok(files)
}

/// Drives one derivation+apply pass over a file set with a bounded worker
/// pool. Files are processed independently; one file's failure never aborts
/// the batch.
pub struct BatchRunner {
    workers: usize,
}

impl BatchRunner {
    pub fn new(workers: Option<usize>) -> Self {
        let workers = workers
            .unwrap_or_else(|| DEFAULT_WORKERS.min(num_cpus::get().max(1)))
            .max(1);
        Self { workers }
    }

    /// Apply `op` to every file, tallying outcomes into a single summary.
    pub fn run<F>(&self, files: &[PathBuf], op: F) -> Result<RunSummary>
    where
        F: Fn(&Path) -> Outcome + Sync,
    {
        info!(
            "Processing {} files with {} workers (CPUs: {})",
            files.len(),
            self.workers,
            num_cpus::get()
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("pathtag-worker-{}", i))
            .build()
            .context("Failed to build worker pool")?;

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec:.1} files/s) ETA: {eta} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_message("Processing files");

        let summary = pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    let outcome = op(path);
                    pb.inc(1);
                    outcome
                })
                .fold(RunSummary::default, |mut acc, outcome| {
                    acc.record(outcome);
                    acc
                })
                .reduce(RunSummary::default, RunSummary::merge)
        });

        pb.finish_with_message("Batch complete");
        Ok(summary)
    }
}
