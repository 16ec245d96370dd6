use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::path::PathBuf;

use pathtag_rs::batch::{enumerate_files, BatchRunner, RunSummary};
use pathtag_rs::describe::{Describer, DescribeConfig, DEFAULT_PREFIX};
use pathtag_rs::metadata::ExiftoolGateway;
use pathtag_rs::rename::{RenameConfig, Renamer};

#[derive(Parser)]
#[command(name = "pathtag-rs")]
#[command(version)]
#[command(about = "Image file renamer and EXIF description writer based on directory structure")]
#[command(long_about = "Makes photo libraries self-describing and sortable by deriving metadata \
from each file's directory path.

The describe command writes (or cleans) the EXIF Description field of .jpg \
files via exiftool, composing the text from the path below the root. The \
rename command prefixes camera-default filenames (IMG_*, DSCN*, 839A*, MVI_*) \
with cleaned directory tokens. Both passes are idempotent: files already in \
canonical form are skipped, and a dry run reports the same counts as a live \
run would.")]
struct Cli {
    /// Increase verbosity (-v=INFO, -vv=DEBUG, -vvv=TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Dry run (don't write any changes)
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    /// Number of parallel workers (default: 5, capped at CPU count)
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Action {
    /// Write descriptions derived from the directory structure
    Write,
    /// Remove descriptions previously written by this tool
    Clean,
}

#[derive(Subcommand)]
enum Commands {
    /// Write or clean the EXIF Description field based on directory structure
    Describe {
        /// Write or clean the metadata on the files
        #[arg(value_enum)]
        action: Action,
        /// The root directory which to recurse through
        dir: PathBuf,
        /// Force rewriting of existing descriptions
        #[arg(short, long)]
        force: bool,
        /// The string with which to prepend the descriptions
        #[arg(long, default_value = DEFAULT_PREFIX)]
        prefix: String,
        /// An alternative prefix which to search for as safe to replace
        #[arg(long)]
        existing_prefix: Option<String>,
        /// Path to the exiftool executable
        #[arg(long, default_value = "exiftool")]
        exiftool: PathBuf,
    },
    /// Rename files based on their directory structure
    Rename {
        /// The root directory which to recurse through
        dir: PathBuf,
        /// Include the root directory in the naming
        #[arg(long)]
        include_root: bool,
        /// Do not restrict renaming to camera-default filename patterns
        #[arg(short, long)]
        all_files: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet)?;

    if cli.dry_run {
        info!("Running in DRY RUN mode. No files will be modified.");
    }

    match cli.command {
        Commands::Describe {
            action,
            dir,
            force,
            prefix,
            existing_prefix,
            exiftool,
        } => run_describe(
            action,
            dir,
            force,
            prefix,
            existing_prefix,
            exiftool,
            cli.dry_run,
            cli.workers,
        ),
        Commands::Rename {
            dir,
            include_root,
            all_files,
        } => run_rename(dir, include_root, all_files, cli.dry_run, cli.workers),
    }
}

fn setup_logging(verbosity: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        log::LevelFilter::Error
    } else {
        match verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_describe(
    action: Action,
    dir: PathBuf,
    force: bool,
    prefix: String,
    existing_prefix: Option<String>,
    exiftool: PathBuf,
    dry_run: bool,
    workers: Option<usize>,
) -> Result<()> {
    let files = enumerate_files(&dir)?;
    info!("Found {} files in {}", files.len(), dir.display());

    let gateway = ExiftoolGateway::with_executable(exiftool);
    gateway
        .probe()
        .context("exiftool is required for the describe command")?;

    let describer = Describer::new(
        DescribeConfig {
            root: dir,
            prefix,
            existing_prefix,
            force,
            dry_run,
        },
        &gateway,
    );

    let runner = BatchRunner::new(workers);
    let summary = match action {
        Action::Write => runner.run(&files, |path| describer.process_write(path))?,
        Action::Clean => runner.run(&files, |path| describer.process_clean(path))?,
    };

    print_summary(&summary, dry_run);
    Ok(())
}

fn run_rename(
    dir: PathBuf,
    include_root: bool,
    all_files: bool,
    dry_run: bool,
    workers: Option<usize>,
) -> Result<()> {
    let files = enumerate_files(&dir)?;
    info!("Found {} files in {}", files.len(), dir.display());

    let renamer = Renamer::new(RenameConfig {
        root: dir,
        include_root,
        all_files,
        dry_run,
    })?;

    let runner = BatchRunner::new(workers);
    let summary = runner.run(&files, |path| renamer.process(path))?;

    print_summary(&summary, dry_run);
    Ok(())
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    let tag = if dry_run { "[DRY RUN] Updated" } else { "Updated" };
    info!(
        "{} {} files, Skipped {} files, Failed {}",
        tag, summary.updated, summary.skipped, summary.failed
    );

    println!("\nProcessing complete!");
    println!("Files processed: {}", summary.total());
    println!("Files updated: {}", summary.updated);
    println!("Files skipped: {}", summary.skipped);
    println!("Failures: {}", summary.failed);
}
