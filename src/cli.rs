use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "navsync")]
#[command(about = "Keeps a flight-planning reference store in sync with 28-day cycle data", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch the current and next cycles and merge them into the store.
    Update(UpdateArgs),

    /// Print the cycle identifier and effective dates for a date.
    Cycle {
        /// Date to resolve (YYYY-MM-DD). Default: today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Args)]
pub(crate) struct UpdateArgs {
    /// Directory holding the merged output files.
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,

    /// Archive cache directory. Default: <data-dir>/cache
    #[arg(long)]
    pub(crate) cache_dir: Option<PathBuf>,

    /// Backup directory. Default: <data-dir>/backups
    #[arg(long)]
    pub(crate) backup_dir: Option<PathBuf>,

    /// Change-report directory. Default: <data-dir>/reports
    #[arg(long)]
    pub(crate) report_dir: Option<PathBuf>,

    /// Base URL for cycle archives.
    #[arg(long)]
    pub(crate) base_url: Option<String>,

    /// Run as of this date (YYYY-MM-DD) instead of today.
    #[arg(long)]
    pub(crate) date: Option<NaiveDate>,

    /// Re-download archives even when a cached copy exists.
    #[arg(long)]
    pub(crate) force: bool,

    /// Skip the pre-write backup pass.
    #[arg(long)]
    pub(crate) no_backup: bool,

    /// Process only the current cycle, not the next.
    #[arg(long)]
    pub(crate) current_only: bool,

    /// Backup generations to keep per file.
    #[arg(long, default_value_t = 2)]
    pub(crate) keep: usize,

    /// Run every stage but skip backups, store writes, and reports.
    #[arg(long)]
    pub(crate) dry_run: bool,

    /// Debug-level logging.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}
