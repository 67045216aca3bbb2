use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Reconcile a download staging directory against active downloads and the
/// media archive.
#[derive(Debug, Parser)]
#[command(name = "sweep", version, about)]
pub struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run against the development tree (appends "__DEV" to every directory)
    #[arg(long)]
    pub dev: bool,

    /// Log moves and deletions without performing them
    #[arg(long)]
    pub dry_run: bool,

    /// Treat NAME as still downloading; replaces the Transmission lookup
    #[arg(long = "active", value_name = "NAME")]
    pub active: Vec<String>,

    /// Read still-downloading names from a file, one per line
    #[arg(long, value_name = "PATH")]
    pub active_file: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}
impl Args {
    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Whether active names come from the command line instead of Transmission.
    pub fn has_static_active(&self) -> bool {
        !self.active.is_empty() || self.active_file.is_some()
    }
}
