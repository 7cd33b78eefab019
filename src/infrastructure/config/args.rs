use super::app_config::LogLevel;
use crate::domain::entities::KeyStrategy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments; any flag given overrides the config file.
#[derive(Debug, Parser)]
#[command(
    name = "oxicache",
    version,
    about = "Tiered memory, disk and network image cache",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Disk cache directory.
    #[arg(long, value_name = "DIR", env = "OXICACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Maximum number of decoded images kept in memory.
    #[arg(long)]
    pub memory_capacity: Option<usize>,

    /// How addresses map to cache keys.
    #[arg(long, value_enum)]
    pub key_strategy: Option<KeyStrategy>,

    /// Origin request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Action to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of the binary.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve URLs through the cache and report where each came from.
    Fetch {
        /// Image addresses.
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Show disk tier usage.
    Stats,
    /// Remove every disk tier entry.
    Purge,
}
