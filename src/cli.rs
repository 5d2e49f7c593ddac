//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use tunefetch::MAX_RETRIES;

/// Download music tracks sequentially with retry and tag extraction.
///
/// Tunefetch queues the given URLs, transfers them one at a time into the
/// music directory, and extracts tags and album art from each completed
/// file.
#[derive(Parser, Debug)]
#[command(name = "tunefetch")]
#[command(author, version, about)]
pub struct Args {
    /// Track URLs to download (or pipe them via stdin)
    pub urls: Vec<String>,

    /// Directory downloaded tracks are written into
    #[arg(short = 'o', long, default_value = "./music")]
    pub output_dir: PathBuf,

    /// Maximum transfer attempts per track (1-10)
    #[arg(short = 'r', long, default_value_t = MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: u8,

    /// Print the final queue status and per-track results as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
