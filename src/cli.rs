//! Command line interface built on clap.
//!
//! [`Cli`] holds the [`Command`] subcommands (upload, analyze, status) and the
//! global flags that override the configured polling policy.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// scanflow: upload scanned forms and track their extraction jobs.
#[derive(Debug, Parser)]
#[command(name = "scanflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the configuration file (defaults to ./scanflow.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum number of poll rounds before giving up on a job.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Delay between poll rounds, in milliseconds.
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,

    /// Print the final result as JSON instead of a progress bar and summary.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload scanned images and wait for their extraction.
    Upload {
        /// Image files to upload.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Destination folder on the backend.
        #[arg(long)]
        folder: String,
    },

    /// Re-run extraction for images already stored on the backend.
    Analyze {
        /// Image names to analyze.
        images: Vec<String>,

        /// Folder the images live in.
        #[arg(long)]
        folder: Option<String>,

        /// Analyze every image in --folder.
        #[arg(long, requires = "folder", default_value_t = false)]
        all: bool,
    },

    /// Show the current status of a single job.
    Status {
        /// Job id returned by an upload or analyze call.
        job_id: String,
    },
}
