use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "br")]
#[command(about = "Run a batch of scripts under a timeout and report the results", long_about = None)]
pub struct Cli {
    /// Increase diagnostic logging (-v for debug, -vv for trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter batchrun.toml in the current directory
    Init {
        /// Overwrite an existing batchrun.toml
        #[arg(long)]
        force: bool,

        /// Exclude the log directory from git (adds it to .git/info/exclude or .gitignore)
        #[arg(long)]
        ignore_logs: bool,
    },

    /// Show the tasks a run would execute, without running them
    List {
        /// Task group (subdirectory of the configured root) to scan
        group: Option<String>,

        /// Only tasks named in this change list (one path per line, `-` for stdin)
        #[arg(long, value_name = "FILE")]
        changed: Option<String>,

        /// Path to batchrun.toml (default: search upward from the current directory)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every task in a group and exit with the number of failures
    Run {
        /// Task group (subdirectory of the configured root) to scan
        group: Option<String>,

        /// Only run tasks named in this change list (one path per line, `-` for stdin)
        #[arg(long, value_name = "FILE")]
        changed: Option<String>,

        /// Per-task timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Directory for per-task logs, summary.csv and report.json
        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,

        /// Skip the configured source patches
        #[arg(long)]
        no_patch: bool,

        /// Append a Markdown summary to this file (e.g. $GITHUB_STEP_SUMMARY)
        #[arg(long, value_name = "PATH")]
        step_summary: Option<PathBuf>,

        /// Path to batchrun.toml (default: search upward from the current directory)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Print the final report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}
