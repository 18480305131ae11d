#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod helpers;
pub mod id;
pub mod models;
pub mod output;
pub mod patch;
pub mod report;
pub mod results;
pub mod runner;
pub mod tasks;

use anyhow::{Context, Result};

use cli::{Cli, Commands};
use commands::init::InitResult;
use commands::run::RunOptions;
use config::Overrides;
use output::{Output, best_effort};
use tasks::ChangeSource;

/// Exit status for hard errors: configuration, enumeration or I/O failures.
pub const ERROR_EXIT_CODE: u8 = 255;

/// Runs the parsed command and returns the process exit status.
pub fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Init { force, ignore_logs } => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            let output = Output::new(false);
            match commands::init::run(&cwd, force, ignore_logs)? {
                InitResult::Created(path) => output.initialized(&path)?,
                InitResult::AlreadyExists(path) => output.already_initialized(&path)?,
            }
            Ok(0)
        }
        Commands::List {
            group,
            changed,
            config: config_path,
            json,
        } => {
            let config = config::load(config_path.as_deref(), &Overrides::default())?;
            let changes = changed.as_deref().map(ChangeSource::from_arg);
            let tasks = commands::list::run(&config, group.as_deref(), changes.as_ref())?;
            Output::new(json).task_list(&tasks)?;
            Ok(0)
        }
        Commands::Run {
            group,
            changed,
            timeout,
            log_dir,
            no_patch,
            step_summary,
            config: config_path,
            json,
        } => {
            let overrides = Overrides {
                timeout_secs: timeout,
                log_dir,
            };
            let config = config::load(config_path.as_deref(), &overrides)?;
            let output = Output::with_tail(json, config.tail_lines);
            let options = RunOptions {
                group,
                changes: changed.as_deref().map(ChangeSource::from_arg),
                apply_patches: !no_patch,
                step_summary,
            };

            let report = commands::run::run(&config, options, &output)?;
            best_effort(output.run_finished(&report));
            Ok(report.summary.exit_code())
        }
    }
}
