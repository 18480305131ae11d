use std::path::PathBuf;

use anyhow::Result;
use jiff::Timestamp;

use crate::config::Config;
use crate::id::generate_run_id;
use crate::output::{Output, best_effort};
use crate::patch;
use crate::report::Report;
use crate::runner::Runner;
use crate::tasks::{self, ChangeSource};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub group: Option<String>,
    pub changes: Option<ChangeSource>,
    pub apply_patches: bool,
    pub step_summary: Option<PathBuf>,
}

/// Patches, enumerates and runs one batch, then persists the report.
///
/// Patch and enumeration failures return before any task runs.
pub fn run(config: &Config, options: RunOptions, output: &Output) -> Result<Report> {
    let run_id = generate_run_id();
    let span = tracing::info_span!("run", run_id = %run_id);
    let _guard = span.enter();

    if options.apply_patches {
        let applied = patch::apply_all(&config.patches, &config.base_dir)?;
        best_effort(output.patches_applied(applied, config.patches.len()));
    }

    let (mode, tasks) =
        tasks::enumerate(config, options.group.as_deref(), options.changes.as_ref())?;

    let started_at = Timestamp::now();
    best_effort(output.run_started(&run_id, tasks.len()));

    let runner = Runner::from_config(config);
    let count = tasks.len();
    let summary = runner.run(&tasks, |position, entry, summary| {
        output.task_finished(position, count, entry, summary)
    })?;

    let report = Report::new(
        run_id,
        options.group,
        mode,
        runner.timeout(),
        started_at,
        summary,
    );
    report.write_file(&config.report_path())?;

    if let Some(path) = &options.step_summary {
        report.append_markdown(path)?;
    }

    Ok(report)
}
