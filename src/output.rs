use anyhow::Result;
use console::{Style, Term, style};
use serde::Serialize;

use crate::helpers::{read_log_lossy, tail_lines};
use crate::models::{Entry, OutcomeKind, Summary, Task};
use crate::report::Report;

pub struct Output {
    term: Term,
    progress: Term,
    json: bool,
    tail_lines: usize,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self {
            term: Term::stdout(),
            // Keep stdout clean for the JSON document.
            progress: if json { Term::stderr() } else { Term::stdout() },
            json,
            tail_lines: 0,
        }
    }

    pub fn with_tail(json: bool, tail_lines: usize) -> Self {
        Self {
            tail_lines,
            ..Self::new(json)
        }
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let output = serde_json::to_string_pretty(value)?;
        self.term.write_line(&output)?;
        Ok(())
    }

    pub fn initialized(&self, path: &std::path::Path) -> Result<()> {
        self.term.write_line(&format!(
            "{} {}",
            style("Created config:").green(),
            style(path.display()).cyan().bold()
        ))?;
        Ok(())
    }

    pub fn already_initialized(&self, path: &std::path::Path) -> Result<()> {
        self.term.write_line(&format!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        ))?;
        Ok(())
    }

    pub fn task_list(&self, tasks: &[Task]) -> Result<()> {
        if self.json {
            let labels: Vec<&str> = tasks.iter().map(Task::label).collect();
            return self.print_json(&labels);
        }

        if tasks.is_empty() {
            self.term.write_line("No tasks found.")?;
            return Ok(());
        }

        for task in tasks {
            self.term.write_line(task.label())?;
        }
        self.term.write_line("")?;
        self.term.write_line(&format!(
            "{} task(s)",
            style(tasks.len()).green().bold()
        ))?;
        Ok(())
    }

    pub fn run_started(&self, run_id: &str, count: usize) -> Result<()> {
        self.progress.write_line(&format!(
            "Run {}: {} task(s)",
            style(run_id).cyan().bold(),
            count
        ))?;
        Ok(())
    }

    pub fn patches_applied(&self, applied: usize, configured: usize) -> Result<()> {
        if configured == 0 {
            return Ok(());
        }
        self.progress.write_line(&format!(
            "Applied {applied} of {configured} patch(es)"
        ))?;
        Ok(())
    }

    /// One tally line per finished task, plus the log tail for non-passing tasks.
    pub fn task_finished(
        &self,
        position: usize,
        count: usize,
        entry: &Entry,
        summary: &Summary,
    ) -> Result<()> {
        let outcome = entry.outcome();
        let word = format!("{:<7}", outcome.kind().as_ref());
        self.progress.write_line(&format!(
            "[{position}/{count}] {} {} ({:.1}s)  passed={} failed={}",
            outcome_style(outcome.kind()).apply_to(word),
            entry.task().label(),
            outcome.elapsed_secs(),
            summary.passed(),
            summary.failed()
        ))?;

        if outcome.kind().is_pass() || self.tail_lines == 0 {
            return Ok(());
        }

        let log = read_log_lossy(outcome.log_path());
        let tail = tail_lines(&log, self.tail_lines);
        if !tail.is_empty() {
            let text = tail.join("\n");
            self.progress
                .write_line(&style(textwrap::indent(&text, "    │ ")).dim().to_string())?;
        }
        self.progress.write_line(&format!(
            "    log: {}",
            style(outcome.log_path().display()).dim()
        ))?;
        Ok(())
    }

    /// Final line, always printed: `N of M passed`.
    pub fn run_finished(&self, report: &Report) -> Result<()> {
        let summary = &report.summary;
        let tally = if summary.is_success() {
            style(summary.tally_line()).green().bold()
        } else {
            style(summary.tally_line()).red().bold()
        };

        self.progress.write_line("")?;
        if summary.timed_out() > 0 {
            self.progress.write_line(&format!(
                "{tally} ({} timed out)",
                summary.timed_out()
            ))?;
        } else {
            self.progress.write_line(&tally.to_string())?;
        }

        if self.json {
            return self.print_json(report);
        }
        Ok(())
    }
}

/// Progress and summary lines never change a batch's outcome: a closed
/// stream is logged and otherwise ignored.
pub fn best_effort(result: Result<()>) {
    if let Err(error) = result {
        tracing::warn!(error = %format!("{error:#}"), "failed to write output");
    }
}

fn outcome_style(kind: OutcomeKind) -> Style {
    match kind {
        OutcomeKind::Passed => Style::new().green(),
        OutcomeKind::Failed => Style::new().red(),
        OutcomeKind::TimedOut => Style::new().yellow(),
    }
}
