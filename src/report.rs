use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use fs2::FileExt;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::models::Summary;
use crate::tasks::TriggerMode;

/// Atomically write content to a file using a temporary file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp = path.with_extension("json.tmp");
    let mut file = File::create(&temp)
        .with_context(|| format!("Failed to create temporary file: {}", temp.display()))?;
    file.lock_exclusive()
        .context("Failed to acquire file lock")?;
    file.write_all(content)
        .context("Failed to write file content")?;
    file.sync_all().context("Failed to sync file")?;
    file.unlock().context("Failed to unlock file")?;
    fs::rename(&temp, path).with_context(|| format!("Failed to rename to {}", path.display()))?;
    Ok(())
}

/// Everything known about one batch run, persisted as `report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub mode: TriggerMode,
    pub timeout_secs: u64,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub summary: Summary,
}

impl Report {
    pub fn new(
        run_id: String,
        group: Option<String>,
        mode: TriggerMode,
        timeout: Duration,
        started_at: Timestamp,
        summary: Summary,
    ) -> Self {
        Self {
            run_id,
            group,
            mode,
            timeout_secs: timeout.as_secs(),
            started_at,
            finished_at: Timestamp::now(),
            summary,
        }
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        atomic_write(path, content.as_bytes())
    }

    /// Markdown rendering for CI step summaries.
    pub fn to_markdown(&self) -> String {
        let summary = &self.summary;
        let mut out = String::new();

        let title = match &self.group {
            Some(group) => format!("### Batch results: {group}\n\n"),
            None => "### Batch results\n\n".to_string(),
        };
        out.push_str(&title);
        out.push_str(&format!("**{}**", summary.tally_line()));
        if summary.timed_out() > 0 {
            out.push_str(&format!(" ({} timed out)", summary.timed_out()));
        }
        out.push_str("\n\n");

        if summary.entries().is_empty() {
            out.push_str("No tasks to run.\n");
            return out;
        }

        out.push_str("| Task | Outcome | Seconds |\n");
        out.push_str("|------|---------|---------|\n");
        for entry in summary.entries() {
            out.push_str(&format!(
                "| `{}` | {} | {:.1} |\n",
                entry.task().label(),
                entry.outcome().kind().as_ref(),
                entry.outcome().elapsed_secs()
            ));
        }
        out
    }

    /// Appends the Markdown rendering to `path`, creating it if needed.
    pub fn append_markdown(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open step summary {}", path.display()))?;
        writeln!(file, "{}", self.to_markdown())
            .with_context(|| format!("Failed to write step summary {}", path.display()))?;
        Ok(())
    }
}
