use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::Entry;

/// Append-only record file with one `path,outcome,elapsed_seconds` line per
/// finished task. Every line is synced before `append` returns.
pub struct ResultsFile {
    path: PathBuf,
    file: File,
}

impl ResultsFile {
    /// Creates (or truncates) the record file for a new run.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, entry: &Entry) -> Result<()> {
        let line = format_line(entry);
        self.file
            .write_all(line.as_bytes())
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        self.file.flush()?;
        self.file
            .sync_data()
            .with_context(|| format!("Failed to sync {}", self.path.display()))?;
        Ok(())
    }
}

/// One record line, newline-terminated.
pub fn format_line(entry: &Entry) -> String {
    let outcome = entry.outcome();
    format!(
        "{},{},{:.3}\n",
        quote_field(entry.task().label()),
        outcome.kind().as_ref(),
        outcome.elapsed_secs()
    )
}

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
