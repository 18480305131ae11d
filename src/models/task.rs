use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A single script to execute as part of a batch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Task {
    /// Path shown to operators and written to the summary record.
    label: String,
    /// Path used to spawn the script.
    path: PathBuf,
}

impl Task {
    /// Builds a task for `path`, labelled relative to `base` when it lies under it.
    pub fn new(path: PathBuf, base: &Path) -> Self {
        let label = path
            .strip_prefix(base)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        Self { label, path }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The script's file name, e.g. `intro.py`.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.label)
    }

    /// Log file name derived from the script's base name: `intro.py` -> `intro.log`.
    pub fn log_file_name(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.label.replace(['/', '\\'], "_"));
        format!("{stem}.log")
    }
}
