use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "batchrun.toml";

pub const DEFAULT_EXTENSION: &str = "py";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_LOG_DIR: &str = "batch-logs";
pub const DEFAULT_TAIL_LINES: usize = 20;

/// A literal text substitution applied to a script before the batch starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub path: PathBuf,
    pub find: String,
    pub replace: String,
}

/// Contents of `batchrun.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub root: PathBuf,
    pub extension: String,
    pub timeout_secs: u64,
    pub interpreter: Vec<String>,
    pub log_dir: PathBuf,
    pub tail_lines: usize,
    #[serde(rename = "patch", skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<Patch>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extension: DEFAULT_EXTENSION.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            interpreter: Vec::new(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            tail_lines: DEFAULT_TAIL_LINES,
            patches: Vec::new(),
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub timeout_secs: Option<u64>,
    pub log_dir: Option<PathBuf>,
}

/// Fully resolved settings: paths are absolute against `base_dir`.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_dir: PathBuf,
    pub root: PathBuf,
    pub extension: String,
    pub timeout: Duration,
    pub interpreter: Vec<String>,
    pub log_dir: PathBuf,
    pub tail_lines: usize,
    pub patches: Vec<Patch>,
}

impl Config {
    pub fn summary_path(&self) -> PathBuf {
        self.log_dir.join("summary.csv")
    }

    pub fn report_path(&self) -> PathBuf {
        self.log_dir.join("report.json")
    }

    /// Directory holding the selected task group, or the root when none is selected.
    pub fn group_dir(&self, group: Option<&str>) -> PathBuf {
        match group {
            Some(group) => self.root.join(group),
            None => self.root.clone(),
        }
    }
}

/// Finds `batchrun.toml` by walking up from `start`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = start;

    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }

        dir = dir.parent()?;
    }
}

/// Loads settings from an explicit path, a discovered `batchrun.toml`, or
/// defaults rooted at the working directory, then applies `overrides`.
pub fn load(explicit: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;

    let config_path = match explicit {
        Some(path) => {
            if !path.is_file() {
                bail!("Config file not found: {}", path.display());
            }
            Some(cwd.join(path))
        }
        None => find_config_file(&cwd),
    };

    let (file, base_dir) = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file = parse(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            let base_dir = path.parent().map_or_else(|| cwd.clone(), Path::to_path_buf);
            tracing::debug!(config = %path.display(), "loaded config file");
            (file, base_dir)
        }
        None => (FileConfig::default(), cwd.clone()),
    };

    let log_dir = match &overrides.log_dir {
        Some(dir) => cwd.join(dir),
        None => base_dir.join(&file.log_dir),
    };

    resolve(file, base_dir, log_dir, overrides.timeout_secs)
}

pub fn parse(content: &str) -> Result<FileConfig> {
    Ok(toml::from_str(content)?)
}

fn resolve(
    file: FileConfig,
    base_dir: PathBuf,
    log_dir: PathBuf,
    timeout_override: Option<u64>,
) -> Result<Config> {
    let timeout_secs = timeout_override.unwrap_or(file.timeout_secs);
    if timeout_secs == 0 {
        bail!("Timeout must be a positive number of seconds");
    }

    let extension = file.extension.trim_start_matches('.').to_string();
    if extension.is_empty() {
        bail!("Extension filter must not be empty");
    }

    Ok(Config {
        root: base_dir.join(&file.root),
        extension,
        timeout: Duration::from_secs(timeout_secs),
        interpreter: file.interpreter,
        log_dir,
        tail_lines: file.tail_lines,
        patches: file.patches,
        base_dir,
    })
}

/// Commented starter config written by `br init`.
pub fn default_file_contents() -> &'static str {
    r#"# batchrun configuration. Paths are relative to this file.

# Directory holding task groups (subdirectories selected with `br run <group>`).
root = "."

# Only files with this extension are treated as tasks.
extension = "py"

# Wall-clock limit per task, in seconds.
timeout_secs = 600

# Command prefix used to run each script. Leave empty to execute scripts directly.
interpreter = ["python", "-u"]

# Where per-task logs, summary.csv and report.json are written.
log_dir = "batch-logs"

# Number of log lines echoed for failing tasks.
tail_lines = 20

# Literal substitutions applied before the batch starts.
# [[patch]]
# path = "tutorials/download.py"
# find = "epochs=100"
# replace = "epochs=1"
"#
}
