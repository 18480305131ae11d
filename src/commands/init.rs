use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use crate::config::{CONFIG_FILE, DEFAULT_LOG_DIR, default_file_contents, parse};

#[derive(Debug, PartialEq, Eq)]
pub enum InitResult {
    Created(PathBuf),
    AlreadyExists(PathBuf),
}

pub fn run(dir: &Path, force: bool, ignore_logs: bool) -> Result<InitResult> {
    let config_path = dir.join(CONFIG_FILE);

    let result = if config_path.exists() && !force {
        InitResult::AlreadyExists(config_path)
    } else {
        fs::write(&config_path, default_file_contents())
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        InitResult::Created(config_path)
    };

    if ignore_logs {
        let log_dir = configured_log_dir(&result)?;
        match exclusion_entry(dir, &log_dir) {
            Some(entry) => add_to_gitignore(dir, &entry)?,
            None => tracing::warn!(
                log_dir = %log_dir.display(),
                "log directory is outside the project, not adding a git exclusion"
            ),
        }
    }

    Ok(result)
}

/// The `log_dir` of the config `init` left in place.
fn configured_log_dir(result: &InitResult) -> Result<PathBuf> {
    match result {
        InitResult::Created(_) => Ok(PathBuf::from(DEFAULT_LOG_DIR)),
        InitResult::AlreadyExists(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file = parse(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(file.log_dir)
        }
    }
}

/// Relative, slash-separated form of `log_dir` for an exclusion file.
fn exclusion_entry(dir: &Path, log_dir: &Path) -> Option<String> {
    let relative = if log_dir.is_absolute() {
        log_dir.strip_prefix(dir).ok()?
    } else {
        log_dir
    };
    if relative.components().any(|c| matches!(c, Component::ParentDir)) {
        return None;
    }

    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Adds `entry` to git exclusions.
/// Prefers `.git/info/exclude` if it exists (truly local), otherwise uses `.gitignore`.
fn add_to_gitignore(dir: &Path, entry: &str) -> Result<()> {
    let exclude_path = dir.join(".git/info/exclude");
    let gitignore_path = dir.join(".gitignore");

    let target_path = if exclude_path.exists() {
        exclude_path
    } else if gitignore_path.exists() || dir.join(".git").is_dir() {
        gitignore_path
    } else {
        // Not a git repo
        return Ok(());
    };

    let content = fs::read_to_string(&target_path).unwrap_or_default();
    let with_slash = format!("{entry}/");
    if content
        .lines()
        .any(|line| line.trim() == entry || line.trim() == with_slash)
    {
        return Ok(());
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&target_path)
        .context("Failed to open git exclusion file")?;

    if !content.is_empty() && !content.ends_with('\n') {
        writeln!(file)?;
    }

    writeln!(file, "{with_slash}")?;
    tracing::info!(path = %target_path.display(), entry, "added log directory to git exclusions");

    Ok(())
}
