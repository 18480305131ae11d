use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::config::Config;
use crate::helpers::{find_similar_name, subdirectory_names};
use crate::models::Task;

/// How the task list for a run is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TriggerMode {
    FullScan,
    ChangeList,
}

/// Where a change list is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSource {
    Stdin,
    File(PathBuf),
}

impl ChangeSource {
    /// `-` selects stdin, anything else is a file path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(arg))
        }
    }

    pub fn read(&self) -> Result<String> {
        match self {
            Self::Stdin => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read change list from stdin")?;
                Ok(buf)
            }
            Self::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read change list {}", path.display())),
        }
    }
}

/// Produces the ordered task list for `group`, either by scanning its
/// directory or by filtering a change list.
pub fn enumerate(
    config: &Config,
    group: Option<&str>,
    changes: Option<&ChangeSource>,
) -> Result<(TriggerMode, Vec<Task>)> {
    let tasks = match changes {
        None => (TriggerMode::FullScan, scan_group(config, group)?),
        Some(source) => {
            let text = source.read()?;
            (TriggerMode::ChangeList, filter_change_list(config, group, &text))
        }
    };

    tracing::debug!(
        mode = tasks.0.as_ref(),
        group = group.unwrap_or("<root>"),
        count = tasks.1.len(),
        "enumerated tasks"
    );
    Ok(tasks)
}

/// Lists the matching files directly inside the group directory, sorted.
pub fn scan_group(config: &Config, group: Option<&str>) -> Result<Vec<Task>> {
    let dir = config.group_dir(group);

    if !dir.is_dir() {
        return Err(missing_group_error(config, group, &dir));
    }

    let entries =
        std::fs::read_dir(&dir).with_context(|| format!("Failed to read {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if path.is_file() && has_extension(&path, &config.extension) {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| Task::new(path, &config.base_dir))
        .collect())
}

/// Keeps the change-list entries that are existing files under the group
/// directory with the configured extension. Paths are relative to the
/// config's base directory. The result is sorted and deduplicated.
pub fn filter_change_list(config: &Config, group: Option<&str>, text: &str) -> Vec<Task> {
    let dir = config.group_dir(group);

    let paths: BTreeSet<PathBuf> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Path::new)
        .filter(|line| {
            // `starts_with` is lexical, so `..` could step out of the group.
            let escapes = line.components().any(|c| matches!(c, Component::ParentDir));
            if escapes {
                tracing::debug!(path = %line.display(), "skipping change-list entry with `..`");
            }
            !escapes
        })
        .map(|line| config.base_dir.join(line.strip_prefix("./").unwrap_or(line)))
        .filter(|path| path.starts_with(&dir) && has_extension(path, &config.extension))
        .filter(|path| {
            let exists = path.is_file();
            if !exists {
                tracing::debug!(path = %path.display(), "skipping change-list entry that no longer exists");
            }
            exists
        })
        .collect();

    paths
        .into_iter()
        .map(|path| Task::new(path, &config.base_dir))
        .collect()
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension() == Some(OsStr::new(extension))
}

fn missing_group_error(config: &Config, group: Option<&str>, dir: &Path) -> anyhow::Error {
    let Some(group) = group else {
        return anyhow!("Task root not found: {}", dir.display());
    };

    let candidates = subdirectory_names(&config.root);
    if let Some(suggestion) = find_similar_name(group, &candidates) {
        anyhow!(
            "Task group not found: {group} ({})\nDid you mean: {suggestion}",
            dir.display()
        )
    } else {
        anyhow!("Task group not found: {group} ({})", dir.display())
    }
}
