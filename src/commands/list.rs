use anyhow::Result;

use crate::config::Config;
use crate::models::Task;
use crate::tasks::{self, ChangeSource};

pub fn run(
    config: &Config,
    group: Option<&str>,
    changes: Option<&ChangeSource>,
) -> Result<Vec<Task>> {
    let (_, tasks) = tasks::enumerate(config, group, changes)?;
    Ok(tasks)
}
