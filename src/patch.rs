use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::config::Patch;

/// Applies each patch to its target file in order. Returns the number of
/// patches that changed something. A missing target is an error; text that
/// does not occur is skipped with a warning.
pub fn apply_all(patches: &[Patch], base_dir: &Path) -> Result<usize> {
    let mut applied = 0;

    for patch in patches {
        let path = base_dir.join(&patch.path);
        if !path.is_file() {
            bail!("Patch target not found: {}", path.display());
        }
        if patch.find.is_empty() {
            bail!("Patch for {} has an empty `find` text", path.display());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let occurrences = content.matches(patch.find.as_str()).count();
        if occurrences == 0 {
            tracing::warn!(path = %path.display(), find = %patch.find, "patch text not found, skipping");
            continue;
        }

        let patched = content.replace(&patch.find, &patch.replace);
        std::fs::write(&path, patched)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), occurrences, "applied patch");
        applied += 1;
    }

    Ok(applied)
}
