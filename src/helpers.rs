use std::path::Path;

use strsim::levenshtein;

/// Find the most similar name from a list of candidates
pub fn find_similar_name<'a>(target: &str, candidates: &'a [String]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|candidate| (candidate.as_str(), levenshtein(target, candidate)))
        .filter(|(_, distance)| *distance <= 2)
        .min_by_key(|(_, distance)| *distance)
        .map(|(name, _)| name)
}

/// Names of the subdirectories of `dir`, sorted. Unreadable directories yield nothing.
pub fn subdirectory_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
        .collect();
    names.sort();
    names
}

/// Reads a task log, replacing invalid UTF-8. Unreadable logs yield an empty string.
pub fn read_log_lossy(path: &Path) -> String {
    std::fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Last `count` lines of `text`.
pub fn tail_lines(text: &str, count: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_similar_name() {
        let candidates = vec![
            "basics".to_string(),
            "advanced".to_string(),
            "plotting".to_string(),
        ];

        assert_eq!(find_similar_name("basic", &candidates), Some("basics"));

        assert_eq!(find_similar_name("advnced", &candidates), Some("advanced"));

        // Very different name should return None
        assert_eq!(find_similar_name("zzzzz", &candidates), None);
    }

    #[test]
    fn test_subdirectory_names() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("beta")).unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();
        std::fs::write(dir.path().join("file.py"), "").unwrap();

        assert_eq!(subdirectory_names(dir.path()), ["alpha", "beta"]);
        assert!(subdirectory_names(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn test_read_log_lossy_keeps_valid_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("binary.log");
        std::fs::write(&path, b"before\n\xff\xfe garbage\nTraceback: boom\n").unwrap();

        let text = read_log_lossy(&path);
        assert_eq!(tail_lines(&text, 1), ["Traceback: boom"]);
        assert!(text.starts_with("before\n"));
        assert_eq!(read_log_lossy(&dir.path().join("missing.log")), "");
    }

    #[test]
    fn test_tail_lines() {
        assert_eq!(tail_lines("a\nb\nc\n", 2), ["b", "c"]);
        assert_eq!(tail_lines("a\nb", 10), ["a", "b"]);
        assert!(tail_lines("", 3).is_empty());
        assert!(tail_lines("a\nb", 0).is_empty());
    }
}
