//! Repository snapshot - the size-capped tree listing shown to both agents

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::config::SnapshotConfig;

/// Appended when the listing was cut short
pub const TRUNCATION_MARKER: &str = "…(truncated)";

/// Produces a textual summary of a repository tree
pub trait Snapshotter: Send + Sync {
    /// Deterministic listing of `root`, never longer than `max_bytes`. A cut
    /// listing ends with [`TRUNCATION_MARKER`], shortened to a prefix when the
    /// cap is smaller than the marker itself.
    fn summarize(&self, root: &Path, max_bytes: usize) -> String;
}

/// One `path (N bytes)` line per file, skipping hidden entries and caches
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    ignore_dirs: Vec<String>,
    ignore_files: Vec<String>,
    ignore_patterns: Vec<glob::Pattern>,
}

impl TreeSnapshot {
    pub fn new(config: &SnapshotConfig) -> Self {
        let ignore_patterns = config
            .ignore_patterns
            .iter()
            .filter_map(|raw| match glob::Pattern::new(raw) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    log::warn!("Ignoring invalid snapshot pattern '{}': {}", raw, e);
                    None
                }
            })
            .collect();

        Self {
            ignore_dirs: config.ignore_dirs.clone(),
            ignore_files: config.ignore_files.clone(),
            ignore_patterns,
        }
    }

    fn is_ignored(&self, root: &Path, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return true;
        }

        let listed = if entry.file_type().is_dir() {
            &self.ignore_dirs
        } else {
            &self.ignore_files
        };
        if listed.iter().any(|n| *n == name) {
            return true;
        }

        let rel = relative(root, entry.path());
        self.ignore_patterns.iter().any(|p| p.matches(&rel))
    }
}

impl Default for TreeSnapshot {
    fn default() -> Self {
        Self::new(&SnapshotConfig::default())
    }
}

impl Snapshotter for TreeSnapshot {
    fn summarize(&self, root: &Path, max_bytes: usize) -> String {
        let mut lines: Vec<String> = Vec::new();
        // Bytes used so far, counting one separator per line
        let mut total = 0;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_ignored(root, e));

        for entry in walker.filter_map(|e| e.ok()) {
            if entry.file_type().is_dir() {
                continue;
            }
            // Follows symlinks, so dangling links drop out here
            let Ok(metadata) = std::fs::metadata(entry.path()) else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }

            let line = format!("{} ({} bytes)", relative(root, entry.path()), metadata.len());
            if total + line.len() + 1 > max_bytes {
                while !lines.is_empty() && total + TRUNCATION_MARKER.len() > max_bytes {
                    if let Some(dropped) = lines.pop() {
                        total -= dropped.len() + 1;
                    }
                }
                lines.push(marker_within(max_bytes - total).to_string());
                return lines.join("\n");
            }
            total += line.len() + 1;
            lines.push(line);
        }

        lines.join("\n")
    }
}

/// Longest prefix of the marker that fits in `budget` bytes
fn marker_within(budget: usize) -> &'static str {
    if budget >= TRUNCATION_MARKER.len() {
        return TRUNCATION_MARKER;
    }
    let mut end = budget;
    while !TRUNCATION_MARKER.is_char_boundary(end) {
        end -= 1;
    }
    &TRUNCATION_MARKER[..end]
}

/// Relative path with `/` separators
fn relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fixture() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("README.md"), "hello").unwrap();
        std::fs::create_dir_all(root.join("src/nested")).unwrap();
        std::fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        std::fs::write(root.join("src/nested/lib.rs"), "").unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join(".git/HEAD"), "ref").unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
        std::fs::write(root.join(".env"), "SECRET=1").unwrap();
        std::fs::write(root.join("src/.DS_Store"), "junk").unwrap();
        dir
    }

    #[test]
    fn test_lists_files_with_sizes() {
        let dir = fixture();
        let summary = TreeSnapshot::default().summarize(dir.path(), 60000);
        assert_eq!(
            summary,
            "README.md (5 bytes)\nsrc/main.rs (12 bytes)\nsrc/nested/lib.rs (0 bytes)"
        );
    }

    #[test]
    fn test_is_deterministic() {
        let dir = fixture();
        let snap = TreeSnapshot::default();
        assert_eq!(snap.summarize(dir.path(), 60000), snap.summarize(dir.path(), 60000));
    }

    #[test]
    fn test_truncation_is_marked_and_capped() {
        let dir = tempdir().unwrap();
        for i in 0..50 {
            std::fs::write(dir.path().join(format!("file_{:02}.txt", i)), "data").unwrap();
        }

        let summary = TreeSnapshot::default().summarize(dir.path(), 100);
        assert!(summary.len() <= 100, "{} bytes", summary.len());
        assert!(summary.ends_with(TRUNCATION_MARKER));
        assert!(summary.starts_with("file_00.txt (4 bytes)"));
    }

    #[test]
    fn test_tiny_budget_shortens_marker() {
        let dir = fixture();
        let summary = TreeSnapshot::default().summarize(dir.path(), 5);
        assert_eq!(summary, "…(t");

        assert_eq!(TreeSnapshot::default().summarize(dir.path(), 2), "");
        assert_eq!(TreeSnapshot::default().summarize(dir.path(), 0), "");
    }

    #[test]
    fn test_output_never_exceeds_cap() {
        let dir = fixture();
        let snap = TreeSnapshot::default();
        for cap in 0..80 {
            let summary = snap.summarize(dir.path(), cap);
            assert!(summary.len() <= cap, "cap {} produced {} bytes", cap, summary.len());
        }
    }

    #[test]
    fn test_exact_fit_is_not_truncated() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "abc").unwrap();
        let line = "a.txt (3 bytes)";

        let summary = TreeSnapshot::default().summarize(dir.path(), line.len() + 1);
        assert_eq!(summary, line);
    }

    #[test]
    fn test_ignore_patterns() {
        let dir = fixture();
        let snap = TreeSnapshot::new(&SnapshotConfig {
            ignore_patterns: vec!["src/nested".to_string(), "*.md".to_string()],
            ..Default::default()
        });
        assert_eq!(snap.summarize(dir.path(), 60000), "src/main.rs (12 bytes)");
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let snap = TreeSnapshot::new(&SnapshotConfig {
            ignore_patterns: vec!["[".to_string()],
            ..Default::default()
        });
        assert!(snap.ignore_patterns.is_empty());
    }

    #[test]
    fn test_empty_repository() {
        let dir = tempdir().unwrap();
        assert_eq!(TreeSnapshot::default().summarize(dir.path(), 60000), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_skipped() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("real.txt"), "r").unwrap();
        std::os::unix::fs::symlink("/nonexistent/target", dir.path().join("broken")).unwrap();

        assert_eq!(TreeSnapshot::default().summarize(dir.path(), 60000), "real.txt (1 bytes)");
    }
}
