//! Parallel, deterministic source file discovery with directory pruning.
//!
//! One [`SourceFilter`] decides which `*.py` files take part in an
//! analysis. Package extraction and sample scanning share it, so a file is
//! either visible to both or to neither.
//!
//! Performance:
//! - Early directory pruning via `WalkDir::filter_entry` (O(1) subtree skip)
//! - Parallel filtering via Rayon's `par_bridge`
//! - Results sorted afterwards so callers see a stable order

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::config::{ApiSurfaceConfig, DEFAULT_FIXTURE_ALLOWANCE};

/// Directories never descended into.
const PRUNED_DIRS: &[&str] = &[
    "__pycache__",
    "venv",
    ".venv",
    "site-packages",
    "node_modules",
    ".tox",
    ".nox",
    ".git",
    ".eggs",
];

/// Path components that exclude a file.
const EXCLUDED_COMPONENTS: &[&str] = &["tests", "build", "dist"];

/// True for directory names pruned by default.
pub fn is_pruned_dir_name(name: &str) -> bool {
    PRUNED_DIRS.contains(&name) || name.ends_with(".egg-info")
}

/// File selection rules.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    extra_excludes: HashSet<String>,
    fixture_allowance: String,
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self {
            extra_excludes: HashSet::new(),
            fixture_allowance: DEFAULT_FIXTURE_ALLOWANCE.to_string(),
        }
    }
}

impl SourceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter configured from the `[scan]` table.
    pub fn from_config(config: &ApiSurfaceConfig) -> Self {
        Self::new()
            .with_excludes(config.extra_excludes())
            .with_fixture_allowance(config.fixture_allowance())
    }

    /// Adds directory names to prune.
    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_excludes
            .extend(excludes.into_iter().map(Into::into));
        self
    }

    pub fn with_fixture_allowance(mut self, marker: impl Into<String>) -> Self {
        self.fixture_allowance = marker.into();
        self
    }

    pub fn fixture_allowance(&self) -> &str {
        &self.fixture_allowance
    }

    fn is_fixture(&self, rel: &Path) -> bool {
        rel.components()
            .any(|c| c.as_os_str() == self.fixture_allowance.as_str())
    }

    /// Checks if a directory entry should be pruned (excluded from traversal).
    #[inline]
    fn is_pruned_dir(&self, root: &Path, entry: &walkdir::DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let Some(name) = entry.file_name().to_str() else {
            return false;
        };
        if !(is_pruned_dir_name(name) || self.extra_excludes.contains(name)) {
            return false;
        }
        !self.is_fixture(entry.path().strip_prefix(root).unwrap_or(entry.path()))
    }

    /// Applies the file rules to `path` (relative components are taken from `root`).
    pub fn accepts(&self, root: &Path, path: &Path) -> bool {
        if !path.extension().is_some_and(|ext| ext == "py") {
            return false;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if file_name.starts_with('_') && file_name != "__init__.py" {
            return false;
        }

        let rel = path.strip_prefix(root).unwrap_or(path);
        if self.is_fixture(rel) {
            return true;
        }

        let excluded_dir = rel.components().any(|c| match c {
            Component::Normal(part) => part
                .to_str()
                .is_some_and(|p| EXCLUDED_COMPONENTS.contains(&p) || is_pruned_dir_name(p)),
            _ => false,
        });

        !(excluded_dir || file_name.starts_with("test_") || file_name.ends_with("_test.py"))
    }

    /// Gathers every accepted `*.py` file below `root`, sorted by path.
    ///
    /// Unreadable entries below the root are logged and skipped; an
    /// unreadable root is an error.
    pub fn gather(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let meta = fs::metadata(root)
            .with_context(|| format!("Failed to read source root {}", root.display()))?;
        if !meta.is_dir() {
            bail!("{} is not a directory", root.display());
        }

        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            // Prunes whole subtrees before they are read.
            .filter_entry(|e| !self.is_pruned_dir(root, e))
            .par_bridge()
            .filter_map(|entry| match entry {
                Ok(e) => (e.file_type().is_file() && self.accepts(root, e.path()))
                    .then(|| e.into_path()),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable directory entry");
                    None
                }
            })
            .collect();

        files.sort();
        Ok(files)
    }
}

/// Gathers `*.py` files below `root` with the default rules.
pub fn gather_py_files(root: &Path) -> Result<Vec<PathBuf>> {
    SourceFilter::default().gather(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_tree(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("apisurface_scan_{}_{}", tag, std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        for sub in [
            "pkg/sub",
            "pkg/__pycache__",
            "tests",
            "build/lib",
            ".venv/lib",
            "generated",
            "tests/TestFixtures/sample",
            "pkg.egg-info",
        ] {
            fs::create_dir_all(dir.join(sub)).unwrap();
        }
        for file in [
            "pkg/__init__.py",
            "pkg/client.py",
            "pkg/_internal.py",
            "pkg/sub/models.py",
            "pkg/sub/test_models.py",
            "pkg/sub/models_test.py",
            "pkg/__pycache__/client.py",
            "pkg/readme.md",
            "tests/test_client.py",
            "tests/conftest.py",
            "build/lib/client.py",
            ".venv/lib/site.py",
            "generated/gen.py",
            "tests/TestFixtures/sample/test_sample.py",
            "pkg.egg-info/info.py",
        ] {
            fs::write(dir.join(file), "").unwrap();
        }
        dir
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| {
                f.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_default_rules() {
        let dir = create_test_tree("default");
        let files = gather_py_files(&dir).unwrap();
        assert_eq!(
            relative(&dir, &files),
            vec![
                "generated/gen.py",
                "pkg/__init__.py",
                "pkg/client.py",
                "pkg/sub/models.py",
                "tests/TestFixtures/sample/test_sample.py",
            ]
        );
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_extra_excludes_and_marker() {
        let dir = create_test_tree("excludes");
        let filter = SourceFilter::new()
            .with_excludes(["generated"])
            .with_fixture_allowance("NoSuchMarker");
        let files = relative(&dir, &filter.gather(&dir).unwrap());
        assert!(!files.contains(&"generated/gen.py".to_string()));
        assert!(!files.iter().any(|f| f.contains("TestFixtures")));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_root_is_error() {
        let missing = std::env::temp_dir().join("apisurface_scan_missing_root_xyz");
        assert!(gather_py_files(&missing).is_err());
    }

    #[test]
    fn test_accepts_is_relative_to_root() {
        let filter = SourceFilter::default();
        let root = Path::new("/home/ci/build/tests/repo");
        assert!(filter.accepts(root, &root.join("pkg/client.py")));
        assert!(!filter.accepts(root, &root.join("pkg/client.pyi")));
    }
}
