//! Installed-package discovery.
//!
//! Search roots are `<root>/venv/lib`, `<root>/.venv/lib`, configured search
//! paths and `PYTHONPATH` entries, in that order. A root named
//! `site-packages` is used as-is; otherwise every `site-packages` directory
//! below it is. The first package found under a name wins.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// `lib/pythonX.Y/site-packages` sits three levels below a search root.
const SITE_PACKAGES_MAX_DEPTH: usize = 4;

/// Installed packages in discovery order.
#[derive(Debug, Clone, Default)]
pub struct InstalledPackages {
    entries: Vec<(String, PathBuf)>,
    index: HashMap<String, usize>,
}

impl InstalledPackages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discovers packages for the source tree at `root`.
    pub fn discover(root: &Path, search_paths: &[PathBuf]) -> Self {
        let mut roots = vec![root.join("venv").join("lib"), root.join(".venv").join("lib")];
        roots.extend(search_paths.iter().cloned());
        if let Some(pythonpath) = std::env::var_os("PYTHONPATH") {
            roots.extend(std::env::split_paths(&pythonpath));
        }

        let site_dirs: Vec<PathBuf> = roots
            .iter()
            .filter(|r| r.is_dir())
            .flat_map(|r| site_packages_dirs(r))
            .collect();

        let packages = Self::from_site_packages(site_dirs);
        debug!(count = packages.len(), "discovered installed packages");
        packages
    }

    /// Indexes the packages found directly inside each directory.
    pub fn from_site_packages<I>(dirs: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut packages = Self::new();
        for dir in dirs {
            let Ok(read) = fs::read_dir(&dir) else {
                continue;
            };
            for item in read.filter_map(|e| e.ok()) {
                let path = item.path();
                let Some(name) = item.file_name().to_str().map(String::from) else {
                    continue;
                };
                if is_package_dir(&name, &path) {
                    packages.insert(name, path);
                }
            }
        }
        packages
    }

    /// Adds a package unless the name is already known. Returns whether it was added.
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> bool {
        let name = name.into();
        if self.index.contains_key(&name) {
            return false;
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, path.into()));
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn path(&self, name: &str) -> Option<&Path> {
        self.index
            .get(name)
            .map(|&i| self.entries[i].1.as_path())
    }

    /// Packages in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    /// Packages sorted by name.
    pub fn sorted(&self) -> Vec<(&str, &Path)> {
        let mut all: Vec<_> = self.iter().collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_package_dir(name: &str, path: &Path) -> bool {
    !name.starts_with('_')
        && !name.starts_with('.')
        && path.is_dir()
        && (path.join("__init__.py").is_file() || path.join("__init__.pyi").is_file())
}

fn site_packages_dirs(root: &Path) -> Vec<PathBuf> {
    if root.file_name().is_some_and(|n| n == "site-packages") {
        return vec![root.to_path_buf()];
    }
    WalkDir::new(root)
        .max_depth(SITE_PACKAGES_MAX_DEPTH)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir() && e.file_name() == "site-packages")
        .map(|e| e.into_path())
        .collect()
}
