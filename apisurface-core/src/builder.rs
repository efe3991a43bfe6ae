//! Builder pattern API for package extraction.
//!
//! Provides a fluent interface for configuring and running one extraction
//! pass over a Python package tree:
//!
//! ```rust,ignore
//! use apisurface_core::prelude::*;
//!
//! let result = ApiSurface::new("/path/to/package")
//!     .package_name("mypkg")
//!     .resolve_dependencies(true)
//!     .extract()?;
//!
//! println!("{} modules", result.model.modules.len());
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::{load_config_or_default, ApiSurfaceConfig};
use crate::deps::{resolve_dependencies, InstalledPackages};
use crate::extract::{extract_module, module_name, resolve_entry_points, EntryPoints};
use crate::manifest::find_package_name;
use crate::model::{ApiModel, Module};
use crate::scan::SourceFilter;
use crate::syntax::parse_file;
use crate::typeref::TypeReferenceCollector;

/// Builder for configuring an extraction pass.
///
/// # Example
///
/// ```rust,ignore
/// let result = ApiSurface::new("/my/package")
///     .resolve_dependencies(false)
///     .extract()?;
/// ```
#[derive(Debug, Clone)]
pub struct ApiSurface {
    /// Root of the package tree to analyze
    root: PathBuf,

    /// Explicit configuration; loaded from `apisurface.toml` when absent
    config: Option<ApiSurfaceConfig>,

    /// Package name override; discovered from manifests when absent
    package_name: Option<String>,

    /// Whether to resolve external references against installed packages
    resolve_dependencies: bool,

    /// Extra roots searched for `site-packages`, after configured ones
    search_paths: Vec<PathBuf>,
}

impl ApiSurface {
    /// Create a new extraction builder for the given path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: None,
            package_name: None,
            resolve_dependencies: true,
            search_paths: Vec::new(),
        }
    }

    /// Use `config` instead of reading `apisurface.toml`.
    pub fn with_config(mut self, config: ApiSurfaceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the discovered package name.
    pub fn package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = Some(name.into());
        self
    }

    /// Enable or disable transitive dependency resolution.
    pub fn resolve_dependencies(mut self, enabled: bool) -> Self {
        self.resolve_dependencies = enabled;
        self
    }

    /// Add roots searched for installed packages.
    pub fn search_paths(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.search_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run the extraction and return the model plus pass statistics.
    pub fn extract(&self) -> Result<ExtractionResult> {
        let config = self
            .config
            .clone()
            .unwrap_or_else(|| load_config_or_default(&self.root));

        // 1. Package name
        let package = self
            .package_name
            .clone()
            .unwrap_or_else(|| find_package_name(&self.root));

        // 2. Entry points
        let entry = resolve_entry_points(&self.root, &package, &config.namespace_packages());

        // 3. File selection
        let files = SourceFilter::from_config(&config)
            .gather(&self.root)
            .context("Failed to gather .py files")?;

        // 4. Per-file extraction, each file with its own collector
        let outcomes: Vec<FileOutcome> = files
            .par_iter()
            .map(|path| extract_file(&self.root, path, &package, &entry))
            .collect();

        // 5. Merge in path order
        let mut collector = TypeReferenceCollector::new();
        let mut modules = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Extracted { module, collector: local } => {
                    collector.absorb(local);
                    if !module.is_empty() {
                        modules.push(module);
                    }
                }
                FileOutcome::Skipped { path, reason } => {
                    warn!(file = %path.display(), error = %reason, "skipping unparseable file");
                    skipped.push(path);
                }
            }
        }

        let external_refs: Vec<String> = collector.external_refs().into_iter().collect();

        // 6. Dependencies
        let dependencies = if self.resolve_dependencies {
            let mut roots = config.search_paths();
            roots.extend(self.search_paths.iter().cloned());
            let installed = InstalledPackages::discover(&self.root, &roots);
            resolve_dependencies(&mut collector, &installed, config.deterministic_fallback())
        } else {
            Vec::new()
        };

        info!(
            package = %package,
            files = files.len(),
            modules = modules.len(),
            skipped = skipped.len(),
            dependencies = dependencies.len(),
            "extraction complete"
        );

        Ok(ExtractionResult {
            model: ApiModel {
                package,
                modules,
                dependencies,
            },
            files_scanned: files.len(),
            skipped,
            external_refs,
        })
    }
}

enum FileOutcome {
    Extracted {
        module: Module,
        collector: TypeReferenceCollector,
    },
    Skipped {
        path: PathBuf,
        reason: String,
    },
}

fn extract_file(root: &Path, path: &Path, package: &str, entry: &EntryPoints) -> FileOutcome {
    match parse_file(path) {
        Ok(parsed) => {
            let mut collector = TypeReferenceCollector::new();
            let name = module_name(root, path, package);
            let module = extract_module(&name, &parsed, entry, &mut collector);
            FileOutcome::Extracted { module, collector }
        }
        Err(e) => FileOutcome::Skipped {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    }
}

/// Result of one extraction pass.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// The extracted API model
    pub model: ApiModel,

    /// Number of source files selected for extraction
    pub files_scanned: usize,

    /// Files that could not be read or parsed
    pub skipped: Vec<PathBuf>,

    /// References not defined locally and not builtin, sorted
    pub external_refs: Vec<String>,
}

impl ExtractionResult {
    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn create_test_package(tag: &str) -> PathBuf {
        let id = std::process::id();
        let dir = std::env::temp_dir().join(format!("apisurface_builder_{}_{}", tag, id));

        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        fs::create_dir_all(dir.join("widgets")).expect("Failed to create test directory");

        fs::write(
            dir.join("pyproject.toml"),
            "[project]\nname = \"widgets\"\n",
        )
        .expect("Failed to write pyproject.toml");

        fs::write(
            dir.join("widgets/__init__.py"),
            "from widgets._client import WidgetClient\n__all__ = [\"WidgetClient\"]\n",
        )
        .expect("Failed to write __init__.py");

        fs::write(
            dir.join("widgets/client.py"),
            "from transport import Session\n\nclass WidgetClient:\n    def get(self, name: str) -> \"Widget\":\n        ...\n    def session(self) -> Session:\n        ...\n\nclass Widget:\n    pass\n",
        )
        .expect("Failed to write client.py");

        fs::write(dir.join("widgets/broken.py"), "def (:\n").expect("Failed to write broken.py");

        dir
    }

    #[test]
    fn test_builder_basic() {
        let dir = create_test_package("basic");

        let result = ApiSurface::new(&dir)
            .resolve_dependencies(false)
            .extract()
            .unwrap();

        assert_eq!(result.model.package, "widgets");
        assert_eq!(result.files_scanned, 3);
        assert_eq!(result.skipped.len(), 1);

        let module = result
            .model
            .modules
            .iter()
            .find(|m| m.name == "widgets.client")
            .unwrap();
        let client = module.classes.iter().find(|c| c.name == "WidgetClient").unwrap();
        assert!(client.entry_point);
        assert_eq!(result.external_refs, vec!["Session".to_string()]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_builder_package_override() {
        let dir = create_test_package("override");

        let result = ApiSurface::new(&dir)
            .package_name("renamed")
            .resolve_dependencies(false)
            .extract()
            .unwrap();

        assert_eq!(result.model.package, "renamed");
        assert!(result.model.dependencies.is_empty());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_builder_missing_root() {
        let result = ApiSurface::new("/nonexistent/apisurface/root")
            .resolve_dependencies(false)
            .extract();
        assert!(result.is_err());
    }
}
