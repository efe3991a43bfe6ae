//! Configuration loading from apisurface.toml.
//!
//! ```toml
//! [scan]
//! exclude = ["generated"]
//! fixture_allowance = "TestFixtures"
//!
//! [dependencies]
//! search_paths = ["/opt/python/lib/python3.12/site-packages"]
//! namespace_packages = ["azure"]
//! deterministic_fallback = false
//! ```

use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};

use crate::error::{ApiResult, ApiSurfaceError, IoResultExt};

/// File name looked up at the analysed root.
pub const CONFIG_FILE: &str = "apisurface.toml";

/// Default path component that exempts test fixtures from file exclusions.
pub const DEFAULT_FIXTURE_ALLOWANCE: &str = "TestFixtures";

/// Main configuration structure for apisurface.toml.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ApiSurfaceConfig {
    /// File selection settings.
    pub scan: Option<ScanConfig>,
    /// Dependency resolution settings.
    pub dependencies: Option<DependencyConfig>,
}

/// `[scan]` table.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ScanConfig {
    /// Extra directory names pruned during traversal.
    pub exclude: Option<Vec<String>>,
    /// Path component that bypasses every exclusion rule.
    pub fixture_allowance: Option<String>,
}

/// `[dependencies]` table.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DependencyConfig {
    /// Extra roots searched for `site-packages` directories.
    pub search_paths: Option<Vec<PathBuf>>,
    /// Namespace packages whose `ns.sub` modules ship as `ns-sub` distributions.
    pub namespace_packages: Option<Vec<String>>,
    /// Sort installed packages by name before the exhaustive fallback scan.
    pub deterministic_fallback: Option<bool>,
}

impl ApiSurfaceConfig {
    pub fn extra_excludes(&self) -> Vec<String> {
        self.scan
            .as_ref()
            .and_then(|s| s.exclude.clone())
            .unwrap_or_default()
    }

    pub fn fixture_allowance(&self) -> String {
        self.scan
            .as_ref()
            .and_then(|s| s.fixture_allowance.clone())
            .unwrap_or_else(|| DEFAULT_FIXTURE_ALLOWANCE.to_string())
    }

    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.dependencies
            .as_ref()
            .and_then(|d| d.search_paths.clone())
            .unwrap_or_default()
    }

    pub fn namespace_packages(&self) -> Vec<String> {
        self.dependencies
            .as_ref()
            .and_then(|d| d.namespace_packages.clone())
            .unwrap_or_else(|| vec!["azure".to_string()])
    }

    pub fn deterministic_fallback(&self) -> bool {
        self.dependencies
            .as_ref()
            .and_then(|d| d.deterministic_fallback)
            .unwrap_or(false)
    }
}

/// Loads configuration from apisurface.toml if it exists.
pub fn load_config(root: &Path) -> ApiResult<Option<ApiSurfaceConfig>> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).with_path(&path)?;
    let cfg = toml::from_str(&content).map_err(|e| ApiSurfaceError::config(&path, e.to_string()))?;
    Ok(Some(cfg))
}

/// Loads configuration, falling back to defaults when the file is missing or malformed.
pub fn load_config_or_default(root: &Path) -> ApiSurfaceConfig {
    match load_config(root) {
        Ok(Some(cfg)) => cfg,
        Ok(None) => ApiSurfaceConfig::default(),
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "ignoring config file");
            ApiSurfaceConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "apisurface_config_test_{}_{}",
            tag,
            std::process::id()
        ));
        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = temp_root("missing");
        assert!(load_config(&dir).unwrap().is_none());

        let cfg = load_config_or_default(&dir);
        assert_eq!(cfg.fixture_allowance(), "TestFixtures");
        assert_eq!(cfg.namespace_packages(), vec!["azure".to_string()]);
        assert!(!cfg.deterministic_fallback());
        assert!(cfg.extra_excludes().is_empty());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let dir = temp_root("full");
        fs::write(
            dir.join(CONFIG_FILE),
            r#"
[scan]
exclude = ["generated"]
fixture_allowance = "Fixtures"

[dependencies]
search_paths = ["/opt/site-packages"]
namespace_packages = ["azure", "google"]
deterministic_fallback = true
"#,
        )
        .unwrap();

        let cfg = load_config(&dir).unwrap().unwrap();
        assert_eq!(cfg.extra_excludes(), vec!["generated".to_string()]);
        assert_eq!(cfg.fixture_allowance(), "Fixtures");
        assert_eq!(cfg.search_paths(), vec![PathBuf::from("/opt/site-packages")]);
        assert_eq!(cfg.namespace_packages().len(), 2);
        assert!(cfg.deterministic_fallback());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_malformed_config_falls_back() {
        let dir = temp_root("bad");
        fs::write(dir.join(CONFIG_FILE), "[scan\nexclude = ").unwrap();

        let err = load_config(&dir).unwrap_err();
        assert!(matches!(&err, ApiSurfaceError::Config { path, .. } if path.ends_with(CONFIG_FILE)));
        let cfg = load_config_or_default(&dir);
        assert_eq!(cfg.fixture_allowance(), DEFAULT_FIXTURE_ALLOWANCE);

        fs::remove_dir_all(&dir).ok();
    }
}
