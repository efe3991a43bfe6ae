//! Declared package name discovery.
//!
//! Lookup order:
//! 1. `pyproject.toml`: `[project].name`, `[tool.poetry].name`,
//!    `[tool.flit.metadata].module`, then a `name = "..."` text match
//! 2. `setup.py`: `name="..."` text match
//! 3. Parent directory of the shortest-path `__init__.py` (outside tests
//!    and generated code)
//! 4. The root directory's own name

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ApiSurfaceError;
use crate::scan::is_pruned_dir_name;

static NAME_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"name\s*=\s*["']([^"']+)["']"#).expect("Hardcoded regex pattern is valid")
});

/// Used when the root path has no final component.
const FALLBACK_NAME: &str = "package";

/// Finds the package name for the source tree at `root`.
pub fn find_package_name(root: &Path) -> String {
    let found = from_pyproject(root)
        .or_else(|| from_setup_py(root))
        .or_else(|| from_init_layout(root));

    match found {
        Some(name) => name,
        None => {
            let name = root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| FALLBACK_NAME.to_string());
            debug!(package = %name, "package name taken from root directory");
            name
        }
    }
}

fn from_pyproject(root: &Path) -> Option<String> {
    let path = root.join("pyproject.toml");
    let text = fs::read_to_string(&path).ok()?;

    match text.parse::<toml::Table>() {
        Ok(table) => {
            if let Some(name) = declared_name(&table) {
                return Some(name);
            }
        }
        Err(e) => {
            let err = ApiSurfaceError::manifest(&path, e.to_string());
            warn!(error = %err, "malformed pyproject.toml, falling back to text match");
        }
    }

    first_name_assignment(&text)
}

fn declared_name(table: &toml::Table) -> Option<String> {
    let lookup = |keys: &[&str]| -> Option<String> {
        let (last, tables) = keys.split_last()?;
        let mut current = table;
        for key in tables {
            current = current.get(*key)?.as_table()?;
        }
        current.get(*last)?.as_str().map(String::from)
    };

    lookup(&["project", "name"])
        .or_else(|| lookup(&["tool", "poetry", "name"]))
        .or_else(|| lookup(&["tool", "flit", "metadata", "module"]))
}

fn from_setup_py(root: &Path) -> Option<String> {
    let text = fs::read_to_string(root.join("setup.py")).ok()?;
    first_name_assignment(&text)
}

fn first_name_assignment(text: &str) -> Option<String> {
    NAME_ASSIGNMENT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn from_init_layout(root: &Path) -> Option<String> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir()
                    && e.file_name().to_str().is_some_and(is_pruned_dir_name))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == "__init__.py")
        .filter(|e| {
            let rel = e
                .path()
                .strip_prefix(root)
                .unwrap_or(e.path())
                .to_string_lossy()
                .to_lowercase();
            !rel.contains("test") && !rel.contains("_generated")
        })
        .min_by(|a, b| {
            let (la, lb) = (a.path().as_os_str().len(), b.path().as_os_str().len());
            la.cmp(&lb).then_with(|| a.path().cmp(b.path()))
        })
        .and_then(|e| {
            let parent = e.path().parent()?;
            if parent == root {
                return None;
            }
            parent.file_name().map(|n| n.to_string_lossy().into_owned())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("apisurface_manifest_{}_{}", tag, std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_project_table() {
        let dir = temp_root("project");
        fs::write(
            dir.join("pyproject.toml"),
            "[project]\nname = \"azure-widgets\"\nversion = \"1.0\"\n",
        )
        .unwrap();
        assert_eq!(find_package_name(&dir), "azure-widgets");
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_poetry_and_flit() {
        let table: toml::Table = "[tool.poetry]\nname = \"poetry-pkg\"\n".parse().unwrap();
        assert_eq!(declared_name(&table).as_deref(), Some("poetry-pkg"));
        let table: toml::Table = "[tool.flit.metadata]\nmodule = \"flitpkg\"\n".parse().unwrap();
        assert_eq!(declared_name(&table).as_deref(), Some("flitpkg"));
    }

    #[test]
    fn test_malformed_pyproject_uses_text_match() {
        let dir = temp_root("malformed");
        fs::write(dir.join("pyproject.toml"), "[project\nname = 'broken-pkg'\n").unwrap();
        assert_eq!(find_package_name(&dir), "broken-pkg");
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_setup_py() {
        let dir = temp_root("setup");
        fs::write(dir.join("setup.py"), "from setuptools import setup\nsetup(\n    name='legacy',\n)\n").unwrap();
        assert_eq!(find_package_name(&dir), "legacy");
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_first_name_assignment() {
        assert_eq!(
            first_name_assignment("setup(version = \"2\", name = \"double\")").as_deref(),
            Some("double")
        );
        assert_eq!(first_name_assignment("setup(name=pkg_name)"), None);
        assert_eq!(first_name_assignment("name = ''"), None);
    }

    #[test]
    fn test_init_layout_then_dir_name() {
        let dir = temp_root("layout");
        fs::create_dir_all(dir.join("src/widgets/sub")).unwrap();
        fs::create_dir_all(dir.join("tests")).unwrap();
        fs::write(dir.join("src/widgets/__init__.py"), "").unwrap();
        fs::write(dir.join("src/widgets/sub/__init__.py"), "").unwrap();
        fs::write(dir.join("tests/__init__.py"), "").unwrap();
        assert_eq!(find_package_name(&dir), "widgets");

        let empty = temp_root("empty");
        assert_eq!(
            find_package_name(&empty),
            empty.file_name().unwrap().to_string_lossy()
        );

        fs::remove_dir_all(&dir).ok();
        fs::remove_dir_all(&empty).ok();
    }
}
