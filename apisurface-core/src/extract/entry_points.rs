//! Entry-point resolution from the package's root `__init__.py`.
//!
//! The public symbol set is the union of `__all__` and every name bound by a
//! module-level `from X import Y [as Z]`. Names imported from outside the
//! package are additionally mapped to the distribution they come from.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::scan::is_pruned_dir_name;
use crate::syntax::{parse_file, Expr, ParsedModule, Stmt};

/// Exported symbols of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPoints {
    pub symbols: BTreeSet<String>,
    /// Symbol -> external distribution name.
    pub external_reexports: BTreeMap<String, String>,
}

impl EntryPoints {
    pub fn is_entry(&self, name: &str) -> bool {
        self.symbols.contains(name)
    }

    pub fn reexported_from(&self, name: &str) -> Option<&str> {
        self.external_reexports.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Path fragments that disqualify an `__init__.py` from the fallback search.
const FALLBACK_EXCLUDES: &[&str] = &["test", "venv", ".venv", "__pycache__", "site-packages"];

/// Locates the package's main `__init__.py`.
///
/// Conventional locations first (`<pkg>/`, `src/<pkg>/`), then the
/// shortest-path initializer outside tests and virtual environments.
pub fn find_main_init_file(root: &Path, package_name: &str) -> Option<PathBuf> {
    let pkg_dir = package_name.replace('-', "_").replace('.', "/");
    let candidates = [
        root.join(&pkg_dir).join("__init__.py"),
        root.join("src").join(&pkg_dir).join("__init__.py"),
        root.join(package_name).join("__init__.py"),
        root.join("src").join(package_name).join("__init__.py"),
    ];
    if let Some(found) = candidates.into_iter().find(|p| p.is_file()) {
        return Some(found);
    }

    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir()
                    && e.file_name().to_str().is_some_and(is_pruned_dir_name))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == "__init__.py")
        .map(|e| e.into_path())
        .filter(|p| {
            let rel = p
                .strip_prefix(root)
                .unwrap_or(p)
                .to_string_lossy()
                .to_lowercase();
            !FALLBACK_EXCLUDES.iter().any(|x| rel.contains(x))
        })
        .min_by(|a, b| {
            let (la, lb) = (a.as_os_str().len(), b.as_os_str().len());
            la.cmp(&lb).then_with(|| a.cmp(b))
        })
}

/// Resolves the entry points of the package rooted at `root`.
///
/// A missing, unreadable or unparseable initializer yields empty results.
pub fn resolve_entry_points(
    root: &Path,
    package_name: &str,
    namespace_packages: &[String],
) -> EntryPoints {
    let Some(init) = find_main_init_file(root, package_name) else {
        debug!(root = %root.display(), "no package initializer found");
        return EntryPoints::default();
    };

    match parse_file(&init) {
        Ok(parsed) => entry_points_from_module(&parsed, package_name, namespace_packages),
        Err(e) => {
            warn!(file = %init.display(), error = %e, "skipping unparseable package initializer");
            EntryPoints::default()
        }
    }
}

/// Computes entry points from an already parsed root module.
pub fn entry_points_from_module(
    module: &ParsedModule,
    package_name: &str,
    namespace_packages: &[String],
) -> EntryPoints {
    let mut entry = EntryPoints::default();
    entry.symbols.extend(dunder_all(module));

    let own_prefixes = [package_name.replace('-', "_"), package_name.replace('-', ".")];

    for stmt in &module.body {
        let Stmt::ImportFrom(from) = stmt else {
            continue;
        };
        if from.wildcard {
            continue;
        }
        let module_path = from.module.as_deref().unwrap_or_default();
        let is_own = own_prefixes
            .iter()
            .any(|p| module_path == p || module_path.starts_with(&format!("{}.", p)));
        let external = from.level == 0 && !module_path.is_empty() && !is_own;

        for alias in &from.names {
            let exported = alias.bound_name().to_string();
            if external {
                entry
                    .external_reexports
                    .insert(exported.clone(), distribution_name(module_path, namespace_packages));
            }
            entry.symbols.insert(exported);
        }
    }

    entry
}

/// `__all__ = [...]` (or a tuple) of string literals at module level.
fn dunder_all(module: &ParsedModule) -> Vec<String> {
    for stmt in &module.body {
        let (is_all, value) = match stmt {
            Stmt::Assign { targets, value } => (
                targets.iter().any(|t| matches!(t, Expr::Name(n) if n == "__all__")),
                Some(value),
            ),
            Stmt::AnnAssign { target, value, .. } => (
                matches!(target, Expr::Name(n) if n == "__all__"),
                value.as_ref(),
            ),
            _ => (false, None),
        };
        if !is_all {
            continue;
        }
        if let Some(Expr::List(items) | Expr::Tuple(items)) = value {
            return items
                .iter()
                .filter_map(|item| match item {
                    Expr::Str(s) => Some(s.clone()),
                    _ => None,
                })
                .collect();
        }
    }
    Vec::new()
}

/// Root distribution of an imported module; `azure.core.x` ships as `azure-core`.
pub fn distribution_name(module_path: &str, namespace_packages: &[String]) -> String {
    let parts: Vec<&str> = module_path.split('.').collect();
    match parts.as_slice() {
        [ns, sub, ..] if namespace_packages.iter().any(|n| n == ns) => format!("{}-{}", ns, sub),
        [root, ..] => root.to_string(),
        [] => module_path.to_string(),
    }
}
