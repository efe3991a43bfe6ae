//! Transitive dependency resolution.
//!
//! Every external reference of the pass is attributed to an installed
//! package and, where possible, its class definition is extracted from
//! that package's sources.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::package_index::InstalledPackages;
use crate::builtins::{is_stdlib_package, strip_generics};
use crate::extract::extract_class;
use crate::model::{Class, Dependency};
use crate::syntax::{parse_file, Stmt};
use crate::typeref::{import_map, TypeReferenceCollector};

/// Resolves the collector's external references against `installed`.
///
/// With `deterministic` set, the exhaustive fallback visits packages by
/// name instead of discovery order. Output is sorted by package name.
pub fn resolve_dependencies(
    collector: &mut TypeReferenceCollector,
    installed: &InstalledPackages,
    deterministic: bool,
) -> Vec<Dependency> {
    let external = collector.external_refs();
    if external.is_empty() {
        return Vec::new();
    }

    let fallback_order: Vec<(&str, &Path)> = if deterministic {
        installed.sorted()
    } else {
        installed.iter().collect()
    };

    let mut deps: BTreeMap<String, Dependency> = BTreeMap::new();

    for type_name in &external {
        let class_name = class_name_of(type_name);

        if let Some(pkg) = collector.resolve_package(type_name, |name| installed.contains(name)) {
            if let Some(class) = installed
                .path(&pkg)
                .and_then(|path| find_class_in_package(path, class_name))
            {
                record(&mut deps, &pkg, Some(class));
                continue;
            }
        }

        let found = fallback_order.iter().find_map(|(pkg, path)| {
            find_class_in_package(path, class_name).map(|class| (*pkg, class))
        });
        if let Some((pkg, class)) = found {
            debug!(type_name = %type_name, package = pkg, "resolved by exhaustive search");
            record(&mut deps, pkg, Some(class));
            continue;
        }

        if let Some(root) = collector.import_source(type_name).map(import_map::root_package) {
            if !is_stdlib_package(root) {
                debug!(type_name = %type_name, package = root, "recorded without type details");
                record(&mut deps, root, None);
            }
        }
    }

    deps.into_values().collect()
}

fn class_name_of(type_name: &str) -> &str {
    let base = strip_generics(type_name);
    base.rsplit('.').next().unwrap_or(base)
}

fn record(deps: &mut BTreeMap<String, Dependency>, package: &str, class: Option<Class>) {
    let dep = deps
        .entry(package.to_string())
        .or_insert_with(|| Dependency {
            package: package.to_string(),
            is_stdlib: is_stdlib_package(package),
            classes: Vec::new(),
        });
    if let Some(class) = class {
        if !dep.classes.iter().any(|c| c.name == class.name) {
            dep.classes.push(class);
        }
    }
}

/// Source files of a package: stubs first, each group sorted by path.
fn package_sources(package_dir: &Path) -> Vec<PathBuf> {
    let collect = |ext: &str| -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(package_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|x| x == ext))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('_') || n == "__init__.py" || n == "__init__.pyi")
            })
            .collect();
        files.sort();
        files
    };

    let mut files = collect("pyi");
    files.extend(collect("py"));
    files
}

/// Finds a top-level class named `class_name` in an installed package.
///
/// Unparseable files are skipped. The class is extracted with a throw-away
/// collector, so nothing it references is expanded further.
pub fn find_class_in_package(package_dir: &Path, class_name: &str) -> Option<Class> {
    package_sources(package_dir).into_iter().find_map(|file| {
        let parsed = parse_file(&file).ok()?;
        parsed.body.iter().find_map(|stmt| match stmt {
            Stmt::ClassDef(class) if class.name == class_name => {
                let mut scratch = TypeReferenceCollector::new();
                Some(extract_class(class, &mut scratch))
            }
            _ => None,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse_expression, parse_module};
    use std::fs;

    fn temp_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("apisurface_deps_{}_{}", tag, std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir).ok();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(path: PathBuf, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_stub_preferred_over_source() {
        let site = temp_root("stubs");
        write(site.join("widgets/__init__.py"), "class Widget:\n    def from_source(self): ...\n");
        write(site.join("widgets/__init__.pyi"), "class Widget:\n    def from_stub(self) -> int: ...\n");

        let class = find_class_in_package(&site.join("widgets"), "Widget").unwrap();
        assert_eq!(class.methods[0].name, "from_stub");
        assert!(find_class_in_package(&site.join("widgets"), "Missing").is_none());

        fs::remove_dir_all(&site).ok();
    }

    #[test]
    fn test_private_and_broken_files_skipped() {
        let site = temp_root("private");
        write(site.join("pkg/__init__.py"), "");
        write(site.join("pkg/_impl.py"), "class Hidden: ...\n");
        write(site.join("pkg/broken.py"), "class Broken(:\n");
        write(site.join("pkg/models.py"), "class Visible: ...\n");

        let pkg = site.join("pkg");
        assert!(find_class_in_package(&pkg, "Hidden").is_none());
        assert!(find_class_in_package(&pkg, "Broken").is_none());
        assert!(find_class_in_package(&pkg, "Visible").is_some());

        fs::remove_dir_all(&site).ok();
    }

    #[test]
    fn test_resolution_steps() {
        let site = temp_root("steps");
        write(site.join("transport/__init__.py"), "class Session:\n    def close(self): ...\n");
        write(site.join("other/__init__.py"), "class Widget: ...\n");
        let installed = InstalledPackages::from_site_packages(vec![site.clone()]);

        let mut collector = TypeReferenceCollector::new();
        collector.record_imports(
            "pkg.client",
            &parse_module(
                "from transport import Session\nfrom requests import Response\nfrom json import JSONDecoder\n",
            )
            .unwrap(),
        );
        for annotation in ["Session", "Widget", "Response", "JSONDecoder", "Unknown"] {
            collector.collect(&parse_expression(annotation).unwrap());
        }

        let deps = resolve_dependencies(&mut collector, &installed, true);
        let packages: Vec<&str> = deps.iter().map(|d| d.package.as_str()).collect();
        assert_eq!(packages, vec!["other", "requests", "transport"]);

        let transport = &deps[2];
        assert_eq!(transport.classes.len(), 1);
        assert_eq!(transport.classes[0].name, "Session");
        assert!(deps[1].classes.is_empty());
        assert!(deps.iter().all(|d| !d.is_stdlib));

        fs::remove_dir_all(&site).ok();
    }

    #[test]
    fn test_no_external_refs() {
        let mut collector = TypeReferenceCollector::new();
        assert!(resolve_dependencies(&mut collector, &InstalledPackages::new(), false).is_empty());
    }
}
