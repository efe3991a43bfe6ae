//! Per-module import maps: bound name -> module path.
//!
//! Built from every import in the module, wherever it appears, so names
//! imported only under `if TYPE_CHECKING:` (or inside functions) are
//! still attributable. Relative imports, wildcard imports, `__future__`
//! and names that are builtins anyway are not recorded.

use std::collections::BTreeMap;

use crate::builtins::{is_builtin, strip_generics};
use crate::syntax::{walk_module, walk_stmt, ParsedModule, Stmt, Visit};

/// Bound simple name -> dotted module path it came from.
pub type ImportMap = BTreeMap<String, String>;

struct ImportCollector {
    map: ImportMap,
}

impl<'ast> Visit<'ast> for ImportCollector {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::Import(aliases) => {
                for alias in aliases {
                    let bound = alias.bound_name();
                    if !is_builtin(bound) {
                        self.map.insert(bound.to_string(), alias.name.clone());
                    }
                }
            }
            Stmt::ImportFrom(from) => {
                let Some(module) = from.module.as_deref() else {
                    return;
                };
                if from.level > 0 || from.wildcard || module == "__future__" {
                    return;
                }
                for alias in &from.names {
                    let bound = alias.bound_name();
                    if !is_builtin(bound) {
                        self.map.insert(bound.to_string(), module.to_string());
                    }
                }
            }
            _ => walk_stmt(self, stmt),
        }
    }
}

/// Builds the import map for one parsed module.
pub fn build_import_map(module: &ParsedModule) -> ImportMap {
    let mut collector = ImportCollector {
        map: ImportMap::new(),
    };
    walk_module(&mut collector, module);
    collector.map
}

/// Looks up the module a type reference was imported from.
///
/// Tries the reference without generics first, then each dotted prefix
/// from longest to shortest (`np.ndarray` finds `import numpy as np`).
pub fn lookup<'m>(map: &'m ImportMap, type_name: &str) -> Option<&'m str> {
    let base = strip_generics(type_name);
    if let Some(module) = map.get(base) {
        return Some(module.as_str());
    }
    let parts: Vec<&str> = base.split('.').collect();
    (1..parts.len())
        .rev()
        .map(|i| parts[..i].join("."))
        .find_map(|prefix| map.get(&prefix).map(String::as_str))
}

/// Root package of a dotted module path.
pub fn root_package(module_path: &str) -> &str {
    module_path.split('.').next().unwrap_or(module_path)
}
