//! Type reference collection from annotation trees.
//!
//! One [`TypeReferenceCollector`] is created per package analysis (or per
//! file, then merged with [`TypeReferenceCollector::absorb`]). It owns all
//! mutable state of the pass: referenced names, locally defined names,
//! per-module import maps and the resolved-package cache.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::import_map::{self, ImportMap};
use crate::builtins::{is_builtin, is_stdlib_package, strip_generics};
use crate::syntax::{parse_expression, Expr, ParsedModule};

/// Walks one annotation, adding every non-builtin type name to `refs`.
pub fn collect_type_refs(annotation: &Expr, refs: &mut BTreeSet<String>) {
    match annotation {
        Expr::Name(id) => {
            if !is_builtin(id) {
                refs.insert(id.clone());
            }
        }
        Expr::Attribute { .. } => {
            if let Some(full) = annotation.dotted_name() {
                if !is_builtin(&full) && !is_stdlib_package(&full) {
                    refs.insert(full);
                }
            }
        }
        Expr::Subscript { value, slice } => {
            collect_type_refs(value, refs);
            if is_literal(value) {
                return;
            }
            match slice.as_ref() {
                Expr::Tuple(items) => {
                    for item in items {
                        collect_type_refs(item, refs);
                    }
                }
                single => collect_type_refs(single, refs),
            }
        }
        Expr::Union { left, right } => {
            collect_type_refs(left, refs);
            collect_type_refs(right, refs);
        }
        Expr::Str(text) => match parse_expression(text) {
            Ok(parsed) => collect_type_refs(&parsed, refs),
            Err(e) => debug!(annotation = %text, error = %e, "unparseable forward reference"),
        },
        Expr::Tuple(items) | Expr::List(items) => {
            for item in items {
                collect_type_refs(item, refs);
            }
        }
        Expr::Constant(_)
        | Expr::Call { .. }
        | Expr::Await(_)
        | Expr::Other { .. } => {}
    }
}

// `Literal['a', 'b']` holds values, not forward references.
fn is_literal(value: &Expr) -> bool {
    match value {
        Expr::Name(id) => id == "Literal",
        Expr::Attribute { attr, .. } => attr == "Literal",
        _ => false,
    }
}

/// Accumulator for one extraction pass.
#[derive(Debug, Default, Clone)]
pub struct TypeReferenceCollector {
    refs: BTreeSet<String>,
    defined: BTreeSet<String>,
    import_maps: BTreeMap<String, ImportMap>,
    resolved: HashMap<String, String>,
}

impl TypeReferenceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects references from an annotation (or base-class expression).
    pub fn collect(&mut self, annotation: &Expr) {
        collect_type_refs(annotation, &mut self.refs);
    }

    /// Registers a locally defined type name.
    pub fn add_defined_type(&mut self, name: &str) {
        self.defined.insert(strip_generics(name).to_string());
    }

    /// Records the import map of `module_name`, replacing any earlier one.
    pub fn record_imports(&mut self, module_name: &str, module: &ParsedModule) {
        let map = import_map::build_import_map(module);
        if !map.is_empty() {
            self.import_maps.insert(module_name.to_string(), map);
        }
    }

    pub fn refs(&self) -> &BTreeSet<String> {
        &self.refs
    }

    pub fn defined(&self) -> &BTreeSet<String> {
        &self.defined
    }

    pub fn import_maps(&self) -> &BTreeMap<String, ImportMap> {
        &self.import_maps
    }

    /// Referenced names minus locally defined names minus builtins.
    pub fn external_refs(&self) -> BTreeSet<String> {
        self.refs
            .iter()
            .filter(|name| !self.defined.contains(strip_generics(name)) && !is_builtin(name))
            .cloned()
            .collect()
    }

    /// Module path a reference was imported from, searching modules in name order.
    pub fn import_source(&self, type_name: &str) -> Option<&str> {
        self.import_maps
            .values()
            .find_map(|map| import_map::lookup(map, type_name))
    }

    /// Attributes a reference to an installed package.
    ///
    /// Import maps first, then dotted prefixes from longest to shortest.
    /// Successful resolutions are cached for the rest of the pass.
    pub fn resolve_package(
        &mut self,
        type_name: &str,
        is_installed: impl Fn(&str) -> bool,
    ) -> Option<String> {
        if let Some(pkg) = self.resolved.get(type_name) {
            return Some(pkg.clone());
        }

        let from_imports = self
            .import_source(type_name)
            .map(import_map::root_package)
            .filter(|root| is_installed(root))
            .map(String::from);

        let resolved = from_imports.or_else(|| {
            let base = strip_generics(type_name);
            let parts: Vec<&str> = base.split('.').collect();
            (1..parts.len())
                .rev()
                .map(|i| parts[..i].join("."))
                .find(|candidate| is_installed(candidate))
        });

        if let Some(pkg) = &resolved {
            debug!(type_name, package = %pkg, "resolved type reference");
            self.resolved.insert(type_name.to_string(), pkg.clone());
        }
        resolved
    }

    /// Merges another collector's state into this one.
    pub fn absorb(&mut self, other: TypeReferenceCollector) {
        self.refs.extend(other.refs);
        self.defined.extend(other.defined);
        self.import_maps.extend(other.import_maps);
        self.resolved.extend(other.resolved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse_expression, parse_module};

    fn refs_of(annotation: &str) -> BTreeSet<String> {
        let mut refs = BTreeSet::new();
        collect_type_refs(&parse_expression(annotation).unwrap(), &mut refs);
        refs
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_nested_forward_reference() {
        assert_eq!(
            refs_of("Optional[Dict[str, \"pkg.Widget\"]]"),
            set(&["pkg.Widget"])
        );
    }

    #[test]
    fn test_union_and_lists() {
        assert_eq!(refs_of("Widget | Gadget | None"), set(&["Gadget", "Widget"]));
        assert_eq!(
            refs_of("Callable[[Request], Response]"),
            set(&["Request", "Response"])
        );
    }

    #[test]
    fn test_stdlib_dotted_names_dropped() {
        assert!(refs_of("os.PathLike").is_empty());
        assert_eq!(refs_of("azure.core.PipelineClient"), set(&["azure.core.PipelineClient"]));
    }

    #[test]
    fn test_bad_forward_reference_is_silent() {
        assert!(refs_of("Optional['not valid [']").is_empty());
    }

    #[test]
    fn test_literal_values_ignored() {
        assert!(refs_of("Literal['fast', 'slow']").is_empty());
    }

    #[test]
    fn test_external_refs_exclude_defined_and_builtin() {
        let mut collector = TypeReferenceCollector::new();
        collector.collect(&parse_expression("List[Widget]").unwrap());
        collector.collect(&parse_expression("Gadget[int]").unwrap());
        collector.collect(&parse_expression("Session").unwrap());
        collector.add_defined_type("Widget");
        collector.add_defined_type("Gadget");

        let external = collector.external_refs();
        assert_eq!(external, set(&["Session"]));
        for name in &external {
            assert!(!is_builtin(name));
            assert!(!collector.defined().contains(strip_generics(name)));
        }
    }

    #[test]
    fn test_resolve_package_precedence() {
        let mut collector = TypeReferenceCollector::new();
        let module = parse_module("from requests.sessions import Session\n").unwrap();
        collector.record_imports("pkg.client", &module);

        let installed = |name: &str| matches!(name, "requests" | "azure.core");
        assert_eq!(
            collector.resolve_package("Session", installed),
            Some("requests".to_string())
        );
        assert_eq!(
            collector.resolve_package("azure.core.pipeline.Policy", installed),
            Some("azure.core".to_string())
        );
        assert_eq!(collector.resolve_package("Unknown", installed), None);

        // Cached: later lookups hit the memo even if the installed set changes.
        assert_eq!(
            collector.resolve_package("Session", |_| false),
            Some("requests".to_string())
        );
    }

    #[test]
    fn test_absorb_merges_state() {
        let mut a = TypeReferenceCollector::new();
        a.collect(&parse_expression("Session").unwrap());
        let mut b = TypeReferenceCollector::new();
        b.collect(&parse_expression("Widget").unwrap());
        b.add_defined_type("Widget");
        b.record_imports("pkg", &parse_module("import requests\n").unwrap());

        a.absorb(b);
        assert_eq!(a.external_refs(), set(&["Session"]));
        assert_eq!(a.import_maps().len(), 1);
    }
}
