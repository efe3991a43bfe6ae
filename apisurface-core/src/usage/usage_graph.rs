//! Class reference graph and client reachability.
//!
//! Nodes are class names (generics stripped). A reference edge `A -> B`
//! exists when `B` is a declared base of `A`, or appears as a whole
//! identifier in one of `A`'s method annotations, return types or property
//! types. Subclass links (`Base -> Derived`) are kept beside the graph and
//! followed only during the reachability closure.
//!
//! Same-named classes in different modules share one node.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use once_cell::sync::Lazy;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use regex::Regex;

use crate::builtins::strip_generics;
use crate::common::GraphTraversal;
use crate::model::{ApiModel, Class};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_]\w*").expect("Hardcoded regex pattern is valid"));

/// Whole identifier tokens of `text`; `PolicyList` never yields `Policy`.
pub fn identifier_tokens(text: &str) -> impl Iterator<Item = &str> {
    IDENTIFIER.find_iter(text).map(|m| m.as_str())
}

/// Normalized class name a base expression refers to (`mod.Base[T]` -> `Base`).
pub fn base_key(base: &str) -> &str {
    let stripped = strip_generics(base.trim());
    stripped.rsplit('.').next().unwrap_or(stripped)
}

pub struct ClassGraph<'a> {
    references: DiGraphMap<&'a str, ()>,
    /// Base -> classes deriving from it.
    subclasses: BTreeMap<&'a str, BTreeSet<&'a str>>,
    /// Distinct class names in model order.
    order: Vec<&'a str>,
    names: HashSet<&'a str>,
    with_methods: HashSet<&'a str>,
    entry_points: HashSet<&'a str>,
}

impl<'a> ClassGraph<'a> {
    pub fn build(model: &'a ApiModel) -> Self {
        let mut graph = ClassGraph {
            references: DiGraphMap::new(),
            subclasses: BTreeMap::new(),
            order: Vec::new(),
            names: HashSet::new(),
            with_methods: HashSet::new(),
            entry_points: HashSet::new(),
        };

        // 1. Nodes
        for class in model.classes() {
            let name = class.base_name();
            if graph.names.insert(name) {
                graph.references.add_node(name);
                graph.order.push(name);
            }
            if class.has_methods() {
                graph.with_methods.insert(name);
            }
            if class.entry_point {
                graph.entry_points.insert(name);
            }
        }

        // 2. Edges
        for class in model.classes() {
            let name = class.base_name();
            for base in class.bases() {
                let key = base_key(base);
                if key != name && graph.references.contains_node(key) {
                    graph.references.add_edge(name, key, ());
                    graph.subclasses.entry(key).or_default().insert(name);
                }
            }
            for referenced in referenced_texts(class).flat_map(identifier_tokens) {
                if referenced != name && graph.references.contains_node(referenced) {
                    graph.references.add_edge(name, referenced, ());
                }
            }
        }

        graph
    }

    /// The graph's own key for `name`.
    fn node(&self, name: &str) -> Option<&'a str> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn has_methods(&self, name: &str) -> bool {
        self.with_methods.contains(name)
    }

    /// Classes `name` references, sorted.
    pub fn references_of(&self, name: &str) -> Vec<&'a str> {
        let Some(node) = self.node(name) else {
            return Vec::new();
        };
        let mut refs: Vec<&'a str> = self.references.neighbors(node).collect();
        refs.sort_unstable();
        refs
    }

    pub fn in_degree(&self, name: &str) -> usize {
        self.node(name).map_or(0, |node| {
            self.references
                .neighbors_directed(node, Direction::Incoming)
                .count()
        })
    }

    fn references_operation(&self, name: &str) -> bool {
        self.node(name).is_some_and(|node| {
            self.references
                .neighbors(node)
                .any(|r| self.with_methods.contains(r))
        })
    }

    /// Root classes in model order.
    ///
    /// Entry points with methods, plus unreferenced classes that have
    /// methods or reference a class with methods. If that is empty, every
    /// class with methods or referencing one.
    pub fn roots(&self) -> Vec<&'a str> {
        let roots: Vec<&'a str> = self
            .order
            .iter()
            .copied()
            .filter(|name| {
                (self.entry_points.contains(name) && self.has_methods(name))
                    || (self.in_degree(name) == 0
                        && (self.has_methods(name) || self.references_operation(name)))
            })
            .collect();

        if !roots.is_empty() {
            return roots;
        }

        self.order
            .iter()
            .copied()
            .filter(|name| self.has_methods(name) || self.references_operation(name))
            .collect()
    }

    /// Reachability closure from [`ClassGraph::roots`].
    pub fn reachable(&self) -> HashSet<&'a str> {
        self.reachable_from(self.roots())
    }
}

impl<'a> GraphTraversal for ClassGraph<'a> {
    type Node = &'a str;

    fn neighbors(&self, node: &&'a str) -> Vec<&'a str> {
        let mut out: Vec<&'a str> = self.references.neighbors(*node).collect();
        if let Some(derived) = self.subclasses.get(node) {
            out.extend(derived.iter().copied());
        }
        out
    }

    fn contains_node(&self, node: &&'a str) -> bool {
        self.references.contains_node(*node)
    }
}

/// Texts of a class that can name other classes: each method's signature
/// string (defaults included), its parameter annotations and return type,
/// and property types.
fn referenced_texts(class: &Class) -> impl Iterator<Item = &str> {
    let methods = class.methods.iter().flat_map(|m| {
        std::iter::once(m.sig.as_str())
            .chain(m.params.iter().filter_map(|p| p.annotation.as_deref()))
            .chain(m.ret.as_deref())
    });
    let properties = class
        .properties
        .iter()
        .filter_map(|p| p.type_name.as_deref());
    methods.chain(properties)
}
