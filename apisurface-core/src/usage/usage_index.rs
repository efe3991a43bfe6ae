//! Client-method index and the type facts derived from the API model.
//!
//! Everything receiver inference knows comes from here: which classes are
//! clients, which methods they expose, and which functions, methods and
//! properties are declared to produce a client.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::usage_graph::{base_key, ClassGraph};
use crate::builtins::strip_generics;
use crate::model::{split_top_level, ApiModel};

const ASYNC_WRAPPERS: &[&str] = &["Awaitable", "Coroutine", "AsyncIterator", "AsyncIterable"];

fn strip_quotes(text: &str) -> &str {
    let t = text.trim();
    for q in ['"', '\''] {
        if let Some(inner) = t.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner.trim();
        }
    }
    t
}

/// Unwraps `Awaitable[X]`, `Coroutine[A, B, X]`, `AsyncIterator[X]` and
/// `AsyncIterable[X]` plus surrounding quotes.
pub fn unwrap_async_return(ret: &str) -> &str {
    let ret = strip_quotes(ret);
    for wrapper in ASYNC_WRAPPERS {
        let Some(inner) = ret
            .strip_prefix(wrapper)
            .and_then(|r| r.strip_prefix('['))
            .and_then(|r| r.strip_suffix(']'))
        else {
            continue;
        };
        let inner = if *wrapper == "Coroutine" {
            split_top_level(inner).last().copied().unwrap_or(inner)
        } else {
            inner
        };
        return strip_quotes(inner);
    }
    ret
}

/// Class name a declared return or property type produces.
pub fn produced_type(declared: &str) -> &str {
    strip_generics(unwrap_async_return(declared)).trim()
}

/// Coverage universe plus the type facts used by inference.
#[derive(Debug, Clone, Default)]
pub struct ClientIndex {
    /// Client -> method names.
    methods: BTreeMap<String, BTreeSet<String>>,
    /// `Client.method` -> rendered signature.
    signatures: HashMap<String, String>,
    /// Client -> declared bases that are clients.
    bases: HashMap<String, BTreeSet<String>>,
    /// Client -> subclasses that are clients.
    subclasses: HashMap<String, BTreeSet<String>>,
    /// `Class.method` -> client it returns.
    method_returns: HashMap<String, String>,
    /// Function name -> client it returns.
    function_returns: HashMap<String, String>,
    /// `Class.property` -> client it holds.
    property_types: HashMap<String, String>,
}

impl ClientIndex {
    /// Builds the index over the reachability closure of `model`.
    pub fn build(model: &ApiModel) -> Self {
        let graph = ClassGraph::build(model);
        let reachable = graph.reachable();
        Self::from_reachable(model, &reachable)
    }

    /// Builds the index for an already computed reachable set.
    pub fn from_reachable(model: &ApiModel, reachable: &HashSet<&str>) -> Self {
        let mut index = ClientIndex::default();

        for class in model.classes() {
            let name = class.base_name();
            if !reachable.contains(name) || !class.has_methods() {
                continue;
            }
            let methods = index.methods.entry(name.to_string()).or_default();
            for method in &class.methods {
                methods.insert(method.name.clone());
                index
                    .signatures
                    .entry(format!("{}.{}", name, method.name))
                    .or_insert_with(|| method.sig.clone());
            }
        }

        for class in model.classes() {
            let name = class.base_name();
            for method in &class.methods {
                if let Some(client) = method.ret.as_deref().map(produced_type) {
                    if index.is_client(client) {
                        index
                            .method_returns
                            .insert(format!("{}.{}", name, method.name), client.to_string());
                    }
                }
            }
            for prop in &class.properties {
                if let Some(client) = prop.type_name.as_deref().map(|t| strip_generics(t).trim()) {
                    if index.is_client(client) {
                        index
                            .property_types
                            .insert(format!("{}.{}", name, prop.name), client.to_string());
                    }
                }
            }

            if !index.is_client(name) {
                continue;
            }
            for base in class.bases() {
                let base = base_key(base);
                if base != name && index.is_client(base) {
                    index
                        .bases
                        .entry(name.to_string())
                        .or_default()
                        .insert(base.to_string());
                    index
                        .subclasses
                        .entry(base.to_string())
                        .or_default()
                        .insert(name.to_string());
                }
            }
        }

        for func in model.functions() {
            if let Some(client) = func.ret.as_deref().map(produced_type) {
                if index.is_client(client) {
                    index
                        .function_returns
                        .insert(func.name.clone(), client.to_string());
                }
            }
        }

        index
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn is_client(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Clients with their method sets, sorted by client name.
    pub fn clients(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.methods.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn exposes(&self, client: &str, method: &str) -> bool {
        self.methods
            .get(client)
            .is_some_and(|m| m.contains(method))
    }

    pub fn signature(&self, client: &str, method: &str) -> Option<&str> {
        self.signatures
            .get(&format!("{}.{}", client, method))
            .map(String::as_str)
    }

    pub fn method_return(&self, class: &str, method: &str) -> Option<&str> {
        self.method_returns
            .get(&format!("{}.{}", class, method))
            .map(String::as_str)
    }

    pub fn function_return(&self, function: &str) -> Option<&str> {
        self.function_returns.get(function).map(String::as_str)
    }

    pub fn property_type(&self, class: &str, property: &str) -> Option<&str> {
        self.property_types
            .get(&format!("{}.{}", class, property))
            .map(String::as_str)
    }

    pub fn bases_of(&self, client: &str) -> impl Iterator<Item = &str> {
        self.bases
            .get(client)
            .into_iter()
            .flat_map(|s| s.iter().map(String::as_str))
    }

    pub fn subclasses_of(&self, client: &str) -> impl Iterator<Item = &str> {
        self.subclasses
            .get(client)
            .into_iter()
            .flat_map(|s| s.iter().map(String::as_str))
    }

    /// Name-only attribution for calls whose receiver type is unknown.
    ///
    /// A single candidate wins. Several candidates are accepted only if
    /// exactly one of them has no candidate among its bases.
    pub fn attribute_by_name(&self, method: &str) -> Option<&str> {
        let candidates: Vec<&str> = self
            .methods
            .iter()
            .filter(|(_, methods)| methods.contains(method))
            .map(|(client, _)| client.as_str())
            .collect();

        match candidates.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => {
                let roots: Vec<&str> = candidates
                    .iter()
                    .copied()
                    .filter(|c| !self.bases_of(c).any(|b| candidates.contains(&b)))
                    .collect();
                match roots.as_slice() {
                    [root] => Some(*root),
                    _ => None,
                }
            }
        }
    }
}
