//! Shared graph traversal abstraction.
//!
//! The class reference graph implements this to get multi-source BFS and a
//! closure check for free.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Trait for graph traversal operations.
///
/// # Example
/// ```ignore
/// impl<'a> GraphTraversal for ClassGraph<'a> {
///     type Node = &'a str;
///
///     fn neighbors(&self, node: &&'a str) -> Vec<&'a str> { /* references + subclasses */ }
///     fn contains_node(&self, node: &&'a str) -> bool { self.graph.contains_node(node) }
/// }
///
/// let reachable = graph.reachable_from(graph.roots());
/// ```
pub trait GraphTraversal {
    /// The type used to identify nodes in the graph.
    type Node: Clone + Eq + Hash;

    /// Returns all successors of a node.
    fn neighbors(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn contains_node(&self, node: &Self::Node) -> bool;

    /// Multi-source BFS: every node reachable from any root.
    ///
    /// Complexity is O(|V| + |E|) regardless of the number of roots.
    /// Roots missing from the graph are ignored.
    fn reachable_from<I>(&self, roots: I) -> HashSet<Self::Node>
    where
        I: IntoIterator<Item = Self::Node>,
    {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        for root in roots {
            if self.contains_node(&root) && visited.insert(root.clone()) {
                queue.push_back(root);
            }
        }

        while let Some(node) = queue.pop_front() {
            for neighbor in self.neighbors(&node) {
                if visited.insert(neighbor.clone()) {
                    queue.push_back(neighbor);
                }
            }
        }

        visited
    }

    /// True if no successor of any member lies outside `set`.
    fn is_closed(&self, set: &HashSet<Self::Node>) -> bool {
        set.iter()
            .all(|node| self.neighbors(node).iter().all(|n| set.contains(n)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Class-name graph with explicit edges.
    #[derive(Default)]
    struct NameGraph {
        nodes: HashSet<String>,
        edges: HashMap<String, Vec<String>>,
    }

    impl NameGraph {
        fn add_class(&mut self, name: &str) {
            self.nodes.insert(name.to_string());
        }

        fn add_reference(&mut self, from: &str, to: &str) {
            self.add_class(from);
            self.add_class(to);
            self.edges
                .entry(from.to_string())
                .or_default()
                .push(to.to_string());
        }
    }

    impl GraphTraversal for NameGraph {
        type Node = String;

        fn neighbors(&self, node: &String) -> Vec<String> {
            self.edges.get(node).cloned().unwrap_or_default()
        }

        fn contains_node(&self, node: &String) -> bool {
            self.nodes.contains(node)
        }
    }

    #[test]
    fn test_empty_graph() {
        let graph = NameGraph::default();
        assert!(graph.reachable_from(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_reference_chain() {
        let mut graph = NameGraph::default();
        graph.add_reference("Client", "Pipeline");
        graph.add_reference("Pipeline", "Policy");
        graph.add_class("Orphan");

        let reachable = graph.reachable_from(["Client".to_string()]);
        assert_eq!(reachable.len(), 3);
        assert!(!reachable.contains("Orphan"));
    }

    #[test]
    fn test_multi_source_with_cycle() {
        let mut graph = NameGraph::default();
        graph.add_reference("Client", "Models");
        graph.add_reference("Models", "Client");
        graph.add_reference("AdminClient", "Settings");

        let reachable =
            graph.reachable_from(["Client".to_string(), "AdminClient".to_string()]);
        assert_eq!(reachable.len(), 4);
    }

    #[test]
    fn test_missing_root_ignored() {
        let mut graph = NameGraph::default();
        graph.add_class("Client");

        let reachable = graph.reachable_from(["Client".to_string(), "Missing".to_string()]);
        assert_eq!(reachable.len(), 1);
    }

    #[test]
    fn test_closure_is_fixed_point() {
        let mut graph = NameGraph::default();
        graph.add_reference("Client", "Pipeline");
        graph.add_reference("Pipeline", "Policy");

        let reachable = graph.reachable_from(["Client".to_string()]);
        assert!(graph.is_closed(&reachable));
        assert_eq!(graph.reachable_from(reachable.clone()), reachable);

        let partial: HashSet<String> = ["Client".to_string()].into_iter().collect();
        assert!(!graph.is_closed(&partial));
    }
}
