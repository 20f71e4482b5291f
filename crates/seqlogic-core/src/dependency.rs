//! Precursor/successor relation between signal groups.
//!
//! Every inverting wire adds an edge from the group root of its start to
//! the group root of its end. A successor is driven on whenever any of its
//! precursors is inactive.

use crate::grouping::SignalGroups;
use crate::model::Wire;
use indexmap::IndexSet;
use std::collections::HashMap;

/// Edges between group roots induced by inverting wires.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    precursors: HashMap<String, IndexSet<String>>,
    successors: HashMap<String, IndexSet<String>>,
}

impl DependencyGraph {
    /// Build the graph from `wires` over already flattened `groups`.
    ///
    /// Wires with an endpoint outside `groups` are skipped.
    pub fn build<'a>(groups: &SignalGroups, wires: impl IntoIterator<Item = &'a Wire>) -> Self {
        let mut graph = Self::default();
        for wire in wires.into_iter().filter(|w| w.not) {
            let (Some(start), Some(end)) = (groups.root(&wire.start), groups.root(&wire.end))
            else {
                continue;
            };
            graph
                .precursors
                .entry(end.to_string())
                .or_default()
                .insert(start.to_string());
            graph
                .successors
                .entry(start.to_string())
                .or_default()
                .insert(end.to_string());
        }
        graph
    }

    /// Roots whose inactivity drives `root` on.
    pub fn precursors(&self, root: &str) -> impl Iterator<Item = &str> {
        self.precursors
            .get(root)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Roots that must be re-evaluated when `root` changes.
    pub fn successors(&self, root: &str) -> impl Iterator<Item = &str> {
        self.successors
            .get(root)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Number of distinct root-to-root edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.successors.values().map(IndexSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (SignalGroups, Vec<Wire>) {
        let ids: Vec<String> = ["a", "b", "c", "d"].iter().map(ToString::to_string).collect();
        let wires = vec![
            Wire::short("a", "b"),
            Wire::inverter("b", "c"),
            Wire::inverter("a", "d"),
            Wire::inverter("c", "a"),
        ];
        let mut groups = SignalGroups::new(&ids);
        groups.union(0, 1);
        groups.flatten();
        (groups, wires)
    }

    #[test]
    fn edges_connect_roots() {
        let (groups, wires) = setup();
        let graph = DependencyGraph::build(&groups, &wires);

        // a and b share root b
        assert_eq!(graph.successors("b").collect::<Vec<_>>(), vec!["c", "d"]);
        assert_eq!(graph.precursors("c").collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(graph.precursors("b").collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(graph.successors("a").count(), 0);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn inverter_inside_group_is_self_edge() {
        let ids: Vec<String> = ["a", "b"].iter().map(ToString::to_string).collect();
        let mut groups = SignalGroups::new(&ids);
        groups.union(0, 1);
        groups.flatten();

        let graph = DependencyGraph::build(&groups, &[Wire::inverter("a", "b")]);
        assert_eq!(graph.precursors("b").collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(graph.successors("b").collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn unknown_endpoints_are_skipped() {
        let ids: Vec<String> = vec!["a".to_string()];
        let groups = SignalGroups::new(&ids);
        let graph = DependencyGraph::build(&groups, &[Wire::inverter("a", "ghost")]);
        assert_eq!(graph.edge_count(), 0);
    }
}
