//! Signal groups: nodes joined by direct wires share one signal.
//!
//! A disjoint-set forest over a dense index per node id. Unions attach the
//! first group's root under the second's, and [`SignalGroups::flatten`]
//! leaves every node pointing straight at its root so lookups after a build
//! need no mutation.

use std::collections::HashMap;

/// Outcome of joining two groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merge {
    /// Root that stopped being a root
    pub absorbed: usize,
    /// Root of the combined group
    pub survivor: usize,
}

/// Union-find over node ids.
#[derive(Debug, Clone, Default)]
pub struct SignalGroups {
    index: HashMap<String, usize>,
    ids: Vec<String>,
    parent: Vec<usize>,
}

impl SignalGroups {
    /// Every id starts as its own group.
    #[must_use]
    pub fn new<'a>(ids: impl IntoIterator<Item = &'a String>) -> Self {
        let ids: Vec<String> = ids.into_iter().cloned().collect();
        let index = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let parent = (0..ids.len()).collect();
        Self { index, ids, parent }
    }

    /// Dense index of `id`.
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Node id at dense index `index`.
    #[must_use]
    pub fn id_at(&self, index: usize) -> &str {
        &self.ids[index]
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if there are no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Root of the group containing `node`, compressing the path walked.
    pub fn find(&mut self, node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = node;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// Join the groups of `a` and `b`. `b`'s root survives.
    ///
    /// Returns `None` if they already share a group.
    pub fn union(&mut self, a: usize, b: usize) -> Option<Merge> {
        let absorbed = self.find(a);
        let survivor = self.find(b);
        if absorbed == survivor {
            return None;
        }
        self.parent[absorbed] = survivor;
        Some(Merge { absorbed, survivor })
    }

    /// Point every node directly at its root.
    pub fn flatten(&mut self) {
        for node in 0..self.parent.len() {
            self.find(node);
        }
    }

    /// Root id of `id`'s group. Exact only after [`SignalGroups::flatten`].
    #[must_use]
    pub fn root(&self, id: &str) -> Option<&str> {
        self.index_of(id).map(|i| self.id_at(self.parent[i]))
    }

    /// Whether `id` is the root of its group.
    #[must_use]
    pub fn is_root(&self, id: &str) -> bool {
        self.index_of(id).is_some_and(|i| self.parent[i] == i)
    }

    /// Root ids in node order.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.parent
            .iter()
            .enumerate()
            .filter(|(i, parent)| i == *parent)
            .map(|(i, _)| self.id_at(i))
    }

    /// Ids sharing `id`'s group, including `id`. Exact only after flattening.
    #[must_use]
    pub fn members(&self, id: &str) -> Vec<&str> {
        let Some(root) = self.index_of(id).map(|i| self.parent[i]) else {
            return Vec::new();
        };
        self.parent
            .iter()
            .enumerate()
            .filter(|(_, parent)| **parent == root)
            .map(|(i, _)| self.id_at(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(ids: &[&str]) -> SignalGroups {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        SignalGroups::new(&ids)
    }

    #[test]
    fn singletons_are_their_own_roots() {
        let g = groups(&["a", "b"]);
        assert_eq!(g.root("a"), Some("a"));
        assert_eq!(g.roots().count(), 2);
        assert_eq!(g.root("zz"), None);
    }

    #[test]
    fn union_keeps_second_root() {
        let mut g = groups(&["a", "b", "c"]);
        let merge = g.union(0, 1).unwrap();
        assert_eq!(merge, Merge { absorbed: 0, survivor: 1 });
        assert!(g.union(1, 0).is_none());

        g.flatten();
        assert_eq!(g.root("a"), Some("b"));
        assert!(g.is_root("b"));
        assert!(!g.is_root("a"));
    }

    #[test]
    fn chain_collapses_into_one_group() {
        let mut g = groups(&["a", "b", "c", "d"]);
        g.union(0, 1);
        g.union(1, 2);
        g.union(2, 3);
        g.flatten();

        let root = g.root("a").unwrap().to_string();
        for id in ["a", "b", "c", "d"] {
            assert_eq!(g.root(id), Some(root.as_str()));
        }
        assert_eq!(g.roots().count(), 1);
        assert_eq!(g.members("c").len(), 4);
    }

    #[test]
    fn find_compresses_path() {
        let mut g = groups(&["a", "b", "c"]);
        g.union(0, 1);
        g.union(1, 2);
        // a -> b -> c before compression
        assert_eq!(g.find(0), 2);
        assert_eq!(g.parent[0], 2);
    }
}
