//! Union-find over one type partition.
//!
//! # Overview
//!
//! Clusters are connected components under the "score ≥ τ" relation,
//! resolved transitively: a chain `a~b~c` with `a~c` below τ still merges
//! all three. This favors higher fusion over precision and is deliberate
//! policy, not an accident of the data structure.
//!
//! Implemented as a parent-pointer array with path compression and union by
//! rank, indexed by position in the partition's id-sorted member list. One
//! instance is scoped to one partition of one fusion run.

// ---------------------------------------------------------------------------
// UnionFind
// ---------------------------------------------------------------------------

/// Disjoint-set forest over `0..n`.
#[derive(Debug)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    /// Create `n` singleton sets.
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Number of slots (not sets).
    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Returns `true` if the forest has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Find the representative of `x`, compressing the path walked.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Second pass: point everything on the walked path at the root.
        let mut current = x;
        while self.parent[current] != current {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// Merge the sets containing `a` and `b`.
    ///
    /// Returns `true` if the sets were distinct before the call.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }

    /// Group slots by set, preserving slot order inside each group and
    /// ordering groups by their smallest member.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let n = self.len();
        let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); n];
        for slot in 0..n {
            let root = self.find(slot);
            by_root[root].push(slot);
        }
        // A group's first member is its smallest slot, and roots are visited
        // in ascending order, so the result is deterministic.
        by_root.into_iter().filter(|g| !g.is_empty()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_until_union() {
        let mut uf = UnionFind::new(3);
        assert_ne!(uf.find(0), uf.find(1));
        assert_eq!(uf.groups(), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn union_merges_and_reports() {
        let mut uf = UnionFind::new(3);
        assert!(uf.union(0, 1));
        assert!(!uf.union(0, 1), "already merged");
        assert_eq!(uf.find(0), uf.find(1));
        assert_ne!(uf.find(0), uf.find(2));
    }

    #[test]
    fn transitive_chain_forms_one_group() {
        // a~b and b~c merge a, b, c even with no a~c edge.
        let mut uf = UnionFind::new(3);
        uf.union(0, 1);
        uf.union(1, 2);
        assert_eq!(uf.groups(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn groups_are_ordered_by_smallest_member() {
        let mut uf = UnionFind::new(5);
        uf.union(4, 1);
        uf.union(3, 2);
        assert_eq!(uf.groups(), vec![vec![0], vec![1, 4], vec![2, 3]]);
    }

    #[test]
    fn empty_forest() {
        let mut uf = UnionFind::new(0);
        assert!(uf.is_empty());
        assert!(uf.groups().is_empty());
    }
}
