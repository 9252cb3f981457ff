//! Disjoint-set union used as the connectivity oracle during subassembly
//! enumeration: two pieces are in the same set iff they are transitively
//! adjacent in the configuration.

/// Union-find with path compression and union by size.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Returns the representative of `x`'s set, compressing the path walked.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    pub fn union(&mut self, x: usize, y: usize) {
        let mut x = self.find(x);
        let mut y = self.find(y);
        if x == y {
            return;
        }
        if self.size[x] < self.size[y] {
            std::mem::swap(&mut x, &mut y);
        }
        self.parent[y] = x;
        self.size[x] += self.size[y];
    }

    pub fn connected(&mut self, x: usize, y: usize) -> bool {
        self.find(x) == self.find(y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons_start_disconnected() {
        let mut dsu = UnionFind::new(4);
        assert!(!dsu.connected(0, 1));
        assert!(dsu.connected(2, 2));
    }

    #[test]
    fn test_union_is_transitive() {
        let mut dsu = UnionFind::new(5);
        dsu.union(0, 1);
        dsu.union(1, 2);
        assert!(dsu.connected(0, 2));
        assert!(!dsu.connected(0, 3));
    }

    #[test]
    fn test_redundant_union_is_harmless() {
        let mut dsu = UnionFind::new(3);
        dsu.union(0, 1);
        dsu.union(0, 1);
        dsu.union(1, 0);
        assert!(dsu.connected(0, 1));
        assert!(!dsu.connected(0, 2));
    }
}
