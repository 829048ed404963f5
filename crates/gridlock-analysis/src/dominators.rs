//! Dominator trees (Lengauer-Tarjan) and edge dominators.
//!
//! A vertex `d` **dominates** `v` when every path from the root to `v` passes
//! through `d`. The **immediate dominator** `idom(v)` is the closest strict
//! dominator; linking each vertex to its immediate dominator gives the
//! dominator tree.
//!
//! # Algorithm
//!
//! The simple Lengauer-Tarjan variant with path compression, O(E log V):
//!
//! 1. Number vertices in depth-first preorder from the root.
//! 2. In reverse preorder, compute semidominators via `eval` over a link-eval
//!    forest and resolve immediate dominators from the parent's bucket.
//! 3. Fix up the deferred immediate dominators in preorder.
//!
//! The DFS and the forest compression are both iterative, so road graphs with
//! very long paths do not exhaust the stack.
//!
//! Vertices unreachable from the root have no immediate dominator and are
//! absent from the result. That is not an error.

use std::collections::BTreeSet;

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use tracing::instrument;

use gridlock_core::error::GraphError;
use gridlock_core::graph::{EdgeData, RoadGraph, Vertex, VertexId};

const NONE: usize = usize::MAX;

/// Immediate dominators of every vertex reachable from a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DominatorTree {
    root: usize,
    /// Vertex ids by node index, copied from the analyzed graph.
    ids: Vec<VertexId>,
    /// `idom[v]`, or `NONE` for the root and unreachable vertices.
    idom: Vec<usize>,
    /// Dominator-tree preorder / postorder stamps; `NONE` when unreachable.
    pre: Vec<usize>,
    post: Vec<usize>,
}

impl DominatorTree {
    /// The root vertex.
    #[must_use]
    pub fn root(&self) -> VertexId {
        self.ids[self.root]
    }

    fn index(&self, v: VertexId) -> Option<usize> {
        self.ids.binary_search(&v).ok()
    }

    /// Immediate dominator of `v`; `None` for the root, for vertices not
    /// reachable from the root, and for ids outside the graph.
    #[must_use]
    pub fn immediate_dominator(&self, v: VertexId) -> Option<VertexId> {
        self.index(v)
            .and_then(|i| self.idom_index(i))
            .map(|d| self.ids[d])
    }

    /// Immediate dominator by node index.
    #[must_use]
    pub fn idom_index(&self, v: usize) -> Option<usize> {
        self.idom.get(v).copied().filter(|&d| d != NONE)
    }

    /// True when `v` is reachable from the root (the root included).
    #[must_use]
    pub fn is_reachable(&self, v: VertexId) -> bool {
        self.index(v).is_some_and(|i| self.reachable_index(i))
    }

    #[must_use]
    pub fn reachable_index(&self, v: usize) -> bool {
        self.pre.get(v).is_some_and(|&p| p != NONE)
    }

    /// True when `a` dominates `b` (every vertex dominates itself).
    ///
    /// Constant time. False if either vertex is unreachable.
    #[must_use]
    pub fn dominates(&self, a: VertexId, b: VertexId) -> bool {
        match (self.index(a), self.index(b)) {
            (Some(a), Some(b)) => self.dominates_index(a, b),
            _ => false,
        }
    }

    #[must_use]
    pub fn dominates_index(&self, a: usize, b: usize) -> bool {
        self.reachable_index(a)
            && self.reachable_index(b)
            && self.pre[a] <= self.pre[b]
            && self.post[b] <= self.post[a]
    }
}

/// Compute the dominator tree of `graph` rooted at `root`.
///
/// # Errors
///
/// Returns [`GraphError::UnknownVertex`] if `root` is not in the graph.
#[instrument(skip(graph), fields(vertices = graph.vertex_count()))]
pub fn compute_immediate_dominators(
    graph: &RoadGraph,
    root: VertexId,
) -> Result<DominatorTree, GraphError> {
    let root_idx = graph
        .index_of(root)
        .ok_or(GraphError::UnknownVertex(root))?
        .index();
    let g = graph.petgraph();
    let idom = lengauer_tarjan(g, root_idx);
    let (pre, post) = tree_stamps(g.node_count(), root_idx, &idom);

    Ok(DominatorTree {
        root: root_idx,
        ids: graph.vertex_ids().to_vec(),
        idom,
        pre,
        post,
    })
}

/// The edge set `{(u, v) : idom(v) = u}` of `graph` from `root`.
///
/// Every edge of the graph is tested against the dominator map; edges into
/// unreachable vertices never qualify.
///
/// # Errors
///
/// Returns [`GraphError::UnknownVertex`] if `root` is not in the graph.
pub fn edge_dominators(
    graph: &RoadGraph,
    root: VertexId,
) -> Result<BTreeSet<(VertexId, VertexId)>, GraphError> {
    let tree = compute_immediate_dominators(graph, root)?;
    Ok(edge_dominators_in(graph, &tree))
}

/// [`edge_dominators`] for an already computed tree of `graph`.
#[must_use]
pub fn edge_dominators_in(
    graph: &RoadGraph,
    tree: &DominatorTree,
) -> BTreeSet<(VertexId, VertexId)> {
    graph
        .petgraph()
        .edge_references()
        .filter(|e| tree.idom_index(e.target().index()) == Some(e.source().index()))
        .map(|e| (graph.id_of(e.source()), graph.id_of(e.target())))
        .collect()
}

// ---------------------------------------------------------------------------
// Lengauer-Tarjan
// ---------------------------------------------------------------------------

/// Immediate dominator per node index (`NONE` for root and unreachable).
fn lengauer_tarjan(g: &DiGraph<Vertex, EdgeData>, root: usize) -> Vec<usize> {
    let n = g.node_count();

    // Step 1: depth-first preorder numbering.
    let mut dfnum = vec![NONE; n];
    let mut vertex: Vec<usize> = Vec::with_capacity(n);
    let mut parent: Vec<usize> = Vec::with_capacity(n);

    dfnum[root] = 0;
    vertex.push(root);
    parent.push(NONE);
    let successors = |v: usize| g.neighbors_directed(NodeIndex::new(v), Direction::Outgoing);
    let mut stack = vec![(root, successors(root))];
    while let Some((v, iter)) = stack.last_mut() {
        let v = *v;
        let Some(w) = iter.next() else {
            stack.pop();
            continue;
        };
        let w = w.index();
        if dfnum[w] == NONE {
            dfnum[w] = vertex.len();
            vertex.push(w);
            parent.push(dfnum[v]);
            stack.push((w, successors(w)));
        }
    }

    // Steps 2 and 3 run in DFS-number space.
    let m = vertex.len();
    let mut forest = Forest::new(m);
    let mut idom = vec![NONE; m];
    let mut bucket: Vec<Vec<usize>> = vec![Vec::new(); m];

    for w in (1..m).rev() {
        for pred in g.neighbors_directed(NodeIndex::new(vertex[w]), Direction::Incoming) {
            let p = dfnum[pred.index()];
            if p == NONE {
                continue;
            }
            let u = forest.eval(p);
            if forest.semi[u] < forest.semi[w] {
                forest.semi[w] = forest.semi[u];
            }
        }
        bucket[forest.semi[w]].push(w);

        let pw = parent[w];
        forest.link(pw, w);
        for v in std::mem::take(&mut bucket[pw]) {
            let u = forest.eval(v);
            idom[v] = if forest.semi[u] < forest.semi[v] { u } else { pw };
        }
    }

    for w in 1..m {
        if idom[w] != forest.semi[w] {
            idom[w] = idom[idom[w]];
        }
    }

    let mut by_node = vec![NONE; n];
    for w in 1..m {
        by_node[vertex[w]] = vertex[idom[w]];
    }
    by_node
}

/// Link-eval forest with path compression.
struct Forest {
    semi: Vec<usize>,
    label: Vec<usize>,
    ancestor: Vec<usize>,
    path: Vec<usize>,
}

impl Forest {
    fn new(m: usize) -> Self {
        Self {
            semi: (0..m).collect(),
            label: (0..m).collect(),
            ancestor: vec![NONE; m],
            path: Vec::new(),
        }
    }

    fn link(&mut self, parent: usize, child: usize) {
        self.ancestor[child] = parent;
    }

    fn eval(&mut self, v: usize) -> usize {
        if self.ancestor[v] == NONE {
            return v;
        }
        self.compress(v);
        self.label[v]
    }

    fn compress(&mut self, v: usize) {
        let mut x = v;
        while self.ancestor[self.ancestor[x]] != NONE {
            self.path.push(x);
            x = self.ancestor[x];
        }
        // Closest-to-root first, mirroring the recursive formulation.
        while let Some(x) = self.path.pop() {
            let a = self.ancestor[x];
            if self.semi[self.label[a]] < self.semi[self.label[x]] {
                self.label[x] = self.label[a];
            }
            self.ancestor[x] = self.ancestor[a];
        }
    }
}

/// Preorder/postorder stamps of the dominator tree for O(1) dominance tests.
fn tree_stamps(n: usize, root: usize, idom: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (v, &d) in idom.iter().enumerate() {
        if d != NONE {
            children[d].push(v);
        }
    }

    let mut pre = vec![NONE; n];
    let mut post = vec![NONE; n];
    let mut clock = 0;
    let mut stack = vec![(root, 0_usize)];
    pre[root] = clock;
    clock += 1;
    while let Some((v, next)) = stack.last_mut() {
        if let Some(&c) = children[*v].get(*next) {
            *next += 1;
            pre[c] = clock;
            clock += 1;
            stack.push((c, 0));
        } else {
            post[*v] = clock;
            clock += 1;
            stack.pop();
        }
    }
    (pre, post)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gridlock_core::graph::Edge;

    fn graph(n: u64, edges: &[(u64, u64)]) -> RoadGraph {
        RoadGraph::build(
            (0..n).map(|v| Vertex::bare(VertexId(v))),
            edges.iter().map(|&(a, b)| Edge::new(a, b)),
        )
        .expect("valid graph")
    }

    fn v(id: u64) -> VertexId {
        VertexId(id)
    }

    #[test]
    fn chain_dominators() {
        let g = graph(4, &[(0, 1), (1, 2), (2, 3)]);
        let tree = compute_immediate_dominators(&g, v(0)).expect("root exists");
        assert_eq!(tree.immediate_dominator(v(0)), None);
        assert_eq!(tree.immediate_dominator(v(1)), Some(v(0)));
        assert_eq!(tree.immediate_dominator(v(3)), Some(v(2)));
        assert!(tree.dominates(v(1), v(3)));
        assert!(!tree.dominates(v(3), v(1)));
        assert!(tree.dominates(v(2), v(2)));
    }

    #[test]
    fn diamond_join_is_dominated_by_entry() {
        // 0 -> {1, 2} -> 3 -> 4
        let g = graph(5, &[(0, 1), (0, 2), (1, 3), (2, 3), (3, 4)]);
        let tree = compute_immediate_dominators(&g, v(0)).expect("root exists");
        assert_eq!(tree.immediate_dominator(v(3)), Some(v(0)));
        assert_eq!(tree.immediate_dominator(v(4)), Some(v(3)));
        assert!(!tree.dominates(v(1), v(3)));
    }

    #[test]
    fn unreachable_vertices_are_absent() {
        let g = graph(4, &[(0, 1), (2, 3)]);
        let tree = compute_immediate_dominators(&g, v(0)).expect("root exists");
        assert!(tree.is_reachable(v(1)));
        assert!(!tree.is_reachable(v(2)));
        assert_eq!(tree.immediate_dominator(v(3)), None);
        assert_eq!(tree.immediate_dominator(v(1)), Some(v(0)));
        assert_eq!(
            edge_dominators_in(&g, &tree).into_iter().collect::<Vec<_>>(),
            vec![(v(0), v(1))]
        );
    }

    #[test]
    fn unknown_root_is_an_error() {
        let g = graph(2, &[(0, 1)]);
        assert_eq!(
            compute_immediate_dominators(&g, v(9)),
            Err(GraphError::UnknownVertex(v(9)))
        );
    }

    #[test]
    fn loop_with_side_entry() {
        // Classic example where semidominator differs from idom.
        // 0 -> 1 -> 2 -> 3 -> 1, 0 -> 3
        let g = graph(4, &[(0, 1), (1, 2), (2, 3), (3, 1), (0, 3)]);
        let tree = compute_immediate_dominators(&g, v(0)).expect("root exists");
        assert_eq!(tree.immediate_dominator(v(1)), Some(v(0)));
        assert_eq!(tree.immediate_dominator(v(2)), Some(v(1)));
        assert_eq!(tree.immediate_dominator(v(3)), Some(v(0)));
    }

    #[test]
    fn edge_dominators_of_cycle_are_all_edges() {
        let g = graph(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        let de = edge_dominators(&g, v(0)).expect("root exists");
        let expected: BTreeSet<_> = [(v(0), v(1)), (v(1), v(2)), (v(2), v(3))].into();
        assert_eq!(de, expected);
    }

    #[test]
    fn edge_dominators_are_idempotent() {
        let g = graph(5, &[(0, 1), (1, 2), (2, 0), (2, 3), (3, 4), (4, 1)]);
        let first = edge_dominators(&g, v(0)).expect("root exists");
        let second = edge_dominators(&g, v(0)).expect("root exists");
        assert_eq!(first, second);
    }

    #[test]
    fn long_path_does_not_overflow_stack() {
        let n = 200_000_u64;
        let edges: Vec<(u64, u64)> = (0..n - 1).map(|i| (i, i + 1)).collect();
        let g = graph(n, &edges);
        let tree = compute_immediate_dominators(&g, v(0)).expect("root exists");
        assert_eq!(tree.immediate_dominator(v(n - 1)), Some(v(n - 2)));
        assert!(tree.dominates(v(0), v(n - 1)));
    }
}
