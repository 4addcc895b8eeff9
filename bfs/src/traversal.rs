//! This module provides the per-query traversal algorithms.

use std::collections::{HashSet, VecDeque};

use crate::{Graph, NodeId};

/// A pure per-query traversal, evaluated against a shared read-only graph.
///
/// It must only read the graph and allocate its own private state, so that it can run concurrently on any number of workers.
pub type Traversal = fn(&Graph, NodeId) -> Vec<NodeId>;

/// Breadth-first traversal from `start`.
///
/// Return nodes reachable from `start` in the order they were first discovered, starting with `start` itself.
/// Neighbors are discovered in the order the graph lists them, and every node is visited at most once so cycles are harmless.
///
/// ```
/// # use bfs::{traversal, Graph};
/// let graph: Graph = [(0, vec![1]), (1, vec![0])].into_iter().collect();
///
/// assert_eq!(traversal::bfs(&graph, 0), [0, 1]);
/// assert_eq!(traversal::bfs(&graph, 7), [7]);
/// ```
pub fn bfs(graph: &Graph, start: NodeId) -> Vec<NodeId> {
    let mut order = vec![];
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        order.push(node);

        // mark on discovery rather than on visit, so a node is never queued twice
        for &neighbor in graph.neighbors(node) {
            if visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    order
}
