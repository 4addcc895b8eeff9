use std::collections::HashMap;

/// A graph node id.
pub type NodeId = i64;

/// Directed graph description.
///
/// A mapping between node ids and their ordered outgoing neighbor ids. The graph is not required to be connected, and nodes may be
/// recorded without any neighbor. Looking up a node which is not recorded at all is not an error, it just has no neighbors.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Graph {
    adjacency: HashMap<NodeId, Vec<NodeId>>,
}

impl Graph {
    /// Create a new empty `Graph`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty `Graph` with room for at least `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            adjacency: HashMap::with_capacity(capacity),
        }
    }

    /// Record `node` without adding any neighbor to it.
    #[inline]
    pub fn add_node(&mut self, node: NodeId) -> &mut Self {
        self.adjacency.entry(node).or_default();
        self
    }

    /// Append `to` to the neighbors of `from`.
    ///
    /// Neighbors keep their insertion order, which is the order traversals will discover them in.
    /// Only `from` gets recorded as a node, `to` remains unknown until it gets its own entry.
    #[inline]
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> &mut Self {
        self.adjacency.entry(from).or_default().push(to);
        self
    }

    /// Ordered neighbors of `node`, empty when `node` is not recorded.
    #[inline]
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.adjacency.get(&node).map(Vec::as_slice).unwrap_or_default()
    }

    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    /// Recorded node ids, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    /// Number of recorded nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Number of edges, counting duplicated ones.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }
}

impl From<HashMap<NodeId, Vec<NodeId>>> for Graph {
    #[inline]
    fn from(adjacency: HashMap<NodeId, Vec<NodeId>>) -> Self {
        Self { adjacency }
    }
}

impl FromIterator<(NodeId, Vec<NodeId>)> for Graph {
    fn from_iter<I: IntoIterator<Item = (NodeId, Vec<NodeId>)>>(iter: I) -> Self {
        Self {
            adjacency: FromIterator::from_iter(iter),
        }
    }
}

impl Extend<(NodeId, Vec<NodeId>)> for Graph {
    /// Append neighbors to already recorded nodes rather than replacing them.
    fn extend<I: IntoIterator<Item = (NodeId, Vec<NodeId>)>>(&mut self, iter: I) {
        for (node, neighbors) in iter {
            self.adjacency.entry(node).or_default().extend(neighbors);
        }
    }
}
