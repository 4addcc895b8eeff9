//! A simple crate providing concurrent breadth-first search queries.
//!
//! Given a read-only [`Graph`], a list of independent query nodes and a number of workers, an [`Evaluator`] runs one breadth-first
//! traversal per query on a fixed pool of asynchronous workers and aggregates every traversal into a [`ResultSet`], mapping each
//! query node to the order its reachable nodes were first discovered in.
//!
//! It makes use of a _single-producer multiple-consumer_ pattern: queries are pushed once through an unbounded `mpsc` channel whose
//! receiving part is shared by all workers behind a `Mutex`, then the channel is sealed so that workers exit as soon as it is drained.
//! The graph is shared immutably through an `Arc` while the result set is the only state mutated concurrently, under a `Mutex`.
//!
//! ```
//! # tokio_test::block_on(async {
//! use std::sync::Arc;
//!
//! use bfs::{concurrent_bfs_queries, Graph};
//!
//! let graph: Graph = [(0, vec![1, 2]), (1, vec![2, 3]), (2, vec![3]), (3, vec![4]), (4, vec![])].into_iter().collect();
//!
//! let results = concurrent_bfs_queries(Arc::new(graph), [0, 1, 2], 2).await;
//!
//! assert_eq!(results[&0], [0, 1, 2, 3, 4]);
//! assert_eq!(results[&1], [1, 2, 3, 4]);
//! assert_eq!(results[&2], [2, 3, 4]);
//! # })
//! ```
//!
//! As a **strong hypothesis**, traversal functions are assumed to be pure and cheap enough to run inline on the async workers without
//! starving the runtime. Heavier traversals should rather be offloaded onto a blocking thread pool.

mod graph;
pub use graph::*;

mod evaluator;
pub use evaluator::*;

pub mod pool;
pub mod traversal;
