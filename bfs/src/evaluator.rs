use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{self, Future, FutureExt};
use thiserror::Error;

pub use future::{AbortHandle, Aborted, RemoteHandle};

use crate::pool::Pool;
use crate::traversal::{self, Traversal};
use crate::{Graph, NodeId};

/// Number of workers an [`Evaluator`] starts when not told otherwise.
pub const DEFAULT_WORKERS: usize = 4;

/// Evaluation results.
///
/// A mapping between every distinct query node and the nodes its traversal visited, in visiting order.
pub type ResultSet = HashMap<NodeId, Vec<NodeId>>;

/// Error raised when an evaluation is cancelled before completing.
#[derive(Debug, Error)]
pub enum Error {
    /// The evaluation has been aborted through its [`AbortHandle`].
    #[error(transparent)]
    Aborted(#[from] Aborted),
    /// The evaluation did not complete before its deadline.
    #[error(transparent)]
    Timeout(#[from] tokio::time::error::Elapsed),
}

/// Evaluate breadth-first traversals from every node in `queries`, using `workers` concurrent workers.
///
/// A non-positive number of workers is not an error: no work is performed at all and an empty result set is returned.
///
/// ```
/// # tokio_test::block_on(async {
/// # use std::sync::Arc;
/// # use bfs::{concurrent_bfs_queries, Graph};
/// let graph = Arc::new(Graph::new());
///
/// assert_eq!(concurrent_bfs_queries(Arc::clone(&graph), [1, 2], 2).await.len(), 2);
/// assert!(concurrent_bfs_queries(graph, [1, 2], -1).await.is_empty());
/// # })
/// ```
pub async fn concurrent_bfs_queries(graph: Arc<Graph>, queries: impl IntoIterator<Item = NodeId>, workers: i64) -> ResultSet {
    let workers = usize::try_from(workers).unwrap_or_default();

    Evaluator::new(graph).with_workers(workers).evaluate(queries).await
}

/// Bounded concurrent query evaluator.
///
/// Each evaluation starts its own fixed-size [`Pool`] of workers, pushes every query through a shared queue in input order, then seals
/// the queue and waits for the workers to drain it. Workers run a pure [`Traversal`] (breadth-first by default) against the shared
/// graph and store its result into a [`ResultSet`] under a `Mutex`. Nothing outlives a single evaluation.
///
/// Queries are deduplicated before being dispatched, so repeated query nodes are evaluated only once.
/// Workers complete queries in no particular order, which is invisible from the returned mapping.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use bfs::{Evaluator, Graph};
/// let mut graph = Graph::new();
/// graph.add_edge(0, 1).add_edge(1, 2);
///
/// let evaluator = Evaluator::new(graph).with_workers(2);
/// let results = evaluator.evaluate([0, 2, 0]).await;
///
/// assert_eq!(results.len(), 2);
/// assert_eq!(results[&0], [0, 1, 2]);
/// assert_eq!(results[&2], [2]);
/// # })
/// ```
#[derive(Debug, Clone)]
pub struct Evaluator {
    /// The read-only graph shared by all workers.
    graph: Arc<Graph>,
    /// The number of workers started per evaluation, none at all meaning no work is performed.
    workers: usize,
    /// The per-query algorithm.
    traversal: Traversal,
}

impl Evaluator {
    /// Create a new `Evaluator` running breadth-first traversals on [`DEFAULT_WORKERS`] workers.
    pub fn new(graph: impl Into<Arc<Graph>>) -> Self {
        Self {
            graph: graph.into(),
            workers: DEFAULT_WORKERS,
            traversal: traversal::bfs,
        }
    }

    /// Build a new `Evaluator` starting `workers` workers per evaluation.
    #[inline]
    pub fn with_workers(self, workers: usize) -> Self {
        Self { workers, ..self }
    }

    /// Build a new `Evaluator` evaluating queries with `traversal` instead of [`traversal::bfs`].
    #[inline]
    pub fn with_traversal(self, traversal: Traversal) -> Self {
        Self { traversal, ..self }
    }

    /// The graph queries are evaluated against.
    #[inline]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Number of workers requested per evaluation.
    ///
    /// An evaluation never starts more workers than it has distinct queries.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Evaluate every query and resolve once all of them have been evaluated.
    ///
    /// Dropping the returned future cancels the evaluation: every worker is aborted at its next wait for a query.
    ///
    /// # Panics
    /// A panic raised by the traversal on any worker is resumed when awaiting the evaluation.
    pub fn evaluate(&self, queries: impl IntoIterator<Item = NodeId>) -> impl Future<Output = ResultSet> + Send + 'static {
        let size = NonZeroUsize::new(self.workers);
        let graph = Arc::clone(&self.graph);
        let traversal = self.traversal;

        // repeated query nodes are dispatched once, keeping their first position
        let queries: Vec<NodeId> = match size {
            Some(_) => {
                let mut dispatched = HashSet::new();
                queries.into_iter().filter(|&query| dispatched.insert(query)).collect()
            }
            None => vec![],
        };

        async move {
            let Some(size) = size else {
                tracing::debug!("No worker requested, skipping evaluation.");
                return ResultSet::new();
            };

            // workers beyond the number of queries would never receive any
            let Some(size) = NonZeroUsize::new(size.get().min(queries.len())) else {
                tracing::debug!("No query submitted, skipping evaluation.");
                return ResultSet::new();
            };

            tracing::debug!("Evaluating {} queries on {size} workers...", queries.len());

            let results = Arc::new(Mutex::new(ResultSet::with_capacity(queries.len())));

            let pool = Pool::start(size, {
                let results = Arc::clone(&results);

                move |query: NodeId| {
                    let order = traversal(&graph, query);

                    tracing::trace!("Evaluated query {query}, {} nodes visited.", order.len());

                    // only whole entries are ever inserted so a poisoned map is still consistent
                    results.lock().unwrap_or_else(PoisonError::into_inner).insert(query, order);
                }
            });

            for query in queries {
                if pool.submit(query).is_err() {
                    // every worker is gone, `close()` will report why
                    break;
                }
            }

            pool.close().await;

            let results = std::mem::take(&mut *results.lock().unwrap_or_else(PoisonError::into_inner));

            tracing::debug!("Evaluated {} distinct queries.", results.len());

            results
        }
    }

    /// Evaluate every query, giving up once `timeout` has elapsed.
    pub async fn evaluate_timeout(&self, queries: impl IntoIterator<Item = NodeId>, timeout: Duration) -> Result<ResultSet, Error> {
        Ok(tokio::time::timeout(timeout, self.evaluate(queries)).await?)
    }

    /// Evaluate every query in the background and keep remote and abort handles on the evaluation.
    ///
    /// To retrieve the results on completion, just await on the remote handle. Aborting the evaluation cancels every worker, and the remote
    /// handle then returns an `Err(Aborted)`:
    /// ```
    /// # tokio_test::block_on(async {
    /// # use bfs::{Aborted, Evaluator, Graph};
    /// let evaluator = Evaluator::new(Graph::new());
    /// let (remote_handle, abort_handle) = evaluator.spawn([1, 2, 3]);
    ///
    /// abort_handle.abort();
    ///
    /// assert_eq!(remote_handle.await, Err(Aborted));
    /// # })
    /// ```
    /// **Be aware that if you just drop the remote handle, it will automatically cancel the evaluation.**
    ///
    /// This must be called from within a Tokio runtime.
    pub fn spawn(&self, queries: impl IntoIterator<Item = NodeId>) -> (RemoteHandle<Result<ResultSet, Aborted>>, AbortHandle) {
        let (abortable, abort_handle) = future::abortable(self.evaluate(queries));
        let (remote, remote_handle) = abortable.remote_handle();

        tokio::spawn(remote);

        (remote_handle, abort_handle)
    }
}
