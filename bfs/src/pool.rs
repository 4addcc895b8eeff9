//! This module provides a fixed-size pool of workers draining a shared queue.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{self, Future, FutureExt};
use tokio::sync::{mpsc, Mutex};

pub use mpsc::error::SendError;

type Handler<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A fixed-size pool of asynchronous workers, all consuming items from one shared queue.
///
/// Every item submitted to the pool is handled exactly once, by whichever worker is the next one available.
/// Workers only wait while the queue is empty and still open, and exit as soon as the queue has been sealed and drained.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use std::sync::atomic::{AtomicUsize, Ordering};
/// # use std::sync::Arc;
/// # use std::num::NonZeroUsize;
/// # use bfs::pool::Pool;
/// let sum = Arc::new(AtomicUsize::new(0));
///
/// let pool = Pool::start(NonZeroUsize::new(3).unwrap(), {
///     let sum = Arc::clone(&sum);
///     move |i: usize| {
///         sum.fetch_add(i, Ordering::Relaxed);
///     }
/// });
///
/// for i in 0..=5 {
///     pool.submit(i).unwrap();
/// }
///
/// pool.close().await;
///
/// assert_eq!(sum.load(Ordering::Relaxed), 15);
/// # })
/// ```
///
/// _Note: dropping a pool without closing it aborts all of its workers, leaving any pending item unhandled._
#[derive(Debug)]
pub struct Pool<T> {
    /// The pool of workers.
    workers: Vec<Worker>,
    /// The sending part of a channel to push items to the workers.
    ///
    /// The next available worker will wait for an item to be received through the channel.
    sender: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Pool<T> {
    /// Start a pool with `size` workers, each of them handling received items with `handler`.
    ///
    /// This must be called from within a Tokio runtime.
    pub fn start(size: NonZeroUsize, handler: impl Fn(T) + Send + Sync + 'static) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        let receiver = Arc::new(Mutex::new(receiver));
        let handler: Handler<T> = Arc::new(handler);

        static WORKER_ID: AtomicUsize = AtomicUsize::new(0);
        let size = size.get();
        let id = WORKER_ID.fetch_add(size, Ordering::Relaxed);

        let workers = (0..size)
            .map(|i| Worker::new(id.wrapping_add(i), Arc::clone(&receiver), Arc::clone(&handler)))
            .collect();

        Self { workers, sender }
    }

    /// Push an item to the queue.
    ///
    /// The item is given back if no worker is left to receive it, which only happens once every worker has been cancelled or has panicked.
    #[inline]
    pub fn submit(&self, item: T) -> Result<(), SendError<T>> {
        self.sender.send(item)
    }

    /// Number of workers in the pool.
    #[inline]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Seal the queue and wait for the workers to drain it.
    ///
    /// # Panics
    /// A panic raised by the handler on any worker is resumed here.
    pub async fn close(self) {
        let Self { workers, sender } = self;

        drop(sender);

        let outcomes = future::join_all(workers.into_iter().inspect(|worker| {
            tracing::debug!("Stopping worker {}...", worker.id);
        }))
        .await;

        for outcome in outcomes {
            match outcome {
                Ok(()) => {}
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => tracing::warn!("Worker stopped before the queue was drained: {err}"),
            }
        }
    }
}

#[derive(Debug)]
struct Worker {
    id: usize,
    handle: tokio::task::JoinHandle<()>,
}

impl Worker {
    fn new<T: Send + 'static>(id: usize, receiver: Arc<Mutex<mpsc::UnboundedReceiver<T>>>, handler: Handler<T>) -> Worker {
        tracing::debug!("Starting worker {id}...");

        Worker {
            id,
            handle: tokio::spawn(async move {
                loop {
                    // the lock is released as soon as an item is received, not while handling it
                    let message = receiver.lock().await.recv().await;

                    match message {
                        Some(item) => {
                            tracing::trace!("Handling item on worker {id}...");

                            handler(item);
                        }
                        None => {
                            tracing::debug!("Queue drained, shutting down worker {id}.");
                            break;
                        }
                    }
                }
            }),
        }
    }
}

impl Future for Worker {
    type Output = Result<(), tokio::task::JoinError>;

    #[inline]
    fn poll(mut self: std::pin::Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<Self::Output> {
        self.handle.poll_unpin(cx)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // no-op once the task has completed
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_pool(size: usize) -> (Pool<usize>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));

        let pool = Pool::start(NonZeroUsize::new(size).unwrap(), {
            let count = Arc::clone(&count);
            move |_| {
                count.fetch_add(1, Ordering::Relaxed);
            }
        });

        (pool, count)
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_close_drains_queue() {
        let (pool, count) = counting_pool(4);
        assert_eq!(pool.size(), 4);

        for i in 0..100 {
            pool.submit(i).unwrap();
        }

        pool.close().await;

        assert_eq!(count.load(Ordering::Relaxed), 100);
        assert!(logs_contain("Stopping worker"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_close_drains_queue_multi_thread() {
        let (pool, count) = counting_pool(8);

        for i in 0..1_000 {
            pool.submit(i).unwrap();
        }

        pool.close().await;

        assert_eq!(count.load(Ordering::Relaxed), 1_000);
    }

    #[tokio::test]
    async fn test_close_empty_pool() {
        let (pool, count) = counting_pool(2);

        pool.close().await;

        assert_eq!(count.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_drop_aborts_workers() {
        // on a current thread runtime, workers cannot run before the test yields
        let (pool, count) = counting_pool(2);

        for i in 0..10 {
            pool.submit(i).unwrap();
        }

        drop(pool);

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(count.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    #[should_panic(expected = "unexpected item")]
    async fn test_close_resumes_handler_panic() {
        let pool = Pool::start(NonZeroUsize::MIN, |item: usize| {
            assert!(item < 3, "unexpected item");
        });

        for i in 0..5 {
            pool.submit(i).unwrap();
        }

        pool.close().await;
    }
}
