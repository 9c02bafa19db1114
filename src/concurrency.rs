//! Bounded worker pool for per-file blocking work.
//!
//! Hashing and copying are CPU/IO bound per file. Work items run on tokio's blocking
//! pool with at most `size` in flight; results come back in input order so the
//! driving task can apply them to the store as the single writer.

use crate::error::ApiError;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

/// Bounded pool of blocking workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    /// Pool with exactly `size` workers (at least one).
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    /// Pool sized to the available cores, or `workers` when configured.
    pub fn from_config(workers: Option<usize>) -> Self {
        match workers {
            Some(n) if n > 0 => Self::new(n),
            _ => Self::new(default_parallelism()),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Apply `f` to every item on the blocking pool, yielding results in input order.
    ///
    /// Items are pulled from `items` lazily, only as workers free up. A panicking
    /// worker surfaces as `ApiError::WorkerError` for that item alone.
    pub fn map_ordered<I, T, R, F>(&self, items: I, f: F) -> BoxStream<'static, Result<R, ApiError>>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        stream::iter(items)
            .map(move |item| {
                let f = Arc::clone(&f);
                async move {
                    tokio::task::spawn_blocking(move || f(item))
                        .await
                        .map_err(ApiError::from)
                }
            })
            .buffered(self.size)
            .boxed()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(default_parallelism())
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
