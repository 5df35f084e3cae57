//! Single-owner execution context for the node table
//!
//! The state is moved onto a dedicated thread when the context is spawned and
//! never leaves it. Other threads reach it only by sending closures:
//! [`IndexContext::tell`] queues a mutation and returns immediately,
//! [`IndexContext::ask`] queues a query and waits for its answer. Closures run
//! one at a time in the order they were sent, so the state needs no locking.
//!
//! Closures must never block on disk or network I/O; every asker is waiting
//! behind them.

use crate::error::{NodeDbError, Result};
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

type Job<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Handle to a context owning a value of type `S`
pub struct IndexContext<S> {
    tx: mpsc::UnboundedSender<Job<S>>,
}

impl<S> Clone for IndexContext<S> {
    fn clone(&self) -> Self {
        IndexContext {
            tx: self.tx.clone(),
        }
    }
}

impl<S: Send + 'static> IndexContext<S> {
    /// Move `state` onto a new thread called `name`.
    ///
    /// The thread exits once every handle has been dropped.
    pub fn spawn(name: &str, mut state: S) -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job<S>>();

        thread::Builder::new().name(name.to_string()).spawn(move || {
            while let Some(job) = rx.blocking_recv() {
                job(&mut state);
            }
            debug!("index context stopped");
        })?;

        Ok(IndexContext { tx })
    }

    /// Queue `work` without waiting for it
    pub fn tell<F>(&self, work: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        if self.tx.send(Box::new(work)).is_err() {
            warn!("index context closed, dropping work");
        }
    }

    fn submit<F, T>(&self, work: F) -> Result<oneshot::Receiver<T>>
    where
        F: FnOnce(&mut S) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Box::new(move |state: &mut S| {
                // Asker may have given up; nothing to do then
                let _ = reply_tx.send(work(state));
            }))
            .map_err(|_| NodeDbError::ContextClosed)?;
        Ok(reply_rx)
    }

    /// Run `work` on the context and wait for its result
    pub async fn ask<F, T>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut S) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.submit(work)?
            .await
            .map_err(|_| NodeDbError::ContextClosed)
    }

    /// Like [`ask`](Self::ask) for callers outside an async runtime.
    ///
    /// Panics if called from within an async execution context.
    pub fn ask_blocking<F, T>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut S) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.submit(work)?
            .blocking_recv()
            .map_err(|_| NodeDbError::ContextClosed)
    }

    /// Has the owning thread gone away?
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
