//! Fire-and-forget disk I/O
//!
//! The index context never touches the filesystem itself. Anything that
//! reads or writes contact files is packaged as a [`DiskJob`] and handed to a
//! [`DiskExecutor`].

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// A unit of disk work
pub type DiskJob = Box<dyn FnOnce() + Send + 'static>;

/// Accepts disk jobs and runs them off the caller's thread
pub trait DiskExecutor: Send + Sync {
    fn submit(&self, job: DiskJob);
}

impl<F> DiskExecutor for F
where
    F: Fn(DiskJob) + Send + Sync,
{
    fn submit(&self, job: DiskJob) {
        self(job)
    }
}

/// Disk executor backed by the tokio blocking pool.
///
/// Jobs run one at a time in submission order. Cloning is cheap; the worker
/// stops once every handle has been dropped and the queue is drained.
#[derive(Clone)]
pub struct DiskIo {
    tx: mpsc::UnboundedSender<DiskJob>,
}

/// Join handle for the [`DiskIo`] worker task
pub struct DiskIoWorker {
    handle: JoinHandle<()>,
}

impl DiskIo {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn() -> (DiskIo, DiskIoWorker) {
        let (tx, mut rx) = mpsc::unbounded_channel::<DiskJob>();

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(e) = tokio::task::spawn_blocking(job).await {
                    error!("disk job failed: {}", e);
                }
            }
            debug!("disk worker drained");
        });

        (DiskIo { tx }, DiskIoWorker { handle })
    }
}

impl DiskExecutor for DiskIo {
    fn submit(&self, job: DiskJob) {
        if self.tx.send(job).is_err() {
            error!("disk worker gone, dropping job");
        }
    }
}

impl DiskIoWorker {
    /// Wait until every queued job has run.
    ///
    /// Only returns after all [`DiskIo`] handles are dropped.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!("disk worker panicked: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_jobs_run_in_order_and_drain_on_join() {
        let (disk, worker) = DiskIo::spawn();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..10 {
            let seen = seen.clone();
            disk.submit(Box::new(move || seen.lock().unwrap().push(i)));
        }

        drop(disk);
        worker.join().await;

        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_closure_is_an_executor() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let inline = move |job: DiskJob| {
            counter.fetch_add(1, Ordering::SeqCst);
            job();
        };

        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        inline.submit(Box::new(move || {
            ran2.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
