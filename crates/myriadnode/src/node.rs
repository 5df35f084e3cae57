use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::Config;

use myriadmesh_nodedb::{Clock, DiskIo, DiskIoWorker, NodeDb, SystemClock};
use myriadmesh_protocol::NodeId;

/// How often the database is ticked
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Main node orchestrator
pub struct Node {
    config: Config,
    db: NodeDb,
    disk_worker: DiskIoWorker,
    clock: Arc<dyn Clock>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl Node {
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing node components...");

        myriadmesh_core::init().context("Failed to initialize crypto library")?;

        let (disk, disk_worker) = DiskIo::spawn();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let db = NodeDb::open_with_clock(&config.nodedb_config(), Arc::new(disk), clock.clone())
            .with_context(|| {
                format!(
                    "Failed to open node database at {}",
                    config.nodedb_path().display()
                )
            })?;

        let summary = db.load_summary();
        info!(
            "✓ NodeDB opened ({} loaded, {} purged, {} from other networks)",
            summary.loaded, summary.purged, summary.skipped
        );

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Ok(Self {
            config,
            db,
            disk_worker,
            clock,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// The node database.
    ///
    /// Do not keep clones of the handle past [`run`](Self::run): shutdown
    /// waits for the disk worker, which only stops once every handle is gone.
    pub fn db(&self) -> &NodeDb {
        &self.db
    }

    pub fn shutdown_handle(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run until Ctrl+C or a shutdown signal, then flush and stop
    pub async fn run(mut self) -> Result<()> {
        info!("═══════════════════════════════════════════════");
        info!("  MyriadNode is now running");
        info!("═══════════════════════════════════════════════");
        info!("  Name: {}", self.config.node.name);
        info!("  Network: {}", self.config.node.netid);
        info!("  NodeDB: {}", self.config.nodedb_path().display());
        info!("═══════════════════════════════════════════════");

        let mut ticker = interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let stale_period =
            Duration::from_secs(self.config.nodedb.stale_check_interval_secs.max(1));
        let mut stale_check = interval(stale_period);
        stale_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.db.tick(self.clock.now_ms());
                }
                _ = stale_check.tick() => {
                    self.evict_stale().await?;
                }
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C signal");
                    break;
                }
                _ = self.shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        info!("Shutting down MyriadNode...");
        self.shutdown().await
    }

    /// Routers whose contacts were inserted longer ago than the refresh age
    pub async fn routers_due_for_refresh(&self) -> Result<Vec<NodeId>> {
        let age_ms = self.config.nodedb.refresh_age_secs.saturating_mul(1000);
        let cutoff = self.clock.now_ms().saturating_sub(age_ms);

        let due = self.db.get_inserted_before(cutoff).await?;
        Ok(due.into_iter().map(|rc| rc.pubkey).collect())
    }

    /// Drop routers that have not been refreshed within the configured age,
    /// and every expired contact. Bootstrap routers are kept.
    pub async fn evict_stale(&self) -> Result<usize> {
        let due = self.routers_due_for_refresh().await?;
        if !due.is_empty() {
            debug!("{} routers due for a contact refresh", due.len());
        }

        let now = self.clock.now_ms();
        let keep: HashSet<NodeId> = self.config.nodedb.bootstrap.iter().copied().collect();
        let age_ms = self.config.nodedb.stale_insertion_age_secs.saturating_mul(1000);

        self.db.remove_stale_rcs(keep.clone(), now.saturating_sub(age_ms));
        let expired = self
            .db
            .remove_if(move |rc| !keep.contains(&rc.pubkey) && rc.is_expired(now))
            .await?;

        let remaining = self.db.num_loaded().await?;
        debug!("stale check: {} expired, {} remaining", expired, remaining);
        Ok(expired)
    }

    async fn shutdown(self) -> Result<()> {
        info!("Flushing NodeDB...");
        self.db.save_to_disk().await?;

        let Node { db, disk_worker, .. } = self;
        drop(db);
        disk_worker.join().await;

        info!("Shutdown complete");
        Ok(())
    }
}
