//! The node database: a [`NodeTable`] confined to its index context

use crate::clock::{Clock, SystemClock};
use crate::config::NodeDbConfig;
use crate::context::IndexContext;
use crate::contact::RouterContact;
use crate::error::Result;
use crate::executor::DiskExecutor;
use crate::skiplist::{LoadReport, Skiplist};
use crate::table::NodeTable;
use myriadmesh_protocol::NodeId;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Local directory of router contacts.
///
/// Mutations are queued and return immediately; queries wait for the index
/// context to answer. Handles are cheap to clone and all refer to the same
/// table.
#[derive(Clone)]
pub struct NodeDb {
    ctx: IndexContext<NodeTable>,
    store: Option<Arc<Skiplist>>,
    clock: Arc<dyn Clock>,
    load_summary: LoadSummary,
}

/// Counts from the startup scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub purged: usize,
    pub skipped: usize,
}

impl From<&LoadReport> for LoadSummary {
    fn from(report: &LoadReport) -> Self {
        LoadSummary {
            loaded: report.contacts.len(),
            purged: report.purged,
            skipped: report.skipped,
        }
    }
}

impl NodeDb {
    /// Open the database using the system clock
    pub fn open(config: &NodeDbConfig, disk: Arc<dyn DiskExecutor>) -> Result<Self> {
        Self::open_with_clock(config, disk, Arc::new(SystemClock))
    }

    /// Open the database: prepare the on-disk store, load it, then start the
    /// index context. No query can run before loading has finished.
    pub fn open_with_clock(
        config: &NodeDbConfig,
        disk: Arc<dyn DiskExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let store = config
            .root
            .as_ref()
            .map(|root| Skiplist::ensure(root, &config.legacy_dir_name))
            .transpose()?
            .map(Arc::new);

        let now = clock.now_ms();
        let mut table = NodeTable::new(store.clone(), disk, config.flush_interval_ms(), now);
        let report = table.load_from_disk(&config.netid, now);

        let ctx = IndexContext::spawn("nodedb-index", table)?;

        Ok(NodeDb {
            ctx,
            store,
            clock,
            load_summary: LoadSummary::from(&report),
        })
    }

    /// What the startup scan found
    pub fn load_summary(&self) -> LoadSummary {
        self.load_summary
    }

    /// Root of the on-disk store, if any
    pub fn root(&self) -> Option<&Path> {
        self.store.as_deref().map(Skiplist::root)
    }

    /// File that holds the contact for `id`. Does no I/O.
    pub fn get_path_for(&self, id: &NodeId) -> Option<PathBuf> {
        self.store.as_ref().map(|store| store.path_for(id))
    }

    /// Store `rc`, replacing any contact for the same router
    pub fn put_rc(&self, rc: RouterContact) {
        let now = self.clock.now_ms();
        self.ctx.tell(move |table| table.put(rc, now));
    }

    /// Store `rc` only if nothing is stored for its router or what is stored
    /// is strictly older
    pub fn put_rc_if_newer(&self, rc: RouterContact) {
        let now = self.clock.now_ms();
        self.ctx.tell(move |table| {
            table.put_if_newer(rc, now);
        });
    }

    /// Forget a router and delete its file
    pub fn remove_router(&self, id: NodeId) {
        self.ctx.tell(move |table| {
            table.remove(&id);
        });
    }

    /// Forget every router inserted before `cutoff` (ms) unless it is in `keep`
    pub fn remove_stale_rcs(&self, keep: HashSet<NodeId>, cutoff: u64) {
        self.ctx.tell(move |table| {
            table.remove_stale(&keep, cutoff);
        });
    }

    /// Forget every router whose contact matches `pred`; returns how many
    pub async fn remove_if<F>(&self, pred: F) -> Result<usize>
    where
        F: FnMut(&RouterContact) -> bool + Send + 'static,
    {
        self.ctx.ask(move |table| table.remove_if(pred)).await
    }

    pub async fn get_rc(&self, id: NodeId) -> Result<Option<RouterContact>> {
        self.ctx
            .ask(move |table| table.get(&id).map(|entry| entry.rc.clone()))
            .await
    }

    pub async fn has_router(&self, id: NodeId) -> Result<bool> {
        self.ctx.ask(move |table| table.contains(&id)).await
    }

    pub async fn num_loaded(&self) -> Result<usize> {
        self.ctx.ask(|table| table.len()).await
    }

    /// The contact whose router is closest to `target`; `None` when empty
    pub async fn find_closest_to(&self, target: NodeId) -> Result<Option<RouterContact>> {
        self.ctx
            .ask(move |table| table.closest_to(&target).cloned())
            .await
    }

    /// Up to `k` contacts ordered by closeness to `target`
    pub async fn find_many_closest_to(
        &self,
        target: NodeId,
        k: usize,
    ) -> Result<Vec<RouterContact>> {
        self.ctx
            .ask(move |table| table.many_closest_to(&target, k))
            .await
    }

    /// A random contact accepted by `filter`
    pub async fn get_random<F>(&self, filter: F) -> Result<Option<RouterContact>>
    where
        F: FnMut(&RouterContact) -> bool + Send + 'static,
    {
        self.ctx.ask(move |table| table.random(filter)).await
    }

    /// Contacts inserted before `cutoff` (ms), ordered by identity.
    ///
    /// Hosts use this to find contacts due for a refresh before evicting
    /// stale ones.
    pub async fn get_inserted_before(&self, cutoff: u64) -> Result<Vec<RouterContact>> {
        self.ctx
            .ask(move |table| table.inserted_before(cutoff))
            .await
    }

    /// Run `visit` on the index context for each contact inserted before
    /// `cutoff` (ms). `visit` must not block.
    pub async fn visit_inserted_before<F>(&self, mut visit: F, cutoff: u64) -> Result<()>
    where
        F: FnMut(&RouterContact) + Send + 'static,
    {
        self.ctx
            .ask(move |table| table.inserted_before(cutoff).iter().for_each(&mut visit))
            .await
    }

    /// Copy of every stored contact, ordered by identity
    pub async fn all_rcs(&self) -> Result<Vec<RouterContact>> {
        self.ctx.ask(|table| table.snapshot()).await
    }

    /// Periodic maintenance, driven by the host roughly once a second
    pub fn tick(&self, now_ms: u64) {
        self.ctx.tell(move |table| {
            table.tick(now_ms);
        });
    }

    /// Next periodic flush deadline (ms), `None` when periodic flushing is off
    pub async fn next_flush_at(&self) -> Result<Option<u64>> {
        self.ctx.ask(|table| table.next_flush_at()).await
    }

    /// Flush every stored contact now.
    ///
    /// Returns once the snapshot has been handed to the disk executor.
    pub async fn save_to_disk(&self) -> Result<()> {
        self.ctx
            .ask(|table| {
                table.save_to_disk();
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::executor::DiskJob;

    fn inline_disk() -> Arc<dyn DiskExecutor> {
        Arc::new(|job: DiskJob| job())
    }

    fn id(first: u8) -> NodeId {
        let mut bytes = [0u8; 32];
        bytes[0] = first;
        NodeId::from_bytes(bytes)
    }

    #[tokio::test]
    async fn test_memory_only_database() {
        let db = NodeDb::open(&NodeDbConfig::default(), inline_disk()).unwrap();
        assert!(db.root().is_none());
        assert!(db.get_path_for(&id(1)).is_none());

        db.put_rc(RouterContact::new(id(1), "myriadmesh", 0, u64::MAX));
        assert_eq!(db.num_loaded().await.unwrap(), 1);
        assert!(db.has_router(id(1)).await.unwrap());
        assert!(!db.has_router(id(2)).await.unwrap());
        assert!(db.get_rc(id(2)).await.unwrap().is_none());
        assert_eq!(db.next_flush_at().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insertion_time_comes_from_clock() {
        let clock = Arc::new(ManualClock::new(1_000));
        let db = NodeDb::open_with_clock(&NodeDbConfig::default(), inline_disk(), clock.clone())
            .unwrap();

        db.put_rc(RouterContact::new(id(1), "myriadmesh", 0, u64::MAX));
        clock.set(2_000);
        db.put_rc(RouterContact::new(id(2), "myriadmesh", 0, u64::MAX));

        db.remove_stale_rcs(HashSet::new(), 1_500);
        assert!(!db.has_router(id(1)).await.unwrap());
        assert!(db.has_router(id(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_closest_on_empty_database() {
        let db = NodeDb::open(&NodeDbConfig::default(), inline_disk()).unwrap();
        assert!(db.find_closest_to(id(9)).await.unwrap().is_none());
        assert!(db.find_many_closest_to(id(9), 3).await.unwrap().is_empty());
        assert!(db.get_random(|_| true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inserted_before_uses_insertion_clock() {
        let clock = Arc::new(ManualClock::new(1_000));
        let db = NodeDb::open_with_clock(&NodeDbConfig::default(), inline_disk(), clock.clone())
            .unwrap();

        db.put_rc(RouterContact::new(id(1), "myriadmesh", 0, u64::MAX));
        clock.set(2_000);
        db.put_rc(RouterContact::new(id(2), "myriadmesh", 0, u64::MAX));

        let due = db.get_inserted_before(2_000).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].pubkey, id(1));

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        db.visit_inserted_before(move |rc| sink.lock().unwrap().push(rc.pubkey), 2_001)
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![id(1), id(2)]);
        assert_eq!(db.num_loaded().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_table() {
        let db = NodeDb::open(&NodeDbConfig::default(), inline_disk()).unwrap();
        let other = db.clone();

        other.put_rc(RouterContact::new(id(3), "myriadmesh", 0, u64::MAX));
        assert_eq!(db.num_loaded().await.unwrap(), 1);
        assert_eq!(db.all_rcs().await.unwrap()[0].pubkey, id(3));
    }
}
