//! The node table: contacts keyed by router identity
//!
//! A `NodeTable` is plain single-threaded state. Once the database is open it
//! lives inside the index context and is only reached through
//! [`NodeDb`](crate::NodeDb). It never touches the filesystem directly after
//! startup; writes and deletions are packaged as jobs for the disk executor.

use crate::contact::RouterContact;
use crate::entry::Entry;
use crate::executor::DiskExecutor;
use crate::skiplist::{remove_files, LoadReport, Skiplist};
use myriadmesh_protocol::{NodeId, XorMetric};
use rand::seq::IteratorRandom;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct NodeTable {
    /// Stored contacts
    entries: HashMap<NodeId, Entry>,

    /// On-disk store, absent for in-memory databases
    store: Option<Arc<Skiplist>>,

    disk: Arc<dyn DiskExecutor>,

    /// Periodic flush interval in ms
    flush_interval: u64,

    /// Next periodic flush deadline in ms; 0 means never
    next_flush_at: u64,
}

/// Closeness to `metric`'s target, ties broken by identity bytes
fn by_distance(metric: &XorMetric, a: &RouterContact, b: &RouterContact) -> Ordering {
    metric
        .compare(&a.pubkey, &b.pubkey)
        .then_with(|| a.pubkey.cmp(&b.pubkey))
}

impl NodeTable {
    pub fn new(
        store: Option<Arc<Skiplist>>,
        disk: Arc<dyn DiskExecutor>,
        flush_interval: u64,
        now_ms: u64,
    ) -> Self {
        let next_flush_at = if flush_interval > 0 && store.is_some() {
            now_ms.saturating_add(flush_interval)
        } else {
            0
        };

        NodeTable {
            entries: HashMap::new(),
            store,
            disk,
            flush_interval,
            next_flush_at,
        }
    }

    /// Populate the table from the on-disk store.
    ///
    /// Must run before the table is handed to the index context; it reads
    /// and deletes files synchronously.
    pub fn load_from_disk(&mut self, netid: &str, now_ms: u64) -> LoadReport {
        let Some(store) = self.store.clone() else {
            return LoadReport::default();
        };

        let report = store.load(netid, now_ms);
        for rc in &report.contacts {
            self.entries
                .insert(rc.pubkey, Entry::new(rc.clone(), now_ms));
        }

        info!(
            "loaded {} RCs from {} ({} purged, {} from other networks)",
            self.entries.len(),
            store.root().display(),
            report.purged,
            report.skipped
        );
        report
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert `rc`, replacing whatever was stored for its identity
    pub fn put(&mut self, rc: RouterContact, now_ms: u64) {
        self.entries.insert(rc.pubkey, Entry::new(rc, now_ms));
    }

    /// Insert `rc` unless an equally new or newer contact is already stored.
    ///
    /// Returns whether the table changed.
    pub fn put_if_newer(&mut self, rc: RouterContact, now_ms: u64) -> bool {
        let replace = match self.entries.get(&rc.pubkey) {
            Some(existing) => rc.is_newer_than(&existing.rc),
            None => true,
        };

        if replace {
            self.put(rc, now_ms);
        }
        replace
    }

    /// Remove one router; its file is deleted only if it was stored
    pub fn remove(&mut self, id: &NodeId) -> bool {
        if self.entries.remove(id).is_some() {
            self.remove_many_from_disk_async([*id]);
            true
        } else {
            false
        }
    }

    /// Remove every entry inserted before `cutoff` that is not in `keep`
    pub fn remove_stale(&mut self, keep: &HashSet<NodeId>, cutoff: u64) -> usize {
        self.remove_matching(|entry| entry.is_stale(cutoff) && !keep.contains(&entry.rc.pubkey))
    }

    /// Remove every entry whose contact matches `pred`
    pub fn remove_if<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&RouterContact) -> bool,
    {
        self.remove_matching(|entry| pred(&entry.rc))
    }

    fn remove_matching<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&Entry) -> bool,
    {
        let mut removed = Vec::new();
        self.entries.retain(|id, entry| {
            if pred(entry) {
                removed.push(*id);
                false
            } else {
                true
            }
        });

        if !removed.is_empty() {
            debug!("removed {} RCs from nodedb", removed.len());
            self.remove_many_from_disk_async(removed.iter().copied());
        }
        removed.len()
    }

    /// The stored contact closest to `target`, if any
    pub fn closest_to(&self, target: &NodeId) -> Option<&RouterContact> {
        let metric = XorMetric::new(*target);
        self.entries
            .values()
            .map(|entry| &entry.rc)
            .min_by(|a, b| by_distance(&metric, a, b))
    }

    /// Up to `k` stored contacts, closest to `target` first
    pub fn many_closest_to(&self, target: &NodeId, k: usize) -> Vec<RouterContact> {
        if k == 0 {
            return Vec::new();
        }

        let metric = XorMetric::new(*target);
        let cmp = |a: &&RouterContact, b: &&RouterContact| by_distance(&metric, a, b);

        let mut all: Vec<&RouterContact> = self.entries.values().map(|entry| &entry.rc).collect();
        if k < all.len() {
            all.select_nth_unstable_by(k - 1, cmp);
            all.truncate(k);
        }
        all.sort_unstable_by(cmp);

        all.into_iter().cloned().collect()
    }

    /// A uniformly random stored contact accepted by `filter`
    pub fn random<F>(&self, mut filter: F) -> Option<RouterContact>
    where
        F: FnMut(&RouterContact) -> bool,
    {
        self.entries
            .values()
            .map(|entry| &entry.rc)
            .filter(|rc| filter(rc))
            .choose(&mut rand::thread_rng())
            .cloned()
    }

    /// Contacts inserted strictly before `cutoff`, ordered by identity
    pub fn inserted_before(&self, cutoff: u64) -> Vec<RouterContact> {
        let mut rcs: Vec<RouterContact> = self
            .entries
            .values()
            .filter(|entry| entry.is_stale(cutoff))
            .map(|entry| entry.rc.clone())
            .collect();
        rcs.sort_unstable_by(|a, b| a.pubkey.cmp(&b.pubkey));
        rcs
    }

    /// Copy of every stored contact, ordered by identity
    pub fn snapshot(&self) -> Vec<RouterContact> {
        let mut rcs: Vec<RouterContact> = self.entries.values().map(|e| e.rc.clone()).collect();
        rcs.sort_unstable_by(|a, b| a.pubkey.cmp(&b.pubkey));
        rcs
    }

    /// Next periodic flush deadline, if periodic flushing is on
    pub fn next_flush_at(&self) -> Option<u64> {
        (self.next_flush_at != 0).then_some(self.next_flush_at)
    }

    /// Periodic maintenance; flushes once `now_ms` passes the deadline.
    ///
    /// The deadline advances by exactly one interval per flush so late ticks
    /// do not push later flushes back. Returns whether a flush was dispatched.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if self.next_flush_at == 0 || now_ms <= self.next_flush_at {
            return false;
        }

        // Saturates at u64::MAX, which never fires again and never reads as disabled
        self.next_flush_at = self.next_flush_at.saturating_add(self.flush_interval);
        self.save_to_disk()
    }

    /// Hand a snapshot of the whole table to the disk executor.
    ///
    /// Returns false for in-memory databases.
    pub fn save_to_disk(&self) -> bool {
        let Some(store) = self.store.clone() else {
            return false;
        };

        let rcs = self.snapshot();
        debug!("flushing {} RCs to {}", rcs.len(), store.root().display());

        self.disk.submit(Box::new(move || {
            for rc in &rcs {
                let path = store.path_for(&rc.pubkey);
                if let Err(e) = rc.write(&path) {
                    warn!("failed to write RC {}: {}", rc.pubkey, e);
                }
            }
        }));
        true
    }

    fn remove_many_from_disk_async(&self, ids: impl IntoIterator<Item = NodeId>) {
        let Some(store) = self.store.as_ref() else {
            return;
        };

        let files: BTreeSet<_> = ids.into_iter().map(|id| store.path_for(&id)).collect();
        self.disk.submit(Box::new(move || remove_files(files.iter())));
    }
}
