//! Sharded on-disk layout for router contacts
//!
//! Contacts live under 16 subdirectories named by a single hex digit. A
//! contact's shard is the first hex digit of its identity, and its file name
//! is the identity's hex form with a `.signed` suffix:
//!
//! ```text
//! <root>/a/a3f1...9c.signed
//! ```

use crate::contact::RouterContact;
use crate::error::{NodeDbError, Result};
use myriadmesh_protocol::NodeId;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Shard directory names
pub const SKIPLIST_SUBDIRS: &str = "0123456789abcdef";

/// Extension of contact files
pub const RC_FILE_EXT: &str = "signed";

/// Shard label for an identity: the first hex digit of its first byte
pub fn shard_for(id: &NodeId) -> char {
    let nibble = id.as_bytes()[0] >> 4;
    char::from_digit(nibble as u32, 16).unwrap_or('0')
}

/// File name for an identity
pub fn file_name_for(id: &NodeId) -> String {
    format!("{}.{}", id.to_hex(), RC_FILE_EXT)
}

/// Outcome of scanning the store at startup
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Valid contacts, in scan order
    pub contacts: Vec<RouterContact>,

    /// Files removed for being malformed, expired or badly signed
    pub purged: usize,

    /// Files left alone because they belong to another network
    pub skipped: usize,
}

/// The on-disk contact store rooted at one directory
#[derive(Debug, Clone)]
pub struct Skiplist {
    root: PathBuf,
}

impl Skiplist {
    /// Open the store, creating the root and its shards as needed.
    ///
    /// When the root does not exist but a sibling named `legacy_dir_name`
    /// does, the sibling is renamed into place first.
    pub fn ensure(root: impl Into<PathBuf>, legacy_dir_name: &str) -> Result<Self> {
        let root = root.into();

        if !root.exists() {
            let legacy = root
                .parent()
                .map(|parent| parent.join(legacy_dir_name))
                .filter(|old| old.exists());

            match legacy {
                Some(old) => {
                    debug!("migrating {} to {}", old.display(), root.display());
                    fs::rename(&old, &root)?;
                }
                None => fs::create_dir_all(&root)?,
            }
        }

        if !root.is_dir() {
            return Err(NodeDbError::NotADirectory(root));
        }

        for shard in SKIPLIST_SUBDIRS.chars() {
            fs::create_dir_all(root.join(shard.to_string()))?;
        }

        Ok(Skiplist { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the contact for `id` lives. Pure; touches no files.
    pub fn path_for(&self, id: &NodeId) -> PathBuf {
        self.root
            .join(shard_for(id).to_string())
            .join(file_name_for(id))
    }

    /// Scan every shard, returning the contacts worth loading and deleting
    /// the files that never will be.
    pub fn load(&self, netid: &str, now_ms: u64) -> LoadReport {
        let mut report = LoadReport::default();
        let mut purge = BTreeSet::new();

        for shard in SKIPLIST_SUBDIRS.chars() {
            let dir = self.root.join(shard.to_string());
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("cannot read nodedb shard {}: {}", dir.display(), e);
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                let is_contact_file = path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(RC_FILE_EXT);
                if !is_contact_file {
                    continue;
                }

                let rc = match RouterContact::read(&path) {
                    Ok(rc) => rc,
                    Err(e) => {
                        debug!("purging unreadable RC {}: {}", path.display(), e);
                        purge.insert(path);
                        continue;
                    }
                };

                if !rc.is_from_network(netid) {
                    debug!("skipping RC {} from network {:?}", rc.pubkey, rc.netid);
                    report.skipped += 1;
                    continue;
                }

                if rc.is_expired(now_ms) {
                    debug!("purging expired RC {}", rc.pubkey);
                    purge.insert(path);
                    continue;
                }

                if rc.verify_signature() {
                    report.contacts.push(rc);
                } else {
                    debug!("purging RC {} with invalid signature", rc.pubkey);
                    purge.insert(path);
                }
            }
        }

        if !purge.is_empty() {
            warn!("removing {} invalid RCs from disk", purge.len());
            remove_files(purge.iter());
        }
        report.purged = purge.len();

        report
    }
}

/// Delete contact files, ignoring ones that are already gone
pub fn remove_files<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("failed to remove {}: {}", path.display(), e);
            }
        }
    }
}
