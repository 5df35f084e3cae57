//! NodeDB configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default network id
pub const DEFAULT_NETID: &str = "myriadmesh";

/// Default periodic flush interval (5 minutes)
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 300;

/// Directory name used by older releases for the contact store
pub const LEGACY_DIR_NAME: &str = "netdb";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDbConfig {
    /// Root of the on-disk store; `None` keeps everything in memory
    pub root: Option<PathBuf>,

    /// Only contacts from this network are loaded
    pub netid: String,

    /// Seconds between periodic flushes; 0 disables them
    pub flush_interval_secs: u64,

    /// Sibling directory migrated into `root` when `root` is missing
    pub legacy_dir_name: String,
}

impl Default for NodeDbConfig {
    fn default() -> Self {
        NodeDbConfig {
            root: None,
            netid: DEFAULT_NETID.to_string(),
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            legacy_dir_name: LEGACY_DIR_NAME.to_string(),
        }
    }
}

impl NodeDbConfig {
    /// Disk-backed config rooted at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        NodeDbConfig {
            root: Some(root.into()),
            ..Default::default()
        }
    }

    pub fn flush_interval_ms(&self) -> u64 {
        self.flush_interval_secs.saturating_mul(1000)
    }
}
