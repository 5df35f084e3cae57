//! MyriadMesh node database
//!
//! Local directory of signed router contacts:
//! - in-memory table keyed by router identity, owned by a single index context
//! - XOR-distance nearest-neighbour queries for routing decisions
//! - sharded on-disk store with write-behind flushing and async deletion
//! - startup load that purges malformed, expired and badly signed contacts

pub mod clock;
pub mod config;
pub mod contact;
pub mod context;
pub mod entry;
pub mod error;
pub mod executor;
pub mod nodedb;
pub mod skiplist;
pub mod table;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::NodeDbConfig;
pub use contact::{AddressInfo, RouterContact, MAX_RC_SIZE};
pub use context::IndexContext;
pub use entry::Entry;
pub use error::{NodeDbError, Result};
pub use executor::{DiskExecutor, DiskIo, DiskIoWorker, DiskJob};
pub use nodedb::{LoadSummary, NodeDb};
pub use skiplist::{LoadReport, Skiplist};
pub use table::NodeTable;

/// Default number of routers returned by closest-node lookups
pub const K: usize = 20;

/// Entries inserted longer ago than this (ms) are eligible for stale eviction
pub const STALE_INSERTION_AGE_MS: u64 = 12 * 60 * 60 * 1000;
