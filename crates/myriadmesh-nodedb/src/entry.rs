//! In-memory node database entries

use crate::contact::RouterContact;

/// A router contact plus the local time it entered the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The stored contact
    pub rc: RouterContact,

    /// Local insertion time (ms since UNIX epoch), independent of the
    /// contact's own issuance time
    pub inserted_at: u64,
}

impl Entry {
    pub fn new(rc: RouterContact, inserted_at: u64) -> Self {
        Entry { rc, inserted_at }
    }

    /// Inserted strictly before `cutoff`?
    pub fn is_stale(&self, cutoff: u64) -> bool {
        self.inserted_at < cutoff
    }
}
