//! Router contacts: the signed descriptors stored in the node database

use crate::error::{NodeDbError, Result};
use bincode::Options;
use myriadmesh_crypto::{NodeIdentity, SIGNATURE_SIZE};
use myriadmesh_protocol::types::AdapterType;
use myriadmesh_protocol::NodeId;
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::fs;
use std::path::Path;

/// Largest encoded router contact accepted from disk or the wire
pub const MAX_RC_SIZE: u64 = 8 * 1024;

/// Current router contact format version
pub const RC_VERSION: u8 = 1;

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_RC_SIZE)
}

/// How to reach a router over one adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    /// Adapter type
    pub adapter_type: AdapterType,

    /// Address for this adapter (protocol-specific)
    pub address: String,
}

/// A signed record a router publishes about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterContact {
    /// Router identity, also the signing key
    pub pubkey: NodeId,

    /// Addresses the router can be reached on
    pub addrs: Vec<AddressInfo>,

    /// Network this router belongs to
    pub netid: String,

    /// Format version
    pub version: u8,

    /// When the router issued this contact (ms since UNIX epoch)
    pub last_updated: u64,

    /// When this contact stops being valid (ms since UNIX epoch)
    pub expires_at: u64,

    /// Ed25519 signature over every other field
    #[serde(with = "BigArray")]
    pub signature: [u8; SIGNATURE_SIZE],
}

/// Borrowed view of the signed portion of a contact
#[derive(Serialize)]
struct SignedFields<'a> {
    pubkey: &'a NodeId,
    addrs: &'a [AddressInfo],
    netid: &'a str,
    version: u8,
    last_updated: u64,
    expires_at: u64,
}

impl RouterContact {
    /// Create an unsigned contact
    pub fn new(
        pubkey: NodeId,
        netid: impl Into<String>,
        last_updated: u64,
        expires_at: u64,
    ) -> Self {
        RouterContact {
            pubkey,
            addrs: Vec::new(),
            netid: netid.into(),
            version: RC_VERSION,
            last_updated,
            expires_at,
            signature: [0u8; SIGNATURE_SIZE],
        }
    }

    /// Add an address
    pub fn with_address(mut self, adapter_type: AdapterType, address: impl Into<String>) -> Self {
        self.addrs.push(AddressInfo {
            adapter_type,
            address: address.into(),
        });
        self
    }

    fn signed_bytes(&self) -> Result<Vec<u8>> {
        let fields = SignedFields {
            pubkey: &self.pubkey,
            addrs: &self.addrs,
            netid: &self.netid,
            version: self.version,
            last_updated: self.last_updated,
            expires_at: self.expires_at,
        };
        Ok(codec().serialize(&fields)?)
    }

    /// Sign this contact as `identity`, replacing its pubkey
    pub fn sign(&mut self, identity: &NodeIdentity) -> Result<()> {
        self.pubkey = identity.node_id;
        let message = self.signed_bytes()?;
        self.signature = identity.sign(&message);
        Ok(())
    }

    /// Check the signature against the embedded pubkey
    pub fn verify_signature(&self) -> bool {
        match self.signed_bytes() {
            Ok(message) => {
                myriadmesh_crypto::verify_signature(&self.pubkey, &message, &self.signature)
            }
            Err(_) => false,
        }
    }

    /// Same as [`verify_signature`](Self::verify_signature) but as a `Result`
    pub fn verify(&self) -> Result<()> {
        if self.verify_signature() {
            Ok(())
        } else {
            Err(NodeDbError::InvalidSignature)
        }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// Will this contact expire within `within_ms` of `now_ms`?
    pub fn expires_soon(&self, now_ms: u64, within_ms: u64) -> bool {
        self.is_expired(now_ms.saturating_add(within_ms))
    }

    pub fn is_from_network(&self, netid: &str) -> bool {
        self.netid == netid
    }

    /// Was this contact issued strictly after `other`?
    pub fn is_newer_than(&self, other: &RouterContact) -> bool {
        self.last_updated > other.last_updated
    }

    /// Encode for storage or transmission
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(codec().serialize(self)?)
    }

    /// Decode from bytes; never panics on malformed input
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() as u64 > MAX_RC_SIZE {
            return Err(NodeDbError::ContactTooLarge {
                size: bytes.len() as u64,
                max: MAX_RC_SIZE,
            });
        }
        Ok(codec().deserialize(bytes)?)
    }

    /// Read a contact file
    pub fn read(path: &Path) -> Result<Self> {
        let size = fs::metadata(path)?.len();
        if size > MAX_RC_SIZE {
            return Err(NodeDbError::ContactTooLarge {
                size,
                max: MAX_RC_SIZE,
            });
        }
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Write a contact file, replacing any previous one atomically
    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("signed.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
