//! MyriadMesh Core Library
//!
//! Ties together the MyriadMesh components:
//! - Cryptography (identity, signing, verification)
//! - Protocol (node IDs, XOR metric, adapter types)
//! - NodeDB (signed router contacts, closest-node queries, on-disk store)

pub use myriadmesh_crypto as crypto;
pub use myriadmesh_nodedb as nodedb;
pub use myriadmesh_protocol as protocol;

pub use crypto::CryptoError;
pub use nodedb::NodeDbError;
pub use protocol::ProtocolError;

/// Initialize the MyriadMesh library
pub fn init() -> Result<(), CryptoError> {
    crypto::init()
}
