//! MyriadMesh Cryptography
//!
//! Signing and verification for records published on the mesh. Nodes are
//! identified by their Ed25519 public key; every signed record carries the
//! key it must verify against.

pub mod error;
pub mod identity;

pub use error::{CryptoError, Result};
pub use identity::{verify_signature, NodeIdentity, SIGNATURE_SIZE};

/// Initialize libsodium. Safe to call more than once.
pub fn init() -> Result<()> {
    sodiumoxide::init().map_err(|_| CryptoError::InitFailed)
}
