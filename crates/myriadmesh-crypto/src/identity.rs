//! Node identity keys and detached signatures

use crate::error::{CryptoError, Result};
use myriadmesh_protocol::{NodeId, NODE_ID_SIZE};
use sodiumoxide::crypto::sign::ed25519;

/// Size of an Ed25519 detached signature
pub const SIGNATURE_SIZE: usize = 64;

/// An Ed25519 keypair whose public half is the node's identity
pub struct NodeIdentity {
    /// Node identifier (the public key bytes)
    pub node_id: NodeId,

    public_key: ed25519::PublicKey,
    secret_key: ed25519::SecretKey,
}

impl NodeIdentity {
    /// Generate a fresh random identity
    pub fn generate() -> Result<Self> {
        crate::init()?;
        let (public_key, secret_key) = ed25519::gen_keypair();
        Self::from_keys(public_key, secret_key)
    }

    /// Derive an identity deterministically from a 32-byte seed
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self> {
        crate::init()?;
        let seed = ed25519::Seed::from_slice(seed).ok_or(CryptoError::InvalidKeyLength {
            expected: ed25519::SEEDBYTES,
            actual: seed.len(),
        })?;
        let (public_key, secret_key) = ed25519::keypair_from_seed(&seed);
        Self::from_keys(public_key, secret_key)
    }

    fn from_keys(public_key: ed25519::PublicKey, secret_key: ed25519::SecretKey) -> Result<Self> {
        let node_id = NodeId::from_slice(&public_key[..]).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: NODE_ID_SIZE,
                actual: public_key[..].len(),
            }
        })?;

        Ok(NodeIdentity {
            node_id,
            public_key,
            secret_key,
        })
    }

    /// Sign a message, returning the detached signature bytes
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        ed25519::sign_detached(message, &self.secret_key).to_bytes()
    }

    /// Public key as hex
    pub fn export_public_key(&self) -> String {
        hex::encode(&self.public_key[..])
    }
}

impl std::fmt::Debug for NodeIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret key
        f.debug_struct("NodeIdentity")
            .field("node_id", &self.node_id)
            .finish_non_exhaustive()
    }
}

/// Verify a detached signature made by `signer` over `message`.
///
/// Malformed keys or signatures verify as false.
pub fn verify_signature(signer: &NodeId, message: &[u8], signature: &[u8; SIGNATURE_SIZE]) -> bool {
    let Some(public_key) = ed25519::PublicKey::from_slice(signer.as_bytes()) else {
        return false;
    };
    let Ok(signature) = ed25519::Signature::from_bytes(signature) else {
        return false;
    };
    ed25519::verify_detached(&signature, message, &public_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let identity = NodeIdentity::generate().unwrap();
        let signature = identity.sign(b"hello mesh");

        assert!(verify_signature(&identity.node_id, b"hello mesh", &signature));
        assert!(!verify_signature(&identity.node_id, b"hello mess", &signature));
    }

    #[test]
    fn test_wrong_signer_rejected() {
        let alice = NodeIdentity::generate().unwrap();
        let bob = NodeIdentity::generate().unwrap();
        let signature = alice.sign(b"payload");

        assert!(!verify_signature(&bob.node_id, b"payload", &signature));
    }

    #[test]
    fn test_zero_signature_rejected() {
        let identity = NodeIdentity::generate().unwrap();
        assert!(!verify_signature(&identity.node_id, b"payload", &[0u8; SIGNATURE_SIZE]));
    }

    #[test]
    fn test_from_seed_is_deterministic() {
        let a = NodeIdentity::from_seed(&[7u8; 32]).unwrap();
        let b = NodeIdentity::from_seed(&[7u8; 32]).unwrap();
        let c = NodeIdentity::from_seed(&[8u8; 32]).unwrap();

        assert_eq!(a.node_id, b.node_id);
        assert_ne!(a.node_id, c.node_id);
        assert_eq!(a.export_public_key(), a.node_id.to_hex());
    }
}
