//! NodeDB error types

use std::path::PathBuf;
use thiserror::Error;

/// NodeDB-specific errors
#[derive(Error, Debug)]
pub enum NodeDbError {
    #[error("nodedb {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Router contact too large: {size} bytes (max {max})")]
    ContactTooLarge { size: u64, max: u64 },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Index context closed")]
    ContextClosed,

    #[error("Protocol error: {0}")]
    Protocol(#[from] myriadmesh_protocol::ProtocolError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] myriadmesh_crypto::CryptoError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for NodeDbError {
    fn from(err: bincode::Error) -> Self {
        NodeDbError::Serialization(err.to_string())
    }
}

/// Result type for NodeDB operations
pub type Result<T> = std::result::Result<T, NodeDbError>;
