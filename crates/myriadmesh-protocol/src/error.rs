//! Error types for protocol operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid node ID length: expected 32 bytes, got {0}")]
    InvalidNodeIdLength(usize),

    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),
}
