//! MyriadMesh Protocol Module
//!
//! Identity and addressing types shared by every MyriadMesh crate.

pub mod error;
pub mod types;

pub use error::{ProtocolError, Result};
pub use types::{AdapterType, NodeId, XorMetric, NODE_ID_SIZE};
