//! MyriadNode - daemon hosting a MyriadMesh node database

pub mod config;
pub mod node;

pub use config::Config;
pub use node::Node;
