//! Core protocol types

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{ProtocolError, Result};

/// Size of a node ID in bytes (32 bytes / 256 bits)
pub const NODE_ID_SIZE: usize = 32;

/// A unique identifier for a node in the MyriadMesh network
///
/// The identifier is the node's Ed25519 public key, so it doubles as the
/// verification key for everything the node signs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId([u8; NODE_ID_SIZE]);

impl NodeId {
    /// The all-zero identifier
    pub const ZERO: NodeId = NodeId([0u8; NODE_ID_SIZE]);

    /// Create a NodeId from a byte array
    pub fn from_bytes(bytes: [u8; NODE_ID_SIZE]) -> Self {
        NodeId(bytes)
    }

    /// Create a NodeId from a slice, which must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; NODE_ID_SIZE] = bytes
            .try_into()
            .map_err(|_| ProtocolError::InvalidNodeIdLength(bytes.len()))?;
        Ok(NodeId(arr))
    }

    /// Generate a random NodeId
    pub fn random() -> Self {
        NodeId(rand::random())
    }

    /// Get the bytes of this NodeId
    pub fn as_bytes(&self) -> &[u8; NODE_ID_SIZE] {
        &self.0
    }

    /// Convert to hex string
    ///
    /// This is the canonical text form used for file names and logs.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| ProtocolError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Calculate XOR distance between two node IDs (for Kademlia DHT)
    pub fn distance(&self, other: &NodeId) -> [u8; NODE_ID_SIZE] {
        let mut result = [0u8; NODE_ID_SIZE];
        for (i, item) in result.iter_mut().enumerate() {
            *item = self.0[i] ^ other.0[i];
        }
        result
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.to_hex())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Orders identities by their XOR distance to a fixed target.
///
/// Distances compare as 256-bit big-endian unsigned integers, which is the
/// same as comparing the XOR byte arrays lexicographically.
#[derive(Debug, Clone, Copy)]
pub struct XorMetric {
    target: NodeId,
}

impl XorMetric {
    pub fn new(target: NodeId) -> Self {
        XorMetric { target }
    }

    /// Distance of `id` to the target
    pub fn distance(&self, id: &NodeId) -> [u8; NODE_ID_SIZE] {
        self.target.distance(id)
    }

    /// Compare two identities by closeness to the target
    pub fn compare(&self, a: &NodeId, b: &NodeId) -> Ordering {
        self.distance(a).cmp(&self.distance(b))
    }

    /// True iff `a` is strictly closer to the target than `b`
    pub fn is_closer(&self, a: &NodeId, b: &NodeId) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}

/// Network adapter type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AdapterType {
    /// Ethernet/IP network
    Ethernet = 0x01,
    /// Bluetooth Classic
    Bluetooth = 0x02,
    /// Bluetooth Low Energy
    BluetoothLE = 0x03,
    /// Cellular (4G/5G)
    Cellular = 0x04,
    /// Wi-Fi HaLoW (802.11ah)
    WiFiHaLoW = 0x05,
    /// LoRaWAN
    LoRaWAN = 0x06,
    /// Meshtastic
    Meshtastic = 0x07,
    /// i2p overlay network
    I2P = 0x0E,
    /// Unknown/Custom adapter
    Unknown = 0xFF,
}

impl AdapterType {
    /// Create adapter type from u8
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x01 => AdapterType::Ethernet,
            0x02 => AdapterType::Bluetooth,
            0x03 => AdapterType::BluetoothLE,
            0x04 => AdapterType::Cellular,
            0x05 => AdapterType::WiFiHaLoW,
            0x06 => AdapterType::LoRaWAN,
            0x07 => AdapterType::Meshtastic,
            0x0E => AdapterType::I2P,
            _ => AdapterType::Unknown,
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            AdapterType::Ethernet => "Ethernet/IP",
            AdapterType::Bluetooth => "Bluetooth Classic",
            AdapterType::BluetoothLE => "Bluetooth LE",
            AdapterType::Cellular => "Cellular",
            AdapterType::WiFiHaLoW => "Wi-Fi HaLoW",
            AdapterType::LoRaWAN => "LoRaWAN",
            AdapterType::Meshtastic => "Meshtastic",
            AdapterType::I2P => "i2p",
            AdapterType::Unknown => "Unknown",
        }
    }
}
