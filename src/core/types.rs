//! Device and connection types shared across the crate

use serde::{Deserialize, Serialize};

/// A remote controller device as shown to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub address: String,
    pub connected: bool,
}

/// Display name used when a device announces itself without one
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown device";

/// A raw discovery event, already narrowed to a typed value by the transport
/// collaborator before it reaches the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAnnouncement {
    pub address: String,
    pub name: Option<String>,
}

impl DeviceAnnouncement {
    /// Convert into the displayed device entry
    pub fn into_device_info(self) -> DeviceInfo {
        DeviceInfo {
            name: self.name.unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string()),
            address: self.address,
            connected: false,
        }
    }
}

/// Lifecycle of the single active connection.
///
/// Written exclusively by the connection controller; everyone else reads
/// snapshots through its state cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(DeviceInfo),
}

impl ConnectionState {
    /// Address of the connected device, if any
    pub fn connected_address(&self) -> Option<&str> {
        match self {
            ConnectionState::Connected(info) => Some(info.address.as_str()),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }
}
