//! dashlink - telemetry link for an RC car dashboard
//!
//! Turns the byte stream of a paired remote-controller device into
//! structured vehicle telemetry (position, speed, battery, orientation) and
//! manages the device's connection and discovery lifecycle.
//!
//! ## Architecture
//!
//! ```text
//! raw bytes ──▶ StreamFramer ──▶ Frame ──▶ TelemetryDecoder ──▶ DashboardState
//!                                                                    │
//! ConnectionController ── owns the channel and the reader worker ────┤
//!                                                                    ▼
//! DiscoveryRegistry ── merged device list              DashboardStateStore
//! ```
//!
//! The OS radio stack plugs in through [`transport::RadioTransport`]; the
//! presentation layer reads the [`store::DashboardStateStore`] and the
//! merged device list, and drives [`connection::ConnectionController`] and
//! [`discovery::DiscoveryRegistry`].

pub mod config;
pub mod connection;
pub mod core;
pub mod discovery;
pub mod error;
pub mod protocol;
pub mod store;
pub mod transport;

// Re-export commonly used types
pub use config::LinkConfig;
pub use error::{Error, Result};
