//! Configuration for the dashboard link
//!
//! Loads configuration from a TOML file. All wire thresholds and identifiers
//! are injected here so nothing in the decode path reaches for globals; the
//! whole struct is validated once at construction.

use crate::core::dashboard::{CardinalPoint, Coordinate, GpsArea};
use crate::error::{Error, Result};
use crate::protocol::constants::{
    DEFAULT_BATTERY_HOURS, DEFAULT_BATTERY_MAX_MV, DEFAULT_BATTERY_MIN_MV,
    DEFAULT_DISCOVERY_WINDOW_MS, DEFAULT_FRAME_CAPACITY, DEFAULT_SCAN_INTERVAL_MS,
    DEFAULT_WHEEL_DIAMETER_M, SPP_SERVICE_UUID,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Top-level link configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkConfig {
    pub channel: ChannelConfig,
    pub battery: BatteryConfig,
    pub discovery: DiscoveryConfig,
    /// Optional expected GPS area used to sanity-check fixes
    pub geofence: Option<GpsArea>,
}

/// Byte-channel and framing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    /// Frame accumulation buffer capacity in bytes
    pub buffer_capacity: usize,
    /// Well-known service identifier used when opening the byte channel
    pub service_uuid: Uuid,
    /// Wheel diameter in meters, for the RPM to m/s helper
    pub wheel_diameter_m: f64,
}

/// Battery estimation thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatteryConfig {
    /// Pack voltage treated as empty (0%)
    pub min_mv: i32,
    /// Pack voltage treated as full (100%)
    pub max_mv: i32,
    /// Runtime on a full charge, in hours
    pub expected_hours: f32,
}

/// Device discovery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// Bonded-device list refresh interval
    pub scan_interval_ms: u64,
    /// Default active-scan window length
    pub default_window_ms: u64,
}

impl LinkConfig {
    /// Load configuration from a TOML file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: LinkConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Default configuration for the RC car dashboard controller.
    ///
    /// Carries the controller's SPP service identifier and the test-track
    /// area the car is expected to stay in.
    pub fn rc_dashboard_defaults() -> Self {
        Self {
            channel: ChannelConfig {
                buffer_capacity: DEFAULT_FRAME_CAPACITY,
                service_uuid: Uuid::parse_str(SPP_SERVICE_UUID)
                    .expect("well-known SPP identifier parses"),
                wheel_diameter_m: DEFAULT_WHEEL_DIAMETER_M,
            },
            battery: BatteryConfig {
                min_mv: DEFAULT_BATTERY_MIN_MV,
                max_mv: DEFAULT_BATTERY_MAX_MV,
                expected_hours: DEFAULT_BATTERY_HOURS,
            },
            discovery: DiscoveryConfig {
                scan_interval_ms: DEFAULT_SCAN_INTERVAL_MS,
                default_window_ms: DEFAULT_DISCOVERY_WINDOW_MS,
            },
            geofence: Some(GpsArea {
                start_latitude: Coordinate::new(20, 35, 29.2344, CardinalPoint::North),
                start_longitude: Coordinate::new(103, 23, 25.2312, CardinalPoint::West),
                end_latitude: Coordinate::new(20, 37, 22.8828, CardinalPoint::North),
                end_longitude: Coordinate::new(103, 27, 5.0004, CardinalPoint::West),
            }),
        }
    }

    /// Validate field ranges. Run once at construction; the rest of the
    /// crate assumes a valid configuration.
    pub fn validate(&self) -> Result<()> {
        if self.channel.buffer_capacity < 2 {
            return Err(Error::Config(format!(
                "buffer_capacity must be at least 2, got {}",
                self.channel.buffer_capacity
            )));
        }
        if self.channel.wheel_diameter_m <= 0.0 {
            return Err(Error::Config(format!(
                "wheel_diameter_m must be positive, got {}",
                self.channel.wheel_diameter_m
            )));
        }
        if self.battery.min_mv >= self.battery.max_mv {
            return Err(Error::Config(format!(
                "battery range is empty: min {} mV >= max {} mV",
                self.battery.min_mv, self.battery.max_mv
            )));
        }
        if self.battery.expected_hours <= 0.0 {
            return Err(Error::Config(format!(
                "expected_hours must be positive, got {}",
                self.battery.expected_hours
            )));
        }
        if self.discovery.scan_interval_ms == 0 {
            return Err(Error::Config("scan_interval_ms must be nonzero".to_string()));
        }
        if self.discovery.default_window_ms == 0 {
            return Err(Error::Config(
                "default_window_ms must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::rc_dashboard_defaults()
    }
}
