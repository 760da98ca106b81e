//! Constants for the dashboard controller wire protocol

// Frame delimiter (CR LF terminates every record)
pub const DELIMITER_CR: u8 = 0x0D;
pub const DELIMITER_LF: u8 = 0x0A;

/// Default frame accumulation buffer capacity
pub const DEFAULT_FRAME_CAPACITY: usize = 32;

/// Exact length of a telemetry payload (delimiter excluded)
pub const TELEMETRY_PAYLOAD_SIZE: usize = 22;

// Field offsets within the payload
pub const OFFSET_RADIO_STATUS: usize = 0;
pub const OFFSET_LAT_INT: usize = 1;
pub const OFFSET_LAT_FRAC: usize = 3;
pub const OFFSET_LON_INT: usize = 6;
pub const OFFSET_LON_FRAC: usize = 8;
pub const OFFSET_GPS_FLAGS: usize = 11;
pub const OFFSET_REV_PERIOD: usize = 12;
pub const OFFSET_BATTERY_MV: usize = 14;
pub const OFFSET_ACCELERATION: usize = 16;
pub const OFFSET_PITCH: usize = 18;
pub const OFFSET_ROLL: usize = 20;

/// Radio status byte value meaning "link up"
pub const RADIO_STATUS_CONNECTED: u8 = 0;

// GPS flag masks
pub const FLAG_SOUTH: u8 = 0x01;
pub const FLAG_EAST: u8 = 0x02;
pub const SATELLITE_COUNT_MASK: u8 = 0xFC;
pub const SATELLITE_COUNT_SHIFT: u32 = 2;

// Revolution period resolution: one tick is 10 µs
pub const REV_PERIOD_TICK_US: f64 = 10.0;

// IMU raw-unit scaling (16384 counts per g)
pub const ACCEL_COUNTS_PER_G: f64 = 16384.0;
pub const GRAVITY_MS2: f64 = 9.81;

// Battery defaults for the stock controller pack
pub const DEFAULT_BATTERY_MIN_MV: i32 = 3600;
pub const DEFAULT_BATTERY_MAX_MV: i32 = 6400;
pub const DEFAULT_BATTERY_HOURS: f32 = 3.0;

/// Stock wheel diameter in meters
pub const DEFAULT_WHEEL_DIAMETER_M: f64 = 0.002;

// Discovery defaults
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_DISCOVERY_WINDOW_MS: u64 = 10_000;

/// Serial Port Profile service identifier the controller listens on
pub const SPP_SERVICE_UUID: &str = "00001101-0000-1000-8000-00805F9B34FB";
