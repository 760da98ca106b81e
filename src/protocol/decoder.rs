//! Telemetry payload decoder
//!
//! Pure decode of one 22-byte record against the previously loaded state.
//! Malformed frames never raise; they leave the previous state untouched.

use super::constants::{
    ACCEL_COUNTS_PER_G, FLAG_EAST, FLAG_SOUTH, GRAVITY_MS2, OFFSET_ACCELERATION,
    OFFSET_BATTERY_MV, OFFSET_GPS_FLAGS, OFFSET_LAT_FRAC, OFFSET_LAT_INT, OFFSET_LON_FRAC,
    OFFSET_LON_INT, OFFSET_PITCH, OFFSET_RADIO_STATUS, OFFSET_REV_PERIOD, OFFSET_ROLL,
    RADIO_STATUS_CONNECTED, REV_PERIOD_TICK_US, SATELLITE_COUNT_MASK, SATELLITE_COUNT_SHIFT,
    TELEMETRY_PAYLOAD_SIZE,
};
use super::framer::Frame;
use crate::config::{BatteryConfig, LinkConfig};
use crate::core::dashboard::{
    CardinalPoint, Coordinate, DashboardState, GpsArea, GpsData, ImuData, LoadedState,
};

/// Stateless decoder configured with battery thresholds and the optional
/// expected GPS area.
pub struct TelemetryDecoder {
    battery: BatteryConfig,
    expected_area: Option<GpsArea>,
}

impl TelemetryDecoder {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            battery: config.battery.clone(),
            expected_area: config.geofence.clone(),
        }
    }

    /// Decode one frame, merging with the previously loaded state.
    ///
    /// A frame of the wrong length returns the previous state unchanged, or
    /// `Loading` when nothing has been decoded yet. On a valid frame every
    /// field is refreshed except the IMU reading, which keeps its previous
    /// value when the new one fails the plausibility gate.
    pub fn decode(&self, frame: &Frame, previous: Option<&LoadedState>) -> DashboardState {
        let payload = frame.as_bytes();

        if payload.len() != TELEMETRY_PAYLOAD_SIZE {
            log::debug!(
                "Dropping frame with unexpected length {} (want {})",
                payload.len(),
                TELEMETRY_PAYLOAD_SIZE
            );
            return match previous {
                Some(loaded) => DashboardState::Loaded(loaded.clone()),
                None => DashboardState::Loading,
            };
        }

        let mut state = previous.cloned().unwrap_or_default();

        state.radio_connected = payload[OFFSET_RADIO_STATUS] == RADIO_STATUS_CONNECTED;
        state.gps = Some(self.decode_gps(payload));

        let battery_mv = i32::from(read_u16(payload, OFFSET_BATTERY_MV));
        let (soc, hours_left) = self.decode_battery(battery_mv);
        state.battery_soc = Some(soc);
        state.battery_hours_left = Some(hours_left);

        state.speed_rpm = Some(decode_speed_rpm(read_u16(payload, OFFSET_REV_PERIOD)));

        if let Some(imu) = decode_imu(payload) {
            state.imu = Some(imu);
        }

        DashboardState::Loaded(state)
    }

    fn decode_gps(&self, payload: &[u8]) -> GpsData {
        let flags = payload[OFFSET_GPS_FLAGS];

        let lat_int = read_u16(payload, OFFSET_LAT_INT);
        let lat_cardinal = if flags & FLAG_SOUTH != 0 {
            CardinalPoint::South
        } else {
            CardinalPoint::North
        };

        let lon_int = read_u16(payload, OFFSET_LON_INT);
        let lon_cardinal = if flags & FLAG_EAST != 0 {
            CardinalPoint::East
        } else {
            CardinalPoint::West
        };

        GpsData {
            latitude: Coordinate::new(
                (lat_int / 100) as i16,
                (lat_int % 100) as i16,
                f64::from(read_u24(payload, OFFSET_LAT_FRAC)),
                lat_cardinal,
            ),
            longitude: Coordinate::new(
                (lon_int / 100) as i16,
                (lon_int % 100) as i16,
                f64::from(read_u24(payload, OFFSET_LON_FRAC)),
                lon_cardinal,
            ),
            satellites: u16::from((flags & SATELLITE_COUNT_MASK) >> SATELLITE_COUNT_SHIFT),
            expected_area: self.expected_area.clone(),
        }
    }

    fn decode_battery(&self, battery_mv: i32) -> (i32, f32) {
        let span = self.battery.max_mv - self.battery.min_mv;
        let soc = (battery_mv - self.battery.min_mv).max(0) * 100 / span;
        let hours_left = soc as f32 * self.battery.expected_hours / 100.0;
        (soc, hours_left)
    }
}

/// Wheel speed from the revolution period (10 µs ticks). Zero period means
/// the wheel is not turning.
fn decode_speed_rpm(period_ticks: u16) -> f64 {
    if period_ticks == 0 {
        return 0.0;
    }
    let period_ms = f64::from(period_ticks) * REV_PERIOD_TICK_US / 1000.0;
    60_000.0 / period_ms
}

/// Decode the IMU triple, applying the plausibility gate. Returns `None`
/// when the reading should be discarded in favor of the previous value.
fn decode_imu(payload: &[u8]) -> Option<ImuData> {
    let acceleration_ms2 =
        f64::from(decode_i16(read_u16(payload, OFFSET_ACCELERATION))) * GRAVITY_MS2
            / ACCEL_COUNTS_PER_G;
    let pitch_deg = decode_i16(read_u16(payload, OFFSET_PITCH));
    let roll_deg = decode_i16(read_u16(payload, OFFSET_ROLL));

    if ImuData::within_limits(acceleration_ms2, pitch_deg, roll_deg) {
        Some(ImuData {
            acceleration_ms2,
            pitch_deg,
            roll_deg,
        })
    } else {
        log::debug!(
            "IMU reading out of range (accel {:.2} m/s², pitch {}°, roll {}°), keeping previous",
            acceleration_ms2,
            pitch_deg,
            roll_deg
        );
        None
    }
}

fn read_u16(payload: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([payload[offset], payload[offset + 1]])
}

fn read_u24(payload: &[u8], offset: usize) -> u32 {
    (u32::from(payload[offset]) << 16)
        | (u32::from(payload[offset + 1]) << 8)
        | u32::from(payload[offset + 2])
}

/// Two's-complement decode of a raw big-endian u16 field.
fn decode_i16(raw: u16) -> i32 {
    let raw = i32::from(raw);
    if raw > 32768 {
        raw - 65536
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::DEFAULT_BATTERY_HOURS;

    struct PayloadBuilder {
        bytes: Vec<u8>,
    }

    impl PayloadBuilder {
        fn new() -> Self {
            Self {
                bytes: vec![0u8; TELEMETRY_PAYLOAD_SIZE],
            }
        }

        fn u16_at(mut self, offset: usize, value: u16) -> Self {
            self.bytes[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
            self
        }

        fn u24_at(mut self, offset: usize, value: u32) -> Self {
            self.bytes[offset] = (value >> 16) as u8;
            self.bytes[offset + 1] = (value >> 8) as u8;
            self.bytes[offset + 2] = value as u8;
            self
        }

        fn byte_at(mut self, offset: usize, value: u8) -> Self {
            self.bytes[offset] = value;
            self
        }

        fn frame(self) -> Frame {
            Frame::from(self.bytes)
        }
    }

    fn decoder() -> TelemetryDecoder {
        let mut config = LinkConfig::rc_dashboard_defaults();
        config.geofence = None;
        TelemetryDecoder::new(&config)
    }

    /// Reference record: radio up, fix at 20°35' N / 103°23' W with 7
    /// satellites, 30 ms revolution period, 5000 mV battery, small IMU
    /// values.
    fn golden_frame() -> Frame {
        PayloadBuilder::new()
            .byte_at(OFFSET_RADIO_STATUS, 0)
            .u16_at(OFFSET_LAT_INT, 2035)
            .u24_at(OFFSET_LAT_FRAC, 2_923_440)
            .u16_at(OFFSET_LON_INT, 10323)
            .u24_at(OFFSET_LON_FRAC, 2_523_120)
            .byte_at(OFFSET_GPS_FLAGS, 7 << 2)
            .u16_at(OFFSET_REV_PERIOD, 3000)
            .u16_at(OFFSET_BATTERY_MV, 5000)
            .u16_at(OFFSET_ACCELERATION, 1000)
            .u16_at(OFFSET_PITCH, 10)
            .u16_at(OFFSET_ROLL, 65526)
            .frame()
    }

    #[test]
    fn test_golden_frame_decodes() {
        let state = decoder().decode(&golden_frame(), None);
        let loaded = state.as_loaded().expect("loaded state");

        assert!(loaded.radio_connected);

        let gps = loaded.gps.as_ref().expect("gps data");
        assert_eq!(gps.latitude.degrees, 20);
        assert_eq!(gps.latitude.minutes, 35);
        assert_eq!(gps.latitude.cardinal, CardinalPoint::North);
        assert_eq!(gps.longitude.degrees, 103);
        assert_eq!(gps.longitude.minutes, 23);
        assert_eq!(gps.longitude.cardinal, CardinalPoint::West);
        assert_eq!(gps.satellites, 7);

        let expected_lat = 20.0 + 35.0 / 60.0 + 2_923_440.0 / 6_000_000.0;
        assert!((gps.latitude_decimal_degrees() - expected_lat).abs() < 1e-9);
        assert!(gps.longitude_decimal_degrees() < 0.0);

        // 3000 ticks of 10 µs = 30 ms per revolution = 2000 RPM.
        assert_eq!(loaded.speed_rpm, Some(2000.0));

        // 5000 mV in a 3600..6400 window is 50%, 1.5 h at 3 h full.
        assert_eq!(loaded.battery_soc, Some(50));
        assert_eq!(loaded.battery_hours_left, Some(1.5));

        let imu = loaded.imu.as_ref().expect("imu data");
        let expected_accel = 1000.0 * GRAVITY_MS2 / ACCEL_COUNTS_PER_G;
        assert!((imu.acceleration_ms2 - expected_accel).abs() < 1e-9);
        assert_eq!(imu.pitch_deg, 10);
        assert_eq!(imu.roll_deg, -10);
    }

    #[test]
    fn test_radio_status_nonzero_means_down() {
        let frame = PayloadBuilder::new()
            .byte_at(OFFSET_RADIO_STATUS, 2)
            .frame();
        let state = decoder().decode(&frame, None);
        assert!(!state.as_loaded().unwrap().radio_connected);
    }

    #[test]
    fn test_wrong_length_returns_previous() {
        let decoder = decoder();
        let previous = decoder.decode(&golden_frame(), None);
        let previous_loaded = previous.as_loaded().unwrap();

        let short = Frame::from(vec![0u8; 10]);
        let state = decoder.decode(&short, Some(previous_loaded));
        assert_eq!(state, previous);
    }

    #[test]
    fn test_wrong_length_without_previous_is_loading() {
        let short = Frame::from(vec![0u8; 10]);
        assert_eq!(decoder().decode(&short, None), DashboardState::Loading);
    }

    #[test]
    fn test_imu_gate_retains_previous_reading() {
        let decoder = decoder();
        let first = decoder.decode(&golden_frame(), None);
        let first_loaded = first.as_loaded().unwrap();
        let good_imu = first_loaded.imu.clone().expect("imu data");

        // Pitch of 400° fails the gate; battery change still lands.
        let frame = PayloadBuilder::new()
            .u16_at(OFFSET_REV_PERIOD, 3000)
            .u16_at(OFFSET_BATTERY_MV, 6400)
            .u16_at(OFFSET_PITCH, 400)
            .frame();
        let state = decoder.decode(&frame, Some(first_loaded));
        let loaded = state.as_loaded().unwrap();

        assert_eq!(loaded.imu, Some(good_imu));
        assert_eq!(loaded.battery_soc, Some(100));
    }

    #[test]
    fn test_battery_clamps_to_zero_below_min() {
        let frame = PayloadBuilder::new()
            .u16_at(OFFSET_BATTERY_MV, 3000)
            .frame();
        let loaded_state = decoder().decode(&frame, None);
        let loaded = loaded_state.as_loaded().unwrap();
        assert_eq!(loaded.battery_soc, Some(0));
        assert_eq!(loaded.battery_hours_left, Some(0.0));
    }

    #[test]
    fn test_battery_is_exactly_full_at_max() {
        let frame = PayloadBuilder::new()
            .u16_at(OFFSET_BATTERY_MV, 6400)
            .frame();
        let loaded_state = decoder().decode(&frame, None);
        let loaded = loaded_state.as_loaded().unwrap();
        assert_eq!(loaded.battery_soc, Some(100));
        assert_eq!(loaded.battery_hours_left, Some(DEFAULT_BATTERY_HOURS));
    }

    #[test]
    fn test_battery_is_not_clamped_above_max() {
        let frame = PayloadBuilder::new()
            .u16_at(OFFSET_BATTERY_MV, 6500)
            .frame();
        let loaded_state = decoder().decode(&frame, None);
        assert_eq!(loaded_state.as_loaded().unwrap().battery_soc, Some(103));
    }

    #[test]
    fn test_zero_revolution_period_is_zero_rpm() {
        let frame = PayloadBuilder::new().u16_at(OFFSET_REV_PERIOD, 0).frame();
        let loaded_state = decoder().decode(&frame, None);
        assert_eq!(loaded_state.as_loaded().unwrap().speed_rpm, Some(0.0));
    }

    #[test]
    fn test_south_east_flags() {
        let frame = PayloadBuilder::new()
            .byte_at(OFFSET_GPS_FLAGS, FLAG_SOUTH | FLAG_EAST | (3 << 2))
            .frame();
        let loaded_state = decoder().decode(&frame, None);
        let loaded = loaded_state.as_loaded().unwrap();
        let gps = loaded.gps.as_ref().unwrap();
        assert_eq!(gps.latitude.cardinal, CardinalPoint::South);
        assert_eq!(gps.longitude.cardinal, CardinalPoint::East);
        assert_eq!(gps.satellites, 3);
    }

    #[test]
    fn test_sticky_merge_keeps_expected_area() {
        let config = LinkConfig::rc_dashboard_defaults();
        let decoder = TelemetryDecoder::new(&config);
        let state = decoder.decode(&golden_frame(), None);
        let gps = state.as_loaded().unwrap().gps.as_ref().unwrap();
        assert_eq!(gps.expected_area, config.geofence);
    }

    #[test]
    fn test_twos_complement_decode() {
        assert_eq!(decode_i16(0), 0);
        assert_eq!(decode_i16(10), 10);
        assert_eq!(decode_i16(32768), 32768);
        assert_eq!(decode_i16(32769), -32767);
        assert_eq!(decode_i16(65535), -1);
    }
}
