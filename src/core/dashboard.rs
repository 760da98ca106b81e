//! Dashboard telemetry model
//!
//! Typed values decoded from the controller's telemetry records: GPS fix in
//! degree/minute/second form, wheel speed, battery estimate and IMU
//! orientation. The top-level [`DashboardState`] is a closed set of variants
//! matched exhaustively by consumers.

use serde::{Deserialize, Serialize};

/// Divisor turning the raw fractional-seconds field (scale 10^5) into
/// fractional minutes.
const SECONDS_SCALE: f64 = 100_000.0;

/// IMU readings outside these bounds are sensor glitches, not physics.
const ACCELERATION_LIMIT_MS2: f64 = 200.0;
const TILT_LIMIT_DEG: i32 = 360;

/// Compass hemisphere qualifier for a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardinalPoint {
    North,
    South,
    East,
    West,
}

impl CardinalPoint {
    /// Sign applied to the decimal-degree value (negative for S/W)
    fn sign(self) -> f64 {
        match self {
            CardinalPoint::South | CardinalPoint::West => -1.0,
            CardinalPoint::North | CardinalPoint::East => 1.0,
        }
    }
}

/// A coordinate in degree/minute/second form as the controller reports it.
///
/// `seconds` holds the raw fractional field (scale 10^5), not arc-seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub degrees: i16,
    pub minutes: i16,
    pub seconds: f64,
    pub cardinal: CardinalPoint,
}

impl Coordinate {
    pub fn new(degrees: i16, minutes: i16, seconds: f64, cardinal: CardinalPoint) -> Self {
        Self {
            degrees,
            minutes,
            seconds,
            cardinal,
        }
    }

    /// Decimal-degree value, negative in the southern/western hemispheres
    pub fn decimal_degrees(&self) -> f64 {
        let magnitude = f64::from(self.degrees)
            + f64::from(self.minutes) / 60.0
            + self.seconds / (60.0 * SECONDS_SCALE);
        self.cardinal.sign() * magnitude
    }
}

/// Expected bounding area used to sanity-check a GPS fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsArea {
    pub start_latitude: Coordinate,
    pub start_longitude: Coordinate,
    pub end_latitude: Coordinate,
    pub end_longitude: Coordinate,
}

impl GpsArea {
    /// Loose per-component containment check.
    ///
    /// Each degree/minute/second component is compared independently and the
    /// comparisons are OR-joined, so this is NOT a rectangle test; a fix can
    /// pass on the strength of a single component. This matches the shipped
    /// dashboard behavior exactly and is kept that way on purpose.
    pub fn contains(&self, latitude: &Coordinate, longitude: &Coordinate) -> bool {
        let lat_in_range = (self.start_latitude.degrees <= latitude.degrees
            || self.start_latitude.minutes <= latitude.minutes
            || self.start_latitude.seconds <= latitude.seconds)
            && (self.end_latitude.degrees >= latitude.degrees
                || self.end_latitude.minutes <= latitude.minutes
                || self.end_latitude.seconds <= latitude.seconds);

        let lon_in_range = (self.start_longitude.degrees <= longitude.degrees
            || self.start_longitude.minutes <= longitude.minutes
            || self.start_longitude.seconds <= longitude.seconds)
            && (self.end_longitude.degrees >= longitude.degrees
                || self.end_longitude.minutes <= longitude.minutes
                || self.end_longitude.seconds <= longitude.seconds);

        lat_in_range && lon_in_range
    }
}

/// GPS fix decoded from a telemetry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsData {
    pub latitude: Coordinate,
    pub longitude: Coordinate,
    pub satellites: u16,
    pub expected_area: Option<GpsArea>,
}

impl GpsData {
    pub fn latitude_decimal_degrees(&self) -> f64 {
        self.latitude.decimal_degrees()
    }

    pub fn longitude_decimal_degrees(&self) -> f64 {
        self.longitude.decimal_degrees()
    }

    /// Whether the fix lies in the configured expected area.
    ///
    /// True when no area is configured.
    pub fn in_expected_area(&self) -> bool {
        match &self.expected_area {
            Some(area) => area.contains(&self.latitude, &self.longitude),
            None => true,
        }
    }
}

/// Orientation and longitudinal acceleration from the onboard IMU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImuData {
    pub acceleration_ms2: f64,
    pub pitch_deg: i32,
    pub roll_deg: i32,
}

impl ImuData {
    /// Plausibility gate for a decoded reading. Readings outside these
    /// limits are discarded in favor of the previous value.
    pub fn within_limits(acceleration_ms2: f64, pitch_deg: i32, roll_deg: i32) -> bool {
        (-ACCELERATION_LIMIT_MS2..=ACCELERATION_LIMIT_MS2).contains(&acceleration_ms2)
            && (-TILT_LIMIT_DEG..=TILT_LIMIT_DEG).contains(&pitch_deg)
            && (-TILT_LIMIT_DEG..=TILT_LIMIT_DEG).contains(&roll_deg)
    }
}

/// Telemetry fields shown while a device is connected.
///
/// Fields a decode does not refresh keep their previous value; only
/// `radio_connected` is authoritative on every valid record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadedState {
    pub radio_connected: bool,
    pub gps: Option<GpsData>,
    pub speed_rpm: Option<f64>,
    pub battery_soc: Option<i32>,
    pub battery_hours_left: Option<f32>,
    pub imu: Option<ImuData>,
}

impl LoadedState {
    /// Ground speed derived from wheel RPM and a wheel diameter.
    ///
    /// The stored value is RPM; this is the one sanctioned conversion path
    /// to meters per second.
    pub fn speed_meters_per_second(&self, wheel_diameter_m: f64) -> Option<f64> {
        self.speed_rpm
            .map(|rpm| rpm / 60.0 * wheel_diameter_m * std::f64::consts::PI)
    }
}

/// Published dashboard state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DashboardState {
    /// No device connected
    Disconnected,
    /// Connected but no complete telemetry record decoded yet
    Loading,
    /// Live telemetry
    Loaded(LoadedState),
}

impl DashboardState {
    pub fn as_loaded(&self) -> Option<&LoadedState> {
        match self {
            DashboardState::Loaded(loaded) => Some(loaded),
            _ => None,
        }
    }
}
