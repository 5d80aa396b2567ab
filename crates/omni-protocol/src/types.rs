//! Telemetry types produced by the decoder.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Attribute keys and values
// ============================================================================

/// Attribute names understood by the fleet platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeKey {
    /// Lock engaged (`lock`).
    Lock,
    /// Alarm or lock event (`alarm`).
    Alarm,
    /// Driver or rider identifier (`driverUniqueId`).
    DriverUniqueId,
    /// Accumulated driving time as reported (`drivingTime`).
    DrivingTime,
    /// Vehicle power switched on (`ignition`).
    Ignition,
    /// Satellites in use (`sat`).
    #[serde(rename = "sat")]
    Satellites,
    /// Horizontal dilution of precision (`hdop`).
    Hdop,
    /// Battery voltage in volts (`battery`).
    Battery,
    /// Battery level in percent (`batteryLevel`).
    BatteryLevel,
    /// Cellular signal strength (`rssi`).
    Rssi,
    /// Device status word (`status`).
    Status,
    /// Raw sentence of an acknowledged-only message (`result`).
    Result,
}

impl AttributeKey {
    /// Get the platform attribute name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKey::Lock => "lock",
            AttributeKey::Alarm => "alarm",
            AttributeKey::DriverUniqueId => "driverUniqueId",
            AttributeKey::DrivingTime => "drivingTime",
            AttributeKey::Ignition => "ignition",
            AttributeKey::Satellites => "sat",
            AttributeKey::Hdop => "hdop",
            AttributeKey::Battery => "battery",
            AttributeKey::BatteryLevel => "batteryLevel",
            AttributeKey::Rssi => "rssi",
            AttributeKey::Status => "status",
            AttributeKey::Result => "result",
        }
    }
}

impl std::fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alarm and lock events reported through the `alarm` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alarm {
    /// Lock engaged by a command or the rider.
    Lock,
    /// Lock released.
    Unlock,
    /// Status report: lock is closed.
    Locked,
    /// Status report: lock is open.
    Unlocked,
    /// Illegal movement.
    FatigueDriving,
    /// Vehicle fell over.
    FallDown,
    /// Lock dismantled.
    Tampering,
    /// Fall-down or tampering alarm cleared by movement.
    Movement,
}

impl Alarm {
    /// Get the platform alarm name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Alarm::Lock => "lock",
            Alarm::Unlock => "unlock",
            Alarm::Locked => "locked",
            Alarm::Unlocked => "unlocked",
            Alarm::FatigueDriving => "fatigueDriving",
            Alarm::FallDown => "fallDown",
            Alarm::Tampering => "tampering",
            Alarm::Movement => "movement",
        }
    }

    /// Map a device fault code to an alarm. Unknown codes map to `None`.
    pub fn from_fault_code(code: i64) -> Option<Alarm> {
        use crate::constants::*;
        match code {
            FAULT_MOVEMENT_ILLEGAL => Some(Alarm::FatigueDriving),
            FAULT_FALL_DOWN => Some(Alarm::FallDown),
            FAULT_TAMPERING => Some(Alarm::Tampering),
            FAULT_FALL_DOWN_CLEARED | FAULT_TAMPERING_CLEARED => Some(Alarm::Movement),
            _ => None,
        }
    }
}

impl std::fmt::Display for Alarm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// Alarm value.
    Alarm(Alarm),
    /// Text value.
    Text(String),
}

impl AttributeValue {
    /// Convert to bool if possible.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to i64 if possible.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to f64 if possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get the alarm if this is an alarm value.
    pub fn as_alarm(&self) -> Option<Alarm> {
        match self {
            AttributeValue::Alarm(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the text if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Integer(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::Alarm(v) => write!(f, "{}", v),
            AttributeValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Integer(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<Alarm> for AttributeValue {
    fn from(v: Alarm) -> Self {
        AttributeValue::Alarm(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

// ============================================================================
// Position fix
// ============================================================================

/// A GNSS fix: time, validity and coordinates in decimal degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Time of the fix.
    pub time: DateTime<Utc>,
    /// Whether the receiver reported the fix as valid.
    #[serde(default)]
    pub valid: bool,
    /// Latitude, negative south.
    pub latitude: f64,
    /// Longitude, negative west.
    pub longitude: f64,
    /// Altitude in meters.
    #[serde(default)]
    pub altitude: f64,
}

impl Default for Fix {
    fn default() -> Self {
        Fix {
            time: DateTime::<Utc>::UNIX_EPOCH,
            valid: false,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
        }
    }
}

// ============================================================================
// Telemetry update
// ============================================================================

/// Normalized result of decoding one sentence.
///
/// The fix is seeded from the device's last known position; only the fields
/// a sentence carries are overlaid on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryUpdate {
    /// Platform device identifier.
    pub device_id: u64,
    /// Protocol name.
    pub protocol: String,
    /// Time the sentence was decoded.
    pub device_time: DateTime<Utc>,
    /// Position fix.
    pub fix: Fix,
    /// True while the fix is the seeded last-known position.
    pub outdated: bool,
    /// Decoded attributes.
    pub attributes: BTreeMap<AttributeKey, AttributeValue>,
}

impl TelemetryUpdate {
    /// Create an update seeded with `fix`.
    pub fn seeded(
        device_id: u64,
        protocol: impl Into<String>,
        device_time: DateTime<Utc>,
        fix: Fix,
    ) -> Self {
        TelemetryUpdate {
            device_id,
            protocol: protocol.into(),
            device_time,
            fix,
            outdated: true,
            attributes: BTreeMap::new(),
        }
    }

    /// Set an attribute, replacing any previous value.
    pub fn set(&mut self, key: AttributeKey, value: impl Into<AttributeValue>) {
        self.attributes.insert(key, value.into());
    }

    /// Get an attribute.
    pub fn get(&self, key: AttributeKey) -> Option<&AttributeValue> {
        self.attributes.get(&key)
    }

    /// Get the alarm attribute.
    pub fn alarm(&self) -> Option<Alarm> {
        self.get(AttributeKey::Alarm).and_then(AttributeValue::as_alarm)
    }

    /// Whether the decoder added anything beyond the seeded fix.
    pub fn has_content(&self) -> bool {
        !self.attributes.is_empty() || !self.outdated
    }
}
