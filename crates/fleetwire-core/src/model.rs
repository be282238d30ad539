//! Canonical position/event model produced by every decoder.
//!
//! A `Position` is the single normalized output record: identity, three
//! distinct timestamps (device / fix / server), the WGS84 fix itself, an
//! open attribute map keyed by namespaced strings, accumulated alarms and
//! optional network info or a media reference. Attribute storage is a
//! `BTreeMap` so serialized output is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Attribute keys shared across protocol decoders. Indexed families
/// (`adc0`, `temp1`, ...) are built with [`prefixed`].
pub const KEY_SATELLITES: &str = "sat";
pub const KEY_IGNITION: &str = "ignition";
pub const KEY_STATUS: &str = "status";
pub const KEY_POWER: &str = "power";
pub const KEY_BATTERY: &str = "battery";
pub const KEY_BATTERY_LEVEL: &str = "batteryLevel";
pub const KEY_ODOMETER: &str = "odometer";
pub const KEY_HOURS: &str = "hours";
pub const KEY_RSSI: &str = "rssi";
pub const KEY_HDOP: &str = "hdop";
pub const KEY_INDEX: &str = "index";
pub const KEY_INPUT: &str = "input";
pub const KEY_OUTPUT: &str = "output";
pub const KEY_RFID: &str = "rfid";
pub const KEY_FUEL: &str = "fuel";
pub const KEY_RPM: &str = "rpm";
pub const KEY_VERSION_HW: &str = "versionHw";
pub const KEY_VERSION_FW: &str = "versionFw";
pub const KEY_CHARGE: &str = "charge";

pub const PREFIX_ADC: &str = "adc";
pub const PREFIX_TEMP: &str = "temp";

/// Build an indexed attribute key, e.g. `prefixed(PREFIX_ADC, 1)` -> `adc1`.
pub fn prefixed(prefix: &str, index: u32) -> String {
    format!("{prefix}{index}")
}

/// Typed scalar stored in the open attribute map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::Int(value.into())
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Int(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Alarm indicators; a decoder may accumulate more than one per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Alarm {
    General,
    Sos,
    Vibration,
    Movement,
    Overspeed,
    LowBattery,
    PowerCut,
    PowerOff,
    Geofence,
    Tampering,
}

/// One observed cell tower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTower {
    pub mcc: u16,
    pub mnc: u16,
    pub lac: u32,
    pub cell_id: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signal: Option<i32>,
}

/// One observed Wi-Fi access point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WifiAccessPoint {
    pub mac: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signal: Option<i32>,
}

/// Radio environment reported alongside (or instead of) a GNSS fix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub cell_towers: Vec<CellTower>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub wifi_access_points: Vec<WifiAccessPoint>,
}

impl Network {
    pub fn single_cell(tower: CellTower) -> Self {
        Network {
            cell_towers: vec![tower],
            wifi_access_points: Vec::new(),
        }
    }
}

/// Canonical telemetry record.
///
/// Invariants:
/// - `device_id` is non-zero before the record is emitted downstream.
/// - When a frame carries no fresh fix, location fields come from the
///   last known position (`carry_forward`) and `outdated` is set, never
///   left zeroed.
/// - `speed` is stored in knots, `altitude` in meters, `course` in
///   degrees 0-360.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub device_id: u64,
    pub protocol: String,

    /// Clock reported by the device for this record.
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub device_time: Option<OffsetDateTime>,
    /// Time of the GNSS fix itself; may trail `device_time` when the
    /// frame carries telemetry without a fresh fix.
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub fix_time: Option<OffsetDateTime>,
    /// Wall-clock arrival time; excluded from determinism comparisons.
    #[serde(with = "time::serde::rfc3339")]
    pub server_time: OffsetDateTime,

    pub valid: bool,
    pub outdated: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
    pub course: f64,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub alarms: Vec<Alarm>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub network: Option<Network>,
    /// Opaque reference returned by the media sink for a completed
    /// photo/audio transfer.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub media: Option<String>,
}

impl Position {
    pub fn new(protocol: &str, device_id: u64) -> Self {
        Position {
            device_id,
            protocol: protocol.to_string(),
            device_time: None,
            fix_time: None,
            server_time: OffsetDateTime::now_utc(),
            valid: false,
            outdated: false,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            speed: 0.0,
            course: 0.0,
            alarms: Vec::new(),
            attributes: BTreeMap::new(),
            network: None,
            media: None,
        }
    }

    /// Set device and fix time together, the common case for frames
    /// where the device reports a single timestamp.
    pub fn set_time(&mut self, time: OffsetDateTime) {
        self.device_time = Some(time);
        self.fix_time = Some(time);
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn add_alarm(&mut self, alarm: Alarm) {
        if !self.alarms.contains(&alarm) {
            self.alarms.push(alarm);
        }
    }

    /// Populate location fields from the last known position instead of
    /// leaving them blank, marking the record as outdated. `device_time`
    /// falls back to the arrival clock when the frame reports none.
    pub fn carry_forward(&mut self, last: Option<&Position>, device_time: Option<OffsetDateTime>) {
        self.outdated = true;
        if let Some(last) = last {
            self.fix_time = last.fix_time;
            self.valid = last.valid;
            self.latitude = last.latitude;
            self.longitude = last.longitude;
            self.altitude = last.altitude;
            self.speed = last.speed;
            self.course = last.course;
        }
        self.device_time = device_time.or(Some(self.server_time));
    }
}
