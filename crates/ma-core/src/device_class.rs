//! Binary sensor device class metadata
//!
//! Defines the device classes binary sensors report, plus the class lists
//! the presence and aggregation logic keys off: which classes indicate
//! presence by default, which classes aggregate with ALL semantics, and
//! which classes feed the health/distress aggregate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Device class of a binary sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinarySensorDeviceClass {
    Battery,
    CarbonMonoxide,
    Cold,
    Connectivity,
    Door,
    GarageDoor,
    Gas,
    Heat,
    Light,
    Lock,
    Moisture,
    Motion,
    Moving,
    Occupancy,
    Opening,
    Plug,
    Power,
    Presence,
    Problem,
    Safety,
    Smoke,
    Sound,
    Tamper,
    Vibration,
    Window,
}

/// Device classes that indicate presence by default
pub const DEFAULT_PRESENCE_DEVICE_CLASSES: &[BinarySensorDeviceClass] = &[
    BinarySensorDeviceClass::Motion,
    BinarySensorDeviceClass::Occupancy,
    BinarySensorDeviceClass::Presence,
];

/// Device classes whose aggregates default to ALL semantics
///
/// Everything else aggregates with ANY semantics.
pub const DEFAULT_AGGREGATE_MODE_ALL: &[BinarySensorDeviceClass] =
    &[BinarySensorDeviceClass::Connectivity];

/// "Problem-like" device classes tracked by the health/distress aggregate
pub const DISTRESS_SENSOR_CLASSES: &[BinarySensorDeviceClass] = &[
    BinarySensorDeviceClass::Battery,
    BinarySensorDeviceClass::CarbonMonoxide,
    BinarySensorDeviceClass::Gas,
    BinarySensorDeviceClass::Moisture,
    BinarySensorDeviceClass::Problem,
    BinarySensorDeviceClass::Safety,
    BinarySensorDeviceClass::Smoke,
    BinarySensorDeviceClass::Tamper,
];

impl BinarySensorDeviceClass {
    /// The device class as its wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Battery => "battery",
            Self::CarbonMonoxide => "carbon_monoxide",
            Self::Cold => "cold",
            Self::Connectivity => "connectivity",
            Self::Door => "door",
            Self::GarageDoor => "garage_door",
            Self::Gas => "gas",
            Self::Heat => "heat",
            Self::Light => "light",
            Self::Lock => "lock",
            Self::Moisture => "moisture",
            Self::Motion => "motion",
            Self::Moving => "moving",
            Self::Occupancy => "occupancy",
            Self::Opening => "opening",
            Self::Plug => "plug",
            Self::Power => "power",
            Self::Presence => "presence",
            Self::Problem => "problem",
            Self::Safety => "safety",
            Self::Smoke => "smoke",
            Self::Sound => "sound",
            Self::Tamper => "tamper",
            Self::Vibration => "vibration",
            Self::Window => "window",
        }
    }

    /// Whether this class feeds the health/distress aggregate
    pub fn is_distress(&self) -> bool {
        DISTRESS_SENSOR_CLASSES.contains(self)
    }
}

impl fmt::Display for BinarySensorDeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BinarySensorDeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown binary sensor device class: {s}"))
    }
}
