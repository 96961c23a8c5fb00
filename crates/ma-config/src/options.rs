//! Area option structs with serde defaults

use ma_core::BinarySensorDeviceClass;
use serde::{Deserialize, Serialize};

/// Default clear timeout in seconds
pub const DEFAULT_CLEAR_TIMEOUT: u64 = 60;
/// Default periodic refresh interval in seconds
pub const DEFAULT_UPDATE_INTERVAL: u64 = 60;
/// Default seconds of continuous occupancy before the extended state asserts
pub const DEFAULT_EXTENDED_TIME: u64 = 300;
/// Default clear timeout while the extended state is held
pub const DEFAULT_EXTENDED_TIMEOUT: u64 = 120;
/// Default clear timeout while the sleep state is held
pub const DEFAULT_SLEEP_TIMEOUT: u64 = 300;
/// Default minimum tracked entities before an aggregate is created
pub const DEFAULT_MIN_ENTITIES: usize = 2;

/// What kind of area this is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaKind {
    /// A regular indoor area tracking its own sensors
    #[default]
    Interior,
    /// An outdoor area tracking its own sensors
    Exterior,
    /// An area aggregating child areas instead of raw sensors
    Meta,
}

impl AreaKind {
    /// The kind as its wire string (exposed as the `type` attribute)
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaKind::Interior => "interior",
            AreaKind::Exterior => "exterior",
            AreaKind::Meta => "meta",
        }
    }

    /// Whether this area aggregates child areas
    pub fn is_meta(&self) -> bool {
        matches!(self, AreaKind::Meta)
    }
}

/// Per-area configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaOptions {
    /// Area kind (interior, exterior or meta)
    #[serde(default)]
    pub kind: AreaKind,

    /// Child area slugs, in configured order (meta areas only)
    #[serde(default)]
    pub child_areas: Vec<String>,

    /// State values that count as "active" for presence sensors
    #[serde(default = "default_on_states")]
    pub on_states: Vec<String>,

    /// Seconds to hold occupancy after the last sensor goes inactive
    #[serde(default = "default_clear_timeout")]
    pub clear_timeout: u64,

    /// Seconds between periodic full state refreshes
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,

    /// Domains whose entities are presence-sensing candidates
    #[serde(default = "default_presence_device_platforms")]
    pub presence_device_platforms: Vec<String>,

    /// Binary sensor device classes that qualify for presence sensing
    #[serde(default = "default_presence_device_classes")]
    pub presence_sensor_device_class: Vec<BinarySensorDeviceClass>,

    /// Secondary state bindings and thresholds
    #[serde(default)]
    pub secondary_states: SecondaryStates,

    /// Feature toggles
    #[serde(default)]
    pub features: Features,

    /// Icon override for the presence entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Default for AreaOptions {
    fn default() -> Self {
        Self {
            kind: AreaKind::default(),
            child_areas: Vec::new(),
            on_states: default_on_states(),
            clear_timeout: default_clear_timeout(),
            update_interval: default_update_interval(),
            presence_device_platforms: default_presence_device_platforms(),
            presence_sensor_device_class: default_presence_device_classes(),
            secondary_states: SecondaryStates::default(),
            features: Features::default(),
            icon: None,
        }
    }
}

impl AreaOptions {
    /// Whether this area aggregates child areas
    pub fn is_meta(&self) -> bool {
        self.kind.is_meta()
    }
}

/// Secondary state bindings: external entities that overlay states onto the
/// area, plus the timing thresholds tied to those overlays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryStates {
    /// Entity whose state asserts the sleep overlay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_entity: Option<String>,

    /// Target value of the sleep entity (case-insensitive match)
    #[serde(default = "default_target_state")]
    pub sleep_state: String,

    /// Clear timeout while the sleep state is held, in seconds
    #[serde(default = "default_sleep_timeout")]
    pub sleep_timeout: u64,

    /// Entity whose state asserts the dark overlay; when unset, dark is
    /// always asserted (default-dark policy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_entity: Option<String>,

    /// Target value of the dark entity (case-insensitive match)
    #[serde(default = "default_target_state")]
    pub dark_state: String,

    /// Seconds of continuous occupancy before the extended state asserts
    #[serde(default = "default_extended_time")]
    pub extended_time: u64,

    /// Clear timeout while the extended state is held, in seconds
    #[serde(default = "default_extended_timeout")]
    pub extended_timeout: u64,
}

impl Default for SecondaryStates {
    fn default() -> Self {
        Self {
            sleep_entity: None,
            sleep_state: default_target_state(),
            sleep_timeout: default_sleep_timeout(),
            dark_entity: None,
            dark_state: default_target_state(),
            extended_time: default_extended_time(),
            extended_timeout: default_extended_timeout(),
        }
    }
}

/// Feature toggles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Features {
    /// Per-device-class aggregate sensors (None disables the feature)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationOptions>,

    /// Health/distress aggregate sensor
    #[serde(default)]
    pub health: bool,

    /// Track the presence hold switch as a presence sensor
    #[serde(default)]
    pub presence_hold: bool,
}

/// Options for the aggregation feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationOptions {
    /// Minimum tracked entities before an aggregate is created
    #[serde(default = "default_min_entities")]
    pub min_entities: usize,

    /// Device classes aggregated with ALL semantics; all others use ANY
    #[serde(default = "default_mode_all")]
    pub mode_all: Vec<BinarySensorDeviceClass>,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            min_entities: default_min_entities(),
            mode_all: default_mode_all(),
        }
    }
}

fn default_on_states() -> Vec<String> {
    vec!["on".to_string(), "home".to_string(), "playing".to_string()]
}

fn default_clear_timeout() -> u64 {
    DEFAULT_CLEAR_TIMEOUT
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL
}

fn default_presence_device_platforms() -> Vec<String> {
    vec![
        "binary_sensor".to_string(),
        "media_player".to_string(),
        "device_tracker".to_string(),
    ]
}

fn default_presence_device_classes() -> Vec<BinarySensorDeviceClass> {
    ma_core::DEFAULT_PRESENCE_DEVICE_CLASSES.to_vec()
}

fn default_target_state() -> String {
    "on".to_string()
}

fn default_sleep_timeout() -> u64 {
    DEFAULT_SLEEP_TIMEOUT
}

fn default_extended_time() -> u64 {
    DEFAULT_EXTENDED_TIME
}

fn default_extended_timeout() -> u64 {
    DEFAULT_EXTENDED_TIMEOUT
}

fn default_min_entities() -> usize {
    DEFAULT_MIN_ENTITIES
}

fn default_mode_all() -> Vec<BinarySensorDeviceClass> {
    ma_core::DEFAULT_AGGREGATE_MODE_ALL.to_vec()
}
