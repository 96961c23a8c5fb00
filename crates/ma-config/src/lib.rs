//! Per-area configuration surface for Magic Areas
//!
//! Defines the read-only options each area is evaluated against: on-state
//! value set, clear/extended/sleep timeouts, presence-eligible domains and
//! device classes, secondary-state bindings and feature toggles. Options are
//! deserialized from YAML with serde defaults, so a minimal area entry is a
//! name and nothing else.

mod error;
mod loader;
mod options;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_areas, parse_areas};
pub use options::{
    AggregationOptions, AreaKind, AreaOptions, Features, SecondaryStates,
    DEFAULT_CLEAR_TIMEOUT, DEFAULT_EXTENDED_TIME, DEFAULT_EXTENDED_TIMEOUT,
    DEFAULT_MIN_ENTITIES, DEFAULT_SLEEP_TIMEOUT, DEFAULT_UPDATE_INTERVAL,
};
