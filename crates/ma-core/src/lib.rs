//! Core types for Magic Areas
//!
//! This crate provides the fundamental types used throughout the Magic Areas
//! Rust implementation: EntityId, State, Event, Context, the area state tags
//! (AreaState / StateSet) and the binary sensor device class metadata.

mod area_state;
mod clock;
mod context;
mod device_class;
mod entity_id;
mod event;
mod state;

pub use area_state::{AreaState, StateSet};
pub use clock::Clock;
pub use context::Context;
pub use device_class::{
    BinarySensorDeviceClass, DEFAULT_AGGREGATE_MODE_ALL, DEFAULT_PRESENCE_DEVICE_CLASSES,
    DISTRESS_SENSOR_CLASSES,
};
pub use entity_id::{EntityId, EntityIdError};
pub use event::{Event, EventData, EventType};
pub use state::State;

/// State value reported by an active binary sensor
pub const STATE_ON: &str = "on";

/// State value reported by an inactive binary sensor
pub const STATE_OFF: &str = "off";

/// State values that must not be interpreted as sensor readings
pub const INVALID_STATES: &[&str] = &["unavailable", "unknown"];

/// Standard event types fired by this workspace
pub mod events {
    use super::*;

    /// Event type for entity state changes
    pub const STATE_CHANGED: &str = "state_changed";

    /// Event type fired when an area's state set changes
    pub const AREA_STATE_CHANGED: &str = "area_state_changed";

    /// Data for STATE_CHANGED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct StateChangedData {
        pub entity_id: EntityId,
        pub old_state: Option<State>,
        pub new_state: Option<State>,
    }

    impl EventData for StateChangedData {
        fn event_type() -> &'static str {
            STATE_CHANGED
        }
    }

    /// Data for AREA_STATE_CHANGED events
    ///
    /// `new_states` and `lost_states` are the diff produced by the area state
    /// machine. When the occupied/clear pair flipped, `new_states` carries the
    /// full current state set so consumers see the complete context.
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct AreaStateChangedData {
        pub area_id: String,
        pub new_states: Vec<AreaState>,
        pub lost_states: Vec<AreaState>,
    }

    impl EventData for AreaStateChangedData {
        fn event_type() -> &'static str {
            AREA_STATE_CHANGED
        }
    }
}
