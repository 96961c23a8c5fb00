//! Entity state storage for Magic Areas
//!
//! The registry adapter every evaluator consults: a queryable key-value
//! store of entity state. Lookups are stale-safe (a missing entity yields
//! `None`, never an error) and every write fires a `state_changed` event on
//! the bus, which is how area runners learn about tracked sensor changes.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use ma_core::events::StateChangedData;
use ma_core::{Context, EntityId, State};
use ma_event_bus::EventBus;
use tracing::debug;

/// The state store tracks the current state of all entities
pub struct StateStore {
    /// All entity states keyed by entity_id string
    states: DashMap<String, State>,
    /// Event bus for firing state change events
    event_bus: Arc<EventBus>,
}

impl StateStore {
    /// Create a new state store with the given event bus
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            states: DashMap::new(),
            event_bus,
        }
    }

    /// Set the state of an entity
    ///
    /// If the entity already has a state, `last_changed` is only updated when
    /// the state value actually changed. Fires a STATE_CHANGED event with the
    /// old and new state.
    pub fn set(
        &self,
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> State {
        let entity_id_str = entity_id.to_string();

        let old_state = self.states.get(&entity_id_str).map(|s| s.clone());

        let new_state = match &old_state {
            Some(existing) => existing.with_update(state, attributes, context.clone()),
            None => State::new(entity_id.clone(), state, attributes, context.clone()),
        };

        debug!(
            entity_id = %entity_id,
            state = %new_state.state,
            changed = old_state.as_ref().map(|s| s.state != new_state.state).unwrap_or(true),
            "Setting entity state"
        );

        self.states.insert(entity_id_str, new_state.clone());

        let event_data = StateChangedData {
            entity_id,
            old_state,
            new_state: Some(new_state.clone()),
        };
        self.event_bus.fire_typed(event_data, context);

        new_state
    }

    /// Get the current state of an entity
    pub fn get(&self, entity_id: &str) -> Option<State> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    /// Check if an entity's state is literally "on"
    pub fn is_on(&self, entity_id: &str) -> bool {
        self.states.get(entity_id).map(|s| s.is_on()).unwrap_or(false)
    }
}

/// Thread-safe wrapper for StateStore
pub type SharedStateStore = Arc<StateStore>;

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StateStore {
        StateStore::new(Arc::new(EventBus::new()))
    }

    fn set_motion(store: &StateStore, object_id: &str, value: &str) {
        store.set(
            EntityId::new("binary_sensor", object_id).unwrap(),
            value,
            HashMap::new(),
            Context::new(),
        );
    }

    #[test]
    fn test_set_and_query() {
        let store = store();
        set_motion(&store, "kitchen_motion", "on");

        assert!(store.is_on("binary_sensor.kitchen_motion"));
        assert_eq!(store.get("binary_sensor.kitchen_motion").unwrap().state, "on");

        set_motion(&store, "kitchen_motion", "off");
        assert!(!store.is_on("binary_sensor.kitchen_motion"));
    }

    #[test]
    fn test_missing_entity_is_stale_safe() {
        let store = store();
        assert!(store.get("binary_sensor.nowhere").is_none());
        assert!(!store.is_on("binary_sensor.nowhere"));
    }

    #[test]
    fn test_attributes_travel_with_state() {
        let store = store();
        let mut attributes = HashMap::new();
        attributes.insert("device_class".to_string(), serde_json::json!("motion"));
        store.set(
            EntityId::new("binary_sensor", "kitchen_motion").unwrap(),
            "on",
            attributes,
            Context::new(),
        );

        let state = store.get("binary_sensor.kitchen_motion").unwrap();
        assert_eq!(
            state.attribute::<String>("device_class").as_deref(),
            Some("motion")
        );
    }

    #[tokio::test]
    async fn test_set_fires_state_changed() {
        let bus = Arc::new(EventBus::new());
        let store = StateStore::new(bus.clone());
        let mut rx = bus.subscribe_typed::<StateChangedData>();

        set_motion(&store, "kitchen_motion", "on");
        set_motion(&store, "kitchen_motion", "off");

        let first = rx.recv().await.unwrap().data;
        assert!(first.old_state.is_none());
        assert_eq!(first.new_state.unwrap().state, "on");

        let second = rx.recv().await.unwrap().data;
        assert_eq!(second.old_state.unwrap().state, "on");
        assert_eq!(second.new_state.unwrap().state, "off");
    }
}
