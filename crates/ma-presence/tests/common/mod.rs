//! Shared fixtures for the ma-presence test suites

use std::collections::HashMap;
use std::sync::Arc;

use ma_config::AreaOptions;
use ma_core::{BinarySensorDeviceClass, Clock, Context, EntityId};
use ma_event_bus::EventBus;
use ma_presence::{Area, SensorDescriptor};
use ma_state_store::{SharedStateStore, StateStore};

pub fn setup() -> (SharedStateStore, Arc<EventBus>, Clock) {
    let bus = Arc::new(EventBus::new());
    let store = Arc::new(StateStore::new(bus.clone()));
    (store, bus, Clock::mock())
}

/// An area named Kitchen with `motion_sensors` motion sensors
/// (binary_sensor.kitchen_motion_<n>)
pub fn motion_area(motion_sensors: usize, options: AreaOptions) -> Area {
    let mut area = Area::new("Kitchen", options).unwrap();
    for n in 1..=motion_sensors {
        area.add_sensor(SensorDescriptor::new(
            EntityId::new("binary_sensor", format!("kitchen_motion_{n}")).unwrap(),
            Some(BinarySensorDeviceClass::Motion),
        ));
    }
    area
}

pub fn set_state(store: &SharedStateStore, entity_id: &str, value: &str) {
    store.set(
        entity_id.parse().unwrap(),
        value,
        HashMap::new(),
        Context::new(),
    );
}
