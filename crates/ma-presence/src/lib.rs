//! Area occupancy state machine and sensor aggregation for Magic Areas
//!
//! Derives a composite area state (occupied/clear plus the extended, sleep
//! and dark/bright overlays) from a set of presence-indicating sensors, with
//! clear-timeout hysteresis on the falling edge, and aggregates groups of
//! binary sensors by device class into derived group sensors including a
//! health/distress aggregate.
//!
//! The entry points are [`build_area_sensors`], which constructs the sensors
//! an area gets based on its feature configuration, and
//! [`runner::spawn_area`], which drives them from state-change events, the
//! periodic tick and clear-timeout rechecks on a single task per area.

mod aggregate;
mod area;
mod clear_timeout;
mod presence;
pub mod runner;

pub use aggregate::{
    aggregate_sensors_for_area, health_sensor_for_area, AggregationMode, AreaGroupSensor,
    ATTR_SENSORS,
};
pub use area::{slugify, Area, SensorDescriptor};
pub use clear_timeout::ClearTimeout;
pub use presence::{
    AreaPresenceSensor, ATTR_ACTIVE_AREAS, ATTR_ACTIVE_SENSORS, ATTR_AREAS, ATTR_CLEAR_TIMEOUT,
    ATTR_LAST_ACTIVE_SENSORS, ATTR_PRESENCE_SENSORS, ATTR_STATES, ATTR_TYPE,
};
pub use runner::{spawn_area, AreaHandle};

use ma_core::Clock;
use ma_event_bus::SharedEventBus;
use ma_state_store::SharedStateStore;

/// Build the sensors an area gets based on its feature configuration
///
/// Every area gets a presence sensor. Aggregation adds one group sensor per
/// qualifying device class; health adds the distress aggregate when enough
/// problem-like sensors exist.
pub fn build_area_sensors(
    area: Area,
    store: &SharedStateStore,
    bus: &SharedEventBus,
    clock: Clock,
) -> (AreaPresenceSensor, Vec<AreaGroupSensor>) {
    let mut groups = aggregate_sensors_for_area(&area, store);
    if let Some(health) = health_sensor_for_area(&area, store) {
        groups.push(health);
    }

    let presence = AreaPresenceSensor::new(area, store.clone(), bus.clone(), clock);
    (presence, groups)
}
