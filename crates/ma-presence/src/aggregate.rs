//! Derived group sensors: per-device-class aggregates and the health sensor
//!
//! Structurally simpler siblings of the presence state machine: a pointwise
//! boolean reduction over tracked sensors with no hysteresis, re-evaluated
//! on every tracked-sensor change and periodic tick. Variants are data, not
//! types: the same struct serves device-class aggregates and the
//! health/distress sensor, parameterized by device class and mode.

use std::collections::HashMap;

use indexmap::IndexMap;
use ma_core::{
    BinarySensorDeviceClass, Context, EntityId, STATE_OFF, STATE_ON,
};
use ma_state_store::SharedStateStore;
use tracing::{debug, trace};

use crate::area::Area;
use crate::presence::{ATTR_ACTIVE_SENSORS, ATTR_TYPE};

/// Attribute key for the sensors an aggregate tracks
pub const ATTR_SENSORS: &str = "sensors";

/// How an aggregate reduces its tracked sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    /// Every tracked sensor must be active
    All,
    /// At least one tracked sensor must be active
    Single,
}

/// A derived ON/OFF aggregate over a class of binary sensors
pub struct AreaGroupSensor {
    entity_id: EntityId,
    area_slug: String,
    device_class: BinarySensorDeviceClass,
    mode: AggregationMode,
    sensors: Vec<String>,
    active_sensors: Vec<String>,
    store: SharedStateStore,
}

impl AreaGroupSensor {
    fn new(
        entity_id: EntityId,
        area: &Area,
        device_class: BinarySensorDeviceClass,
        mode: AggregationMode,
        sensors: Vec<String>,
        store: SharedStateStore,
    ) -> Self {
        Self {
            entity_id,
            area_slug: area.slug.clone(),
            device_class,
            mode,
            sensors,
            active_sensors: Vec::new(),
            store,
        }
    }

    /// Entity id of this aggregate
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// Device class this aggregate reports
    pub fn device_class(&self) -> BinarySensorDeviceClass {
        self.device_class
    }

    /// Aggregation mode
    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    /// Tracked sensor ids
    pub fn sensors(&self) -> &[String] {
        &self.sensors
    }

    /// Sensor ids currently reporting active
    pub fn active_sensors(&self) -> &[String] {
        &self.active_sensors
    }

    /// Reduce the tracked sensors to the aggregate value, refreshing the
    /// active-sensor bookkeeping
    ///
    /// Purely pointwise: no hysteresis or timeout is applied at this layer.
    pub fn evaluate(&mut self) -> bool {
        self.active_sensors = self
            .sensors
            .iter()
            .filter(|sensor| self.store.is_on(sensor))
            .cloned()
            .collect();

        match self.mode {
            AggregationMode::All => self.active_sensors.len() == self.sensors.len(),
            AggregationMode::Single => !self.active_sensors.is_empty(),
        }
    }

    /// Re-evaluate and write the aggregate's entity state into the store
    pub fn update_state(&mut self) {
        let on = self.evaluate();
        trace!(
            area = %self.area_slug,
            entity = %self.entity_id,
            on,
            active = self.active_sensors.len(),
            "Aggregate evaluated"
        );

        let mut attributes = HashMap::new();
        attributes.insert(ATTR_SENSORS.to_string(), serde_json::json!(self.sensors));
        attributes.insert(
            ATTR_ACTIVE_SENSORS.to_string(),
            serde_json::json!(self.active_sensors),
        );
        attributes.insert(
            ATTR_TYPE.to_string(),
            serde_json::json!(self.device_class.as_str()),
        );

        self.store.set(
            self.entity_id.clone(),
            if on { STATE_ON } else { STATE_OFF },
            attributes,
            Context::new(),
        );
    }
}

/// Build the per-device-class aggregates for an area
///
/// One aggregate per device class with at least `min_entities` tracked
/// sensors; the threshold is evaluated here, once, at setup. Sensors without
/// a device class are silently excluded from candidacy.
pub fn aggregate_sensors_for_area(
    area: &Area,
    store: &SharedStateStore,
) -> Vec<AreaGroupSensor> {
    let Some(aggregation) = area.options.features.aggregation.clone() else {
        return Vec::new();
    };

    let mut by_class: IndexMap<BinarySensorDeviceClass, Vec<String>> = IndexMap::new();
    for descriptor in area.binary_sensors() {
        let Some(device_class) = descriptor.device_class else {
            continue;
        };
        by_class
            .entry(device_class)
            .or_default()
            .push(descriptor.entity_id.to_string());
    }

    let mut aggregates = Vec::new();
    for (device_class, sensors) in by_class {
        if sensors.len() < aggregation.min_entities {
            continue;
        }

        let mode = if aggregation.mode_all.contains(&device_class) {
            AggregationMode::All
        } else {
            AggregationMode::Single
        };

        debug!(
            area = %area.slug,
            device_class = %device_class,
            count = sensors.len(),
            "Creating aggregate sensor"
        );

        let Ok(entity_id) =
            EntityId::new("binary_sensor", format!("area_{}_{}", device_class, area.slug))
        else {
            continue;
        };
        aggregates.push(AreaGroupSensor::new(
            entity_id,
            area,
            device_class,
            mode,
            sensors,
            store.clone(),
        ));
    }

    aggregates
}

/// Build the health/distress aggregate for an area
///
/// A single-mode aggregate whose tracked set is statically restricted to the
/// "problem-like" device classes, created only when enough qualifying
/// sensors exist.
pub fn health_sensor_for_area(area: &Area, store: &SharedStateStore) -> Option<AreaGroupSensor> {
    if !area.options.features.health {
        return None;
    }

    let sensors: Vec<String> = area
        .binary_sensors()
        .iter()
        .filter(|d| d.device_class.map(|c| c.is_distress()).unwrap_or(false))
        .map(|d| d.entity_id.to_string())
        .collect();

    let min_entities = area
        .options
        .features
        .aggregation
        .as_ref()
        .map(|a| a.min_entities)
        .unwrap_or(ma_config::DEFAULT_MIN_ENTITIES);

    if sensors.len() < min_entities {
        return None;
    }

    debug!(area = %area.slug, count = sensors.len(), "Creating health sensor");

    let entity_id = EntityId::new("binary_sensor", format!("area_health_{}", area.slug)).ok()?;
    Some(AreaGroupSensor::new(
        entity_id,
        area,
        BinarySensorDeviceClass::Problem,
        AggregationMode::Single,
        sensors,
        store.clone(),
    ))
}
