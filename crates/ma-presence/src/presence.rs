//! The area presence sensor: occupancy evaluation, secondary state
//! resolution and the state machine tying them together
//!
//! All evaluation funnels through [`AreaPresenceSensor::update_state`]: the
//! current state set is recomputed, diffed against the previous set, written
//! back to the area and the store, and the (new, lost) diff is published on
//! the bus keyed by area identity. Presence sensors are typically pulsed
//! (motion clears quickly), so the falling edge is debounced through the
//! clear timeout rather than clearing the area immediately.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use ma_core::events::AreaStateChangedData;
use ma_core::{AreaState, Clock, Context, EntityId, State, StateSet, STATE_OFF, STATE_ON};
use ma_event_bus::SharedEventBus;
use ma_state_store::SharedStateStore;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::area::Area;
use crate::clear_timeout::ClearTimeout;

/// Attribute key for the area's current state set
pub const ATTR_STATES: &str = "states";
/// Attribute key for currently active presence sensors
pub const ATTR_ACTIVE_SENSORS: &str = "active_sensors";
/// Attribute key for the presence sensors active on the last transition
pub const ATTR_LAST_ACTIVE_SENSORS: &str = "last_active_sensors";
/// Attribute key for all tracked presence sensors
pub const ATTR_PRESENCE_SENSORS: &str = "presence_sensors";
/// Attribute key for the area kind
pub const ATTR_TYPE: &str = "type";
/// Attribute key for the currently selected clear timeout, in seconds
pub const ATTR_CLEAR_TIMEOUT: &str = "clear_timeout";
/// Attribute key for a meta area's child areas
pub const ATTR_AREAS: &str = "areas";
/// Attribute key for a meta area's currently occupied children
pub const ATTR_ACTIVE_AREAS: &str = "active_areas";

/// Main presence sensor and state machine for one area
///
/// Owns the area exclusively; the runner drives it from sensor state-change
/// events, the periodic tick and clear-timeout rechecks, all on one task, so
/// no two evaluations of the same area ever interleave.
pub struct AreaPresenceSensor {
    area: Area,
    store: SharedStateStore,
    bus: SharedEventBus,
    clock: Clock,

    /// Entity ids tracked for presence, resolved at load time
    sensors: Vec<String>,
    active_sensors: Vec<String>,
    last_active_sensors: Vec<String>,
    attributes: HashMap<String, serde_json::Value>,

    clear_timeout: ClearTimeout,
    /// Last occupied-to-not-detected transition, updated on every such
    /// transition (when the clear timeout is armed)
    last_off_time: chrono::DateTime<chrono::Utc>,

    recheck_tx: mpsc::Sender<()>,
    recheck_rx: Option<mpsc::Receiver<()>>,
}

impl AreaPresenceSensor {
    /// Create the presence sensor for an area
    pub fn new(area: Area, store: SharedStateStore, bus: SharedEventBus, clock: Clock) -> Self {
        let (recheck_tx, recheck_rx) = mpsc::channel(8);
        let last_off_time = clock.now();

        let mut sensor = Self {
            area,
            store,
            bus,
            clock,
            sensors: Vec::new(),
            active_sensors: Vec::new(),
            last_active_sensors: Vec::new(),
            attributes: HashMap::new(),
            clear_timeout: ClearTimeout::new(),
            last_off_time,
            recheck_tx,
            recheck_rx: Some(recheck_rx),
        };
        sensor.load_presence_sensors();
        sensor.update_attributes();
        sensor
    }

    /// The area this sensor evaluates
    pub fn area(&self) -> &Area {
        &self.area
    }

    /// Entity id of this presence sensor
    pub fn entity_id(&self) -> &EntityId {
        self.area.presence_entity()
    }

    /// Tracked presence sensor ids
    pub fn sensors(&self) -> &[String] {
        &self.sensors
    }

    /// Current attribute snapshot
    pub fn attributes(&self) -> &HashMap<String, serde_json::Value> {
        &self.attributes
    }

    /// Secondary-state entities this sensor tracks
    pub fn secondary_entities(&self) -> Vec<String> {
        let secondary = &self.area.options.secondary_states;
        [&secondary.sleep_entity, &secondary.dark_entity]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// All entity ids whose changes must trigger a recheck
    pub fn tracked_entities(&self) -> Vec<String> {
        let mut tracked = self.sensors.clone();
        tracked.extend(self.secondary_entities());
        tracked
    }

    /// Take the recheck receiver; the runner consumes it once
    pub(crate) fn take_recheck_rx(&mut self) -> Option<mpsc::Receiver<()>> {
        self.recheck_rx.take()
    }

    /// Load the sensors that are relevant for presence sensing
    ///
    /// Meta areas track their children's presence entities; regular areas
    /// track entities of the presence-eligible domains, filtered by device
    /// class within binary_sensor. The presence hold switch is appended when
    /// that feature is enabled.
    fn load_presence_sensors(&mut self) {
        if self.area.is_meta() {
            for child in self.area.child_areas() {
                if let Ok(entity_id) = EntityId::area_presence(child) {
                    self.sensors.push(entity_id.to_string());
                }
            }
            return;
        }

        let options = &self.area.options;
        for (domain, descriptors) in &self.area.entities {
            if !options.presence_device_platforms.contains(domain) {
                continue;
            }

            for descriptor in descriptors {
                if domain == "binary_sensor" {
                    // Sensors without a device class never qualify
                    let Some(device_class) = descriptor.device_class else {
                        continue;
                    };
                    if !options.presence_sensor_device_class.contains(&device_class) {
                        continue;
                    }
                }
                self.sensors.push(descriptor.entity_id.to_string());
            }
        }

        if options.features.presence_hold {
            if let Ok(entity_id) = EntityId::presence_hold(&self.area.slug) {
                self.sensors.push(entity_id.to_string());
            }
        }
    }

    /// Update state when restoring the entity at startup
    ///
    /// With no persisted state this is a first-ever evaluation: the previous
    /// state set is empty, so every computed state is reported as new.
    pub fn restore_state(&mut self, last: Option<&State>) {
        match last {
            None => {
                debug!(area = %self.area.slug, "New presence sensor created");
                self.update_state();
            }
            Some(state) => {
                debug!(area = %self.area.slug, state = %state.state, "Presence sensor restored");
                if let Some(states) = state.attribute::<Vec<AreaState>>(ATTR_STATES) {
                    self.area.states = states.into_iter().collect();
                }
                self.update_attributes();
                self.write_entity_state();
            }
        }
    }

    // State change handling

    /// Recompute the area's full state set, diff it against the previous
    /// set, persist it and publish the change
    pub fn update_state(&mut self) {
        let previous = self.area.states.clone();
        let current = self.compute_area_states();
        let (new_states, lost_states) = current.diff(&previous);
        self.area.states = current;

        self.update_attributes();
        self.write_entity_state();

        if new_states.is_empty() && lost_states.is_empty() {
            trace!(area = %self.area.slug, "No state change");
            return;
        }

        debug!(
            area = %self.area.slug,
            new = ?new_states.to_vec(),
            lost = ?lost_states.to_vec(),
            "Area states updated"
        );

        // A core occupied/clear flip widens the report to the full current
        // set: downstream consumers need the complete context, not just the
        // toggled pair
        if new_states.iter().any(|s| s.is_core()) {
            self.report_state_change(self.area.states.clone(), StateSet::new());
        } else {
            self.report_state_change(new_states, lost_states);
        }
    }

    /// Compute the full state set: core occupancy plus secondary overlays
    fn compute_area_states(&mut self) -> StateSet {
        let mut states = StateSet::new();

        let was_occupied = self.area.is_occupied();
        let occupied = self.occupancy_state();

        states.insert(if occupied {
            AreaState::Occupied
        } else {
            AreaState::Clear
        });

        if occupied != was_occupied {
            self.area.last_changed = self.clock.now();
            debug!(
                area = %self.area.slug,
                occupied,
                at = %self.area.last_changed,
                "Occupancy changed"
            );
        }

        let seconds_since_change =
            (self.clock.now() - self.area.last_changed).num_seconds();
        let extended_time = self.area.options.secondary_states.extended_time;
        if occupied && seconds_since_change >= extended_time as i64 {
            states.insert(AreaState::Extended);
        }

        self.resolve_secondary_states(&mut states);
        states
    }

    /// Evaluate the entity-bound overlay states (sleep, dark/bright)
    ///
    /// An unreadable or invalid external value skips that single overlay for
    /// this cycle; it never fails the whole resolution.
    fn resolve_secondary_states(&self, states: &mut StateSet) {
        let secondary = self.area.options.secondary_states.clone();
        let dark_configured = secondary.dark_entity.is_some();

        // Assume dark when no dark-tracking entity is configured
        if !dark_configured {
            states.insert(AreaState::Dark);
        }

        let overlays = [
            (AreaState::Sleep, &secondary.sleep_entity, &secondary.sleep_state),
            (AreaState::Dark, &secondary.dark_entity, &secondary.dark_state),
        ];

        for (overlay, entity, target) in overlays {
            let Some(entity_id) = entity else {
                continue;
            };

            match self.store.get(entity_id) {
                Some(state) if !state.is_invalid() => {
                    if state.state.eq_ignore_ascii_case(target) {
                        debug!(
                            area = %self.area.slug,
                            entity = %entity_id,
                            value = %state.state,
                            "Secondary state asserting {overlay}"
                        );
                        states.insert(overlay);
                    }
                }
                _ => {
                    debug!(
                        area = %self.area.slug,
                        entity = %entity_id,
                        "Secondary state entity unreadable, skipping {overlay}"
                    );
                }
            }
        }

        // Bright is dark's complement, but only when dark is configurable
        if dark_configured && !states.contains(AreaState::Dark) {
            states.insert(AreaState::Bright);
        }
    }

    /// Compute raw occupancy including timeout-extended occupancy
    ///
    /// Rising edge is immediate. On the falling edge the area stays occupied
    /// while the clear timeout runs; it clears only once the armed timeout
    /// has been exceeded on the wall clock.
    fn occupancy_state(&mut self) -> bool {
        // Meta areas compare children against the literal on-value
        let valid_on_states: Vec<String> = if self.area.is_meta() {
            vec![STATE_ON.to_string()]
        } else {
            self.area.options.on_states.clone()
        };

        if self.any_sensor_on(&valid_on_states) {
            // Presence resumed; drop any pending clear
            self.clear_timeout.cancel();
            return true;
        }

        if !self.area.is_occupied() {
            return false;
        }

        if self.clear_timeout.is_armed() {
            debug!(area = %self.area.slug, "Area is on clear timeout");
            if self.timeout_exceeded() {
                return false;
            }
        } else {
            debug!(area = %self.area.slug, "Arming clear timeout");
            self.last_off_time = self.clock.now();
            self.set_clear_timeout();
        }

        true
    }

    /// Read all tracked sensors, recording which are active
    ///
    /// Invalid readings (unavailable/unknown) skip that sensor for this
    /// cycle.
    fn any_sensor_on(&mut self, valid_states: &[String]) -> bool {
        let mut active = Vec::new();

        for sensor in &self.sensors {
            let Some(state) = self.store.get(sensor) else {
                continue;
            };
            if state.is_invalid() {
                trace!(area = %self.area.slug, sensor = %sensor, value = %state.state,
                    "Sensor has invalid state, skipping");
                continue;
            }
            if valid_states.contains(&state.state) {
                active.push(sensor.clone());
            }
        }

        let any_on = !active.is_empty();
        if any_on {
            self.last_active_sensors = active.clone();
        }
        self.active_sensors = active;
        any_on
    }

    // Clearing

    /// The effective clear timeout, reselected on every use: sleep timeout
    /// while sleeping, extended timeout while extended, else the base value
    pub fn clear_timeout_seconds(&self) -> u64 {
        let secondary = &self.area.options.secondary_states;

        if self.area.has_state(AreaState::Sleep) {
            return secondary.sleep_timeout;
        }
        if self.area.has_state(AreaState::Extended) {
            return secondary.extended_timeout;
        }
        self.area.options.clear_timeout
    }

    /// Arm the clear timeout; a no-op when not occupied or already armed
    fn set_clear_timeout(&mut self) -> bool {
        if !self.area.is_occupied() {
            return false;
        }

        let timeout = self.clear_timeout_seconds();
        self.clear_timeout
            .arm(Duration::from_secs(timeout), self.recheck_tx.clone())
    }

    /// Check whether the armed clear timeout has elapsed on the wall clock,
    /// disarming it if so
    fn timeout_exceeded(&mut self) -> bool {
        if !self.area.is_occupied() {
            return false;
        }

        let timeout = ChronoDuration::seconds(self.clear_timeout_seconds() as i64);
        if self.clock.now() >= self.last_off_time + timeout {
            debug!(area = %self.area.slug, "Clear timeout exceeded");
            self.clear_timeout.cancel();
            return true;
        }

        false
    }

    /// Whether a clear timeout is currently armed
    pub fn is_on_clear_timeout(&self) -> bool {
        self.clear_timeout.is_armed()
    }

    /// Cancel any armed clear timeout; called deterministically at teardown
    pub fn cancel_clear_timeout(&mut self) {
        self.clear_timeout.cancel();
    }

    // Attributes and reporting

    /// Refresh the derived attribute map
    fn update_attributes(&mut self) {
        let mut attributes = HashMap::new();
        attributes.insert(
            ATTR_STATES.to_string(),
            serde_json::json!(self.area.states.to_vec()),
        );
        attributes.insert(
            ATTR_ACTIVE_SENSORS.to_string(),
            serde_json::json!(self.active_sensors),
        );
        attributes.insert(
            ATTR_LAST_ACTIVE_SENSORS.to_string(),
            serde_json::json!(self.last_active_sensors),
        );
        attributes.insert(
            ATTR_PRESENCE_SENSORS.to_string(),
            serde_json::json!(self.sensors),
        );
        attributes.insert(
            ATTR_TYPE.to_string(),
            serde_json::json!(self.area.options.kind.as_str()),
        );
        attributes.insert(
            ATTR_CLEAR_TIMEOUT.to_string(),
            serde_json::json!(self.clear_timeout_seconds()),
        );

        if self.area.is_meta() {
            attributes.insert(
                ATTR_AREAS.to_string(),
                serde_json::json!(self.area.child_areas()),
            );
            attributes.insert(
                ATTR_ACTIVE_AREAS.to_string(),
                serde_json::json!(self.active_child_areas()),
            );
        }

        self.attributes = attributes;
    }

    /// Children whose presence entities currently report "on"
    fn active_child_areas(&self) -> Vec<String> {
        self.area
            .child_areas()
            .iter()
            .filter(|child| {
                EntityId::area_presence(child)
                    .map(|id| self.store.is_on(&id.to_string()))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Write this sensor's own entity state into the store
    fn write_entity_state(&self) {
        let value = if self.area.is_occupied() {
            STATE_ON
        } else {
            STATE_OFF
        };
        self.store.set(
            self.entity_id().clone(),
            value,
            self.attributes.clone(),
            Context::new(),
        );
    }

    /// Publish the (new, lost) diff keyed by area identity
    fn report_state_change(&self, new_states: StateSet, lost_states: StateSet) {
        debug!(
            area = %self.area.slug,
            new = ?new_states.to_vec(),
            lost = ?lost_states.to_vec(),
            "Reporting area state change"
        );
        self.bus.fire_typed(
            AreaStateChangedData {
                area_id: self.area.id.clone(),
                new_states: new_states.to_vec(),
                lost_states: lost_states.to_vec(),
            },
            Context::new(),
        );
    }
}
