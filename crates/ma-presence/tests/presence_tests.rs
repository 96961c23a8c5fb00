//! Area presence state machine tests
//!
//! Drives `update_state` directly with a mock clock, observing the published
//! area_state_changed events through a bus subscription.

mod common;

use std::collections::HashMap;

use common::{motion_area, set_state, setup};
use ma_config::AreaOptions;
use ma_core::events::AreaStateChangedData;
use ma_core::{AreaState, BinarySensorDeviceClass, Context, EntityId, State};
use ma_presence::{
    Area, AreaPresenceSensor, SensorDescriptor, ATTR_ACTIVE_AREAS, ATTR_CLEAR_TIMEOUT,
    ATTR_PRESENCE_SENSORS, ATTR_STATES, ATTR_TYPE,
};

#[tokio::test]
async fn test_rising_edge_is_immediate() {
    let (store, bus, clock) = setup();
    let area = motion_area(2, AreaOptions::default());
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus.clone(), clock);

    sensor.update_state();
    assert!(!sensor.area().is_occupied());

    set_state(&store, "binary_sensor.kitchen_motion_1", "on");
    sensor.update_state();
    assert!(sensor.area().is_occupied());
}

#[tokio::test]
async fn test_two_motion_sensor_scenario() {
    // clear_timeout=30s, extended_time=600s, no dark entity configured
    let (store, bus, clock) = setup();
    let mut options = AreaOptions::default();
    options.clear_timeout = 30;
    options.secondary_states.extended_time = 600;
    let area = motion_area(2, options);
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus.clone(), clock.clone());
    let mut rx = bus.subscribe_typed::<AreaStateChangedData>();

    // t=0: both sensors off -> on
    set_state(&store, "binary_sensor.kitchen_motion_1", "on");
    set_state(&store, "binary_sensor.kitchen_motion_2", "on");
    sensor.update_state();

    assert!(sensor.area().has_state(AreaState::Occupied));
    assert!(sensor.area().has_state(AreaState::Dark));
    let event = rx.try_recv().unwrap().data;
    assert_eq!(event.new_states, vec![AreaState::Occupied, AreaState::Dark]);
    assert!(event.lost_states.is_empty());

    // t=5: both sensors off; occupancy holds, timer armed for t=35
    clock.advance_seconds(5);
    set_state(&store, "binary_sensor.kitchen_motion_1", "off");
    set_state(&store, "binary_sensor.kitchen_motion_2", "off");
    sensor.update_state();

    assert!(sensor.area().is_occupied());
    assert!(sensor.is_on_clear_timeout());
    assert!(rx.try_recv().is_err());

    // t=40: no further activity, timeout exceeded
    clock.advance_seconds(35);
    sensor.update_state();

    assert!(sensor.area().has_state(AreaState::Clear));
    assert!(sensor.area().has_state(AreaState::Dark));
    assert!(!sensor.area().is_occupied());
    assert!(!sensor.is_on_clear_timeout());

    // core transition widens the report to the full current set
    let event = rx.try_recv().unwrap().data;
    assert_eq!(event.new_states, vec![AreaState::Clear, AreaState::Dark]);
    assert!(event.lost_states.is_empty());
}

#[tokio::test]
async fn test_reactivation_cancels_pending_clear_without_flicker() {
    let (store, bus, clock) = setup();
    let mut options = AreaOptions::default();
    options.clear_timeout = 30;
    let area = motion_area(1, options);
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus.clone(), clock.clone());
    let mut rx = bus.subscribe_typed::<AreaStateChangedData>();

    set_state(&store, "binary_sensor.kitchen_motion_1", "on");
    sensor.update_state();
    assert!(rx.try_recv().is_ok());

    clock.advance_seconds(5);
    set_state(&store, "binary_sensor.kitchen_motion_1", "off");
    sensor.update_state();
    assert!(sensor.is_on_clear_timeout());

    // re-activation before the timeout elapses
    clock.advance_seconds(10);
    set_state(&store, "binary_sensor.kitchen_motion_1", "on");
    sensor.update_state();

    assert!(sensor.area().is_occupied());
    assert!(!sensor.is_on_clear_timeout());
    // no spurious clear/occupied flicker was ever reported
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_evaluation_is_idempotent() {
    let (store, bus, clock) = setup();
    let area = motion_area(1, AreaOptions::default());
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus.clone(), clock);
    let mut rx = bus.subscribe_typed::<AreaStateChangedData>();

    set_state(&store, "binary_sensor.kitchen_motion_1", "on");
    sensor.update_state();
    assert!(rx.try_recv().is_ok());

    // second evaluation with no input change: empty diff, no event
    sensor.update_state();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_extended_asserts_after_threshold() {
    let (store, bus, clock) = setup();
    let mut options = AreaOptions::default();
    options.secondary_states.extended_time = 600;
    options.secondary_states.extended_timeout = 120;
    let area = motion_area(1, options);
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus.clone(), clock.clone());
    let mut rx = bus.subscribe_typed::<AreaStateChangedData>();

    set_state(&store, "binary_sensor.kitchen_motion_1", "on");
    sensor.update_state();
    assert!(!sensor.area().has_state(AreaState::Extended));
    let _ = rx.try_recv();

    clock.advance_seconds(601);
    sensor.update_state();
    assert!(sensor.area().has_state(AreaState::Extended));
    // extended now selects the extended clear timeout
    assert_eq!(sensor.clear_timeout_seconds(), 120);

    // non-core change: only the diff is reported
    let event = rx.try_recv().unwrap().data;
    assert_eq!(event.new_states, vec![AreaState::Extended]);
    assert!(event.lost_states.is_empty());
}

#[tokio::test]
async fn test_extended_drops_when_occupancy_clears() {
    let (store, bus, clock) = setup();
    let mut options = AreaOptions::default();
    options.secondary_states.extended_time = 600;
    options.secondary_states.extended_timeout = 120;
    let area = motion_area(1, options);
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus.clone(), clock.clone());

    set_state(&store, "binary_sensor.kitchen_motion_1", "on");
    sensor.update_state();
    clock.advance_seconds(601);
    sensor.update_state();
    assert!(sensor.area().has_state(AreaState::Extended));

    set_state(&store, "binary_sensor.kitchen_motion_1", "off");
    sensor.update_state();
    assert!(sensor.is_on_clear_timeout());

    clock.advance_seconds(121);
    sensor.update_state();
    assert!(sensor.area().has_state(AreaState::Clear));
    assert!(!sensor.area().has_state(AreaState::Extended));
}

#[tokio::test]
async fn test_dark_asserted_when_not_configured() {
    let (store, bus, clock) = setup();
    let area = motion_area(1, AreaOptions::default());
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus, clock);

    sensor.update_state();
    assert!(sensor.area().has_state(AreaState::Dark));
    assert!(!sensor.area().has_state(AreaState::Bright));

    set_state(&store, "binary_sensor.kitchen_motion_1", "on");
    sensor.update_state();
    assert!(sensor.area().has_state(AreaState::Dark));
}

#[tokio::test]
async fn test_dark_and_bright_are_exclusive_when_configured() {
    let (store, bus, clock) = setup();
    let mut options = AreaOptions::default();
    options.secondary_states.dark_entity =
        Some("binary_sensor.kitchen_illuminance".to_string());
    let area = motion_area(1, options);
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus, clock);

    set_state(&store, "binary_sensor.kitchen_illuminance", "on");
    sensor.update_state();
    assert!(sensor.area().has_state(AreaState::Dark));
    assert!(!sensor.area().has_state(AreaState::Bright));

    set_state(&store, "binary_sensor.kitchen_illuminance", "off");
    sensor.update_state();
    assert!(sensor.area().has_state(AreaState::Bright));
    assert!(!sensor.area().has_state(AreaState::Dark));
}

#[tokio::test]
async fn test_target_value_match_is_case_insensitive() {
    let (store, bus, clock) = setup();
    let mut options = AreaOptions::default();
    options.secondary_states.sleep_entity = Some("switch.sleep_mode".to_string());
    options.secondary_states.sleep_state = "ON".to_string();
    let area = motion_area(1, options);
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus, clock);

    set_state(&store, "switch.sleep_mode", "on");
    sensor.update_state();
    assert!(sensor.area().has_state(AreaState::Sleep));
}

#[tokio::test]
async fn test_invalid_secondary_reading_is_skipped() {
    let (store, bus, clock) = setup();
    let mut options = AreaOptions::default();
    options.secondary_states.sleep_entity = Some("switch.sleep_mode".to_string());
    options.secondary_states.dark_entity =
        Some("binary_sensor.kitchen_illuminance".to_string());
    let area = motion_area(1, options);
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus, clock);

    set_state(&store, "switch.sleep_mode", "unavailable");
    set_state(&store, "binary_sensor.kitchen_illuminance", "unknown");
    set_state(&store, "binary_sensor.kitchen_motion_1", "on");

    // evaluation does not abort; the unreadable overlays are omitted
    sensor.update_state();
    assert!(sensor.area().is_occupied());
    assert!(!sensor.area().has_state(AreaState::Sleep));
    assert!(!sensor.area().has_state(AreaState::Dark));
}

#[tokio::test]
async fn test_sleep_timeout_takes_priority() {
    let (store, bus, clock) = setup();
    let mut options = AreaOptions::default();
    options.clear_timeout = 60;
    options.secondary_states.sleep_entity = Some("switch.sleep_mode".to_string());
    options.secondary_states.sleep_timeout = 15;
    options.secondary_states.extended_time = 300;
    options.secondary_states.extended_timeout = 120;
    let area = motion_area(1, options);
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus, clock.clone());

    set_state(&store, "binary_sensor.kitchen_motion_1", "on");
    sensor.update_state();
    assert_eq!(sensor.clear_timeout_seconds(), 60);

    set_state(&store, "switch.sleep_mode", "on");
    sensor.update_state();
    assert!(sensor.area().has_state(AreaState::Sleep));
    assert_eq!(sensor.clear_timeout_seconds(), 15);

    // sleep outranks extended
    clock.advance_seconds(301);
    sensor.update_state();
    assert!(sensor.area().has_state(AreaState::Extended));
    assert_eq!(sensor.clear_timeout_seconds(), 15);
}

#[tokio::test]
async fn test_invalid_presence_reading_is_skipped() {
    let (store, bus, clock) = setup();
    let area = motion_area(2, AreaOptions::default());
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus, clock);

    set_state(&store, "binary_sensor.kitchen_motion_1", "unavailable");
    set_state(&store, "binary_sensor.kitchen_motion_2", "on");
    sensor.update_state();
    assert!(sensor.area().is_occupied());
}

#[tokio::test]
async fn test_presence_hold_switch_is_tracked() {
    let (store, bus, clock) = setup();
    let mut options = AreaOptions::default();
    options.features.presence_hold = true;
    let area = motion_area(1, options);
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus, clock);

    assert!(sensor
        .sensors()
        .contains(&"switch.area_presence_hold_kitchen".to_string()));

    set_state(&store, "switch.area_presence_hold_kitchen", "on");
    sensor.update_state();
    assert!(sensor.area().is_occupied());
}

#[tokio::test]
async fn test_presence_candidacy_filters() {
    let (store, bus, clock) = setup();
    let mut area = Area::new("Kitchen", AreaOptions::default()).unwrap();
    // door is not a presence device class
    area.add_sensor(SensorDescriptor::new(
        "binary_sensor.kitchen_door".parse().unwrap(),
        Some(BinarySensorDeviceClass::Door),
    ));
    // binary sensor without a device class never qualifies
    area.add_sensor(SensorDescriptor::new(
        "binary_sensor.kitchen_mystery".parse().unwrap(),
        None,
    ));
    // media_player qualifies by domain alone
    area.add_sensor(SensorDescriptor::new(
        "media_player.kitchen_speaker".parse().unwrap(),
        None,
    ));
    // light is not a presence platform
    area.add_sensor(SensorDescriptor::new(
        "light.kitchen".parse().unwrap(),
        None,
    ));

    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus, clock);
    assert_eq!(sensor.sensors(), ["media_player.kitchen_speaker"]);

    // "playing" is in the default on-state set
    set_state(&store, "media_player.kitchen_speaker", "playing");
    sensor.update_state();
    assert!(sensor.area().is_occupied());
}

#[tokio::test]
async fn test_meta_area_tracks_children() {
    let (store, bus, clock) = setup();
    let mut options = AreaOptions::default();
    options.kind = ma_config::AreaKind::Meta;
    options.child_areas = vec!["kitchen".to_string(), "living_room".to_string()];
    let area = Area::new("Downstairs", options).unwrap();
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus, clock);

    assert_eq!(
        sensor.sensors(),
        [
            "binary_sensor.area_kitchen",
            "binary_sensor.area_living_room"
        ]
    );

    set_state(&store, "binary_sensor.area_kitchen", "on");
    sensor.update_state();
    assert!(sensor.area().is_occupied());

    let active: Vec<String> =
        serde_json::from_value(sensor.attributes()[ATTR_ACTIVE_AREAS].clone()).unwrap();
    assert_eq!(active, ["kitchen"]);
}

#[tokio::test]
async fn test_meta_area_requires_literal_on() {
    let (store, bus, clock) = setup();
    let mut options = AreaOptions::default();
    options.kind = ma_config::AreaKind::Meta;
    options.child_areas = vec!["kitchen".to_string()];
    // custom on-states do not apply to meta areas
    options.on_states = vec!["on".to_string(), "home".to_string()];
    let area = Area::new("Downstairs", options).unwrap();
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus, clock);

    set_state(&store, "binary_sensor.area_kitchen", "home");
    sensor.update_state();
    assert!(!sensor.area().is_occupied());

    set_state(&store, "binary_sensor.area_kitchen", "on");
    sensor.update_state();
    assert!(sensor.area().is_occupied());
}

#[tokio::test]
async fn test_restore_with_persisted_state() {
    let (store, bus, clock) = setup();
    let area = motion_area(1, AreaOptions::default());
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus.clone(), clock);
    let mut rx = bus.subscribe_typed::<AreaStateChangedData>();

    let mut attributes = HashMap::new();
    attributes.insert(ATTR_STATES.to_string(), serde_json::json!(["occupied", "dark"]));
    let last = State::new(
        EntityId::area_presence("kitchen").unwrap(),
        "on",
        attributes,
        Context::new(),
    );

    sensor.restore_state(Some(&last));
    assert!(sensor.area().is_occupied());
    assert!(sensor.area().has_state(AreaState::Dark));
    // restoring adopts the persisted set without reporting a change
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_restore_without_persisted_state_reports_all_new() {
    let (store, bus, clock) = setup();
    let area = motion_area(1, AreaOptions::default());
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus.clone(), clock);
    let mut rx = bus.subscribe_typed::<AreaStateChangedData>();

    sensor.restore_state(None);

    let event = rx.try_recv().unwrap().data;
    assert_eq!(event.new_states, vec![AreaState::Clear, AreaState::Dark]);
    assert!(event.lost_states.is_empty());
}

#[tokio::test]
async fn test_attributes_and_entity_state() {
    let (store, bus, clock) = setup();
    let mut options = AreaOptions::default();
    options.clear_timeout = 45;
    let area = motion_area(1, options);
    let mut sensor = AreaPresenceSensor::new(area, store.clone(), bus, clock);

    set_state(&store, "binary_sensor.kitchen_motion_1", "on");
    sensor.update_state();

    let attributes = sensor.attributes();
    assert_eq!(attributes[ATTR_TYPE], serde_json::json!("interior"));
    assert_eq!(attributes[ATTR_CLEAR_TIMEOUT], serde_json::json!(45));
    assert_eq!(
        attributes[ATTR_PRESENCE_SENSORS],
        serde_json::json!(["binary_sensor.kitchen_motion_1"])
    );
    assert_eq!(
        attributes[ATTR_STATES],
        serde_json::json!(["occupied", "dark"])
    );

    // the sensor's own entity reflects occupancy in the store
    assert!(store.is_on("binary_sensor.area_kitchen"));
}
