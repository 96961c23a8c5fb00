//! End-to-end tests of the per-area event loop
//!
//! These run against the system clock with a one second clear timeout, so
//! they exercise the real timer path rather than the mock clock.

mod common;

use std::time::Duration;

use common::{motion_area, set_state};
use ma_config::{AggregationOptions, AreaOptions};
use ma_core::events::{AreaStateChangedData, StateChangedData};
use ma_core::{AreaState, BinarySensorDeviceClass, Clock};
use ma_event_bus::EventBus;
use ma_presence::{build_area_sensors, spawn_area, Area, SensorDescriptor};
use ma_state_store::{SharedStateStore, StateStore};
use std::sync::Arc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn live_setup() -> (SharedStateStore, Arc<EventBus>) {
    let bus = Arc::new(EventBus::new());
    let store = Arc::new(StateStore::new(bus.clone()));
    (store, bus)
}

#[tokio::test]
async fn test_runner_drives_the_state_machine() {
    let (store, bus) = live_setup();
    let mut options = AreaOptions::default();
    options.clear_timeout = 1;
    let area = motion_area(1, options);

    let mut rx = bus.subscribe_typed::<AreaStateChangedData>();
    let (presence, groups) = build_area_sensors(area, &store, &bus, Clock::system());
    let handle = spawn_area(presence, groups, bus.clone(), None);

    // first-ever evaluation reports everything as new
    let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap().data;
    assert_eq!(event.new_states, vec![AreaState::Clear, AreaState::Dark]);

    // rising edge propagates through the state-change subscription
    set_state(&store, "binary_sensor.kitchen_motion_1", "on");
    let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap().data;
    assert_eq!(event.new_states, vec![AreaState::Occupied, AreaState::Dark]);
    assert!(store.is_on("binary_sensor.area_kitchen"));

    // falling edge holds occupancy until the clear timeout recheck fires
    set_state(&store, "binary_sensor.kitchen_motion_1", "off");
    let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap().data;
    assert_eq!(event.new_states, vec![AreaState::Clear, AreaState::Dark]);
    assert!(!store.is_on("binary_sensor.area_kitchen"));

    handle.shutdown().await;
}

#[tokio::test]
async fn test_runner_updates_aggregates() {
    let (store, bus) = live_setup();
    let mut options = AreaOptions::default();
    options.features.aggregation = Some(AggregationOptions::default());
    let mut area = Area::new("Kitchen", options).unwrap();
    area.add_sensor(SensorDescriptor::new(
        "binary_sensor.front_window".parse().unwrap(),
        Some(BinarySensorDeviceClass::Window),
    ));
    area.add_sensor(SensorDescriptor::new(
        "binary_sensor.back_window".parse().unwrap(),
        Some(BinarySensorDeviceClass::Window),
    ));

    let mut state_rx = bus.subscribe_typed::<StateChangedData>();
    let (presence, groups) = build_area_sensors(area, &store, &bus, Clock::system());
    assert_eq!(groups.len(), 1);
    let handle = spawn_area(presence, groups, bus.clone(), None);

    set_state(&store, "binary_sensor.front_window", "on");

    // wait for the aggregate entity to flip on
    loop {
        let event = timeout(WAIT, state_rx.recv()).await.unwrap().unwrap().data;
        if event.entity_id.to_string() == "binary_sensor.area_window_kitchen" {
            if event.new_state.map(|s| s.is_on()).unwrap_or(false) {
                break;
            }
        }
    }

    handle.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_reacting() {
    let (store, bus) = live_setup();
    let area = motion_area(1, AreaOptions::default());

    let mut rx = bus.subscribe_typed::<AreaStateChangedData>();
    let (presence, groups) = build_area_sensors(area, &store, &bus, Clock::system());
    let handle = spawn_area(presence, groups, bus.clone(), None);

    // drain the initial evaluation
    let _ = timeout(WAIT, rx.recv()).await.unwrap().unwrap();

    assert_eq!(handle.area_id().len(), 26);
    handle.shutdown().await;

    set_state(&store, "binary_sensor.kitchen_motion_1", "on");
    assert!(timeout(Duration::from_millis(300), rx.recv()).await.is_err());
}
