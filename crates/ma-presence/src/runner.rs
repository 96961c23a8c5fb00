//! Per-area event loop
//!
//! One tokio task per area multiplexes everything that can trigger an
//! evaluation: tracked sensor state changes, the periodic tick, clear-timeout
//! rechecks and shutdown. Evaluations of the same area therefore never run
//! concurrently; cross-area tasks are independent. Teardown deterministically
//! cancels any armed clear timeout before the area instance is released.

use std::collections::HashSet;
use std::time::Duration;

use ma_core::events::StateChangedData;
use ma_core::State;
use ma_event_bus::SharedEventBus;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::aggregate::AreaGroupSensor;
use crate::presence::AreaPresenceSensor;

/// Handle to a running area task
pub struct AreaHandle {
    area_id: String,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl AreaHandle {
    /// Identifier of the area this handle controls
    pub fn area_id(&self) -> &str {
        &self.area_id
    }

    /// Stop the area task, cancelling any armed clear timeout
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}

/// Spawn the event loop for one area
///
/// `restored` is the last persisted state of the presence entity, or None on
/// first run.
pub fn spawn_area(
    mut presence: AreaPresenceSensor,
    mut aggregates: Vec<AreaGroupSensor>,
    bus: SharedEventBus,
    restored: Option<State>,
) -> AreaHandle {
    let area_id = presence.area().id.clone();
    let slug = presence.area().slug.clone();
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

    // Subscribe before the initial evaluation so no change is missed
    let mut state_rx = bus.subscribe_typed::<StateChangedData>();

    let task = tokio::spawn(async move {
        let Some(mut recheck_rx) = presence.take_recheck_rx() else {
            error!(area = %slug, "Recheck channel already taken, not starting");
            return;
        };

        let presence_sensors: HashSet<String> =
            presence.sensors().iter().cloned().collect();
        let secondary_entities: HashSet<String> =
            presence.secondary_entities().into_iter().collect();

        info!(
            area = %slug,
            sensors = presence_sensors.len(),
            aggregates = aggregates.len(),
            "Area initializing"
        );

        presence.restore_state(restored.as_ref());
        for aggregate in &mut aggregates {
            aggregate.update_state();
        }

        let mut tick = tokio::time::interval(Duration::from_secs(
            presence.area().options.update_interval,
        ));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // interval fires immediately; the restore above already evaluated
        tick.tick().await;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!(area = %slug, "Shutdown requested");
                    break;
                }

                Some(()) = recheck_rx.recv() => {
                    debug!(area = %slug, "Clear timeout fired, rechecking");
                    presence.update_state();
                }

                _ = tick.tick() => {
                    trace!(area = %slug, "Periodic refresh");
                    presence.update_state();
                    for aggregate in &mut aggregates {
                        aggregate.update_state();
                    }
                }

                event = state_rx.recv() => {
                    match event {
                        Ok(event) => on_state_changed(
                            &event.data,
                            &mut presence,
                            &mut aggregates,
                            &presence_sensors,
                            &secondary_entities,
                            &slug,
                        ),
                        Err(RecvError::Lagged(missed)) => {
                            debug!(area = %slug, missed, "State change stream lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }

        // A dangling callback must never fire against a destroyed area
        presence.cancel_clear_timeout();
        info!(area = %slug, "Area stopped");
    });

    AreaHandle {
        area_id,
        shutdown_tx,
        task,
    }
}

fn on_state_changed(
    data: &StateChangedData,
    presence: &mut AreaPresenceSensor,
    aggregates: &mut [AreaGroupSensor],
    presence_sensors: &HashSet<String>,
    secondary_entities: &HashSet<String>,
    slug: &str,
) {
    let entity_id = data.entity_id.to_string();

    if presence_sensors.contains(&entity_id) {
        debug!(area = %slug, entity = %entity_id, "Presence sensor changed");
        presence.update_state();
    } else if secondary_entities.contains(&entity_id) {
        // Invalid values on secondary entities are dropped here; the
        // resolver would skip them anyway, no point waking the evaluation
        let invalid = data
            .new_state
            .as_ref()
            .map(|s| s.is_invalid())
            .unwrap_or(true);
        if invalid {
            debug!(area = %slug, entity = %entity_id, "Secondary entity has invalid state");
        } else {
            debug!(area = %slug, entity = %entity_id, "Secondary entity changed");
            presence.update_state();
        }
    }

    for aggregate in aggregates.iter_mut() {
        if aggregate.sensors().contains(&entity_id) {
            aggregate.update_state();
        }
    }
}
