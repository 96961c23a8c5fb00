//! The area model: a logical zone aggregating sensors for occupancy purposes

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use ma_config::AreaOptions;
use ma_core::{AreaState, BinarySensorDeviceClass, EntityId, EntityIdError, StateSet};

/// Immutable snapshot of a sensor assigned to an area
///
/// Sourced from the registry adapter at load time; the domain comes from the
/// entity id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDescriptor {
    /// The sensor's entity id
    pub entity_id: EntityId,

    /// Device class, when the sensor reports one
    ///
    /// Sensors without a device class are excluded from presence candidacy
    /// (binary_sensor domain) and from aggregation.
    pub device_class: Option<BinarySensorDeviceClass>,
}

impl SensorDescriptor {
    /// Create a new sensor descriptor
    pub fn new(entity_id: EntityId, device_class: Option<BinarySensorDeviceClass>) -> Self {
        Self {
            entity_id,
            device_class,
        }
    }

    /// The sensor's domain
    pub fn domain(&self) -> &str {
        self.entity_id.domain()
    }
}

/// A logical zone aggregating sensors (or child areas) for occupancy
///
/// Owned exclusively by the presence sensor for that area; `states` and
/// `last_changed` are mutated only through its `update_state`.
#[derive(Debug, Clone)]
pub struct Area {
    /// Internal identifier (ULID)
    pub id: String,

    /// Area name (e.g., "Living Room")
    pub name: String,

    /// URL-safe slug derived from the name, used in entity ids
    pub slug: String,

    /// Per-area configuration
    pub options: AreaOptions,

    /// Sensors assigned to this area, keyed by domain in load order
    pub entities: IndexMap<String, Vec<SensorDescriptor>>,

    /// The set of named states the area currently holds
    pub states: StateSet,

    /// When the core occupied/clear state last flipped
    pub last_changed: DateTime<Utc>,

    /// Entity id of this area's presence sensor
    presence_entity: EntityId,
}

impl Area {
    /// Create a new area; the slug is derived from the name
    pub fn new(name: impl Into<String>, options: AreaOptions) -> Result<Self, EntityIdError> {
        let name = name.into();
        let slug = slugify(&name);
        let presence_entity = EntityId::area_presence(&slug)?;

        Ok(Self {
            id: ulid::Ulid::new().to_string().to_lowercase(),
            name,
            slug,
            options,
            entities: IndexMap::new(),
            states: StateSet::new(),
            last_changed: Utc::now(),
            presence_entity,
        })
    }

    /// Assign a sensor to this area
    pub fn add_sensor(&mut self, descriptor: SensorDescriptor) {
        self.entities
            .entry(descriptor.domain().to_string())
            .or_default()
            .push(descriptor);
    }

    /// Whether this area aggregates child areas instead of raw sensors
    pub fn is_meta(&self) -> bool {
        self.options.is_meta()
    }

    /// Child area slugs in configured order (meta areas only)
    pub fn child_areas(&self) -> &[String] {
        &self.options.child_areas
    }

    /// Whether the area currently holds a given state tag
    pub fn has_state(&self, state: AreaState) -> bool {
        self.states.contains(state)
    }

    /// Whether the area is currently occupied
    pub fn is_occupied(&self) -> bool {
        self.has_state(AreaState::Occupied)
    }

    /// Entity id of this area's presence sensor
    pub fn presence_entity(&self) -> &EntityId {
        &self.presence_entity
    }

    /// Binary sensor descriptors assigned to this area
    pub fn binary_sensors(&self) -> &[SensorDescriptor] {
        self.entities
            .get("binary_sensor")
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Derive an entity-id-safe slug from an area name
///
/// Lowercases, maps runs of non-alphanumeric characters to single
/// underscores and trims leading/trailing underscores.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_separator = true;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_separator = false;
        } else if !last_was_separator {
            slug.push('_');
            last_was_separator = true;
        }
    }

    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}
