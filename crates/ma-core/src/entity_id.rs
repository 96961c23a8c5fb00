//! Entity ID type representing a domain.object_id pair

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for invalid entity IDs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("entity_id must contain exactly one '.' separator")]
    InvalidFormat,

    #[error("domain cannot be empty")]
    EmptyDomain,

    #[error("object_id cannot be empty")]
    EmptyObjectId,

    #[error("domain contains invalid characters (lowercase alphanumeric and underscores only)")]
    InvalidDomainChars,

    #[error("object_id contains invalid characters (lowercase alphanumeric and underscores only)")]
    InvalidObjectIdChars,
}

/// An entity ID such as "binary_sensor.kitchen_motion"
///
/// Entity IDs consist of a domain and an object_id separated by a period.
/// Both parts must be lowercase alphanumeric with underscores only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    domain: String,
    object_id: String,
}

/// Domain of binary sensor entities
pub const BINARY_SENSOR_DOMAIN: &str = "binary_sensor";

/// Domain of switch entities
pub const SWITCH_DOMAIN: &str = "switch";

impl EntityId {
    /// Create a new EntityId from domain and object_id parts
    pub fn new(
        domain: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Result<Self, EntityIdError> {
        let domain = domain.into();
        let object_id = object_id.into();

        if domain.is_empty() {
            return Err(EntityIdError::EmptyDomain);
        }
        if object_id.is_empty() {
            return Err(EntityIdError::EmptyObjectId);
        }
        if !is_valid_part(&domain) {
            return Err(EntityIdError::InvalidDomainChars);
        }
        if !is_valid_part(&object_id) {
            return Err(EntityIdError::InvalidObjectIdChars);
        }

        Ok(Self { domain, object_id })
    }

    /// Entity ID of an area's presence sensor ("binary_sensor.area_<slug>")
    ///
    /// Meta areas look their children up under this naming scheme.
    pub fn area_presence(slug: &str) -> Result<Self, EntityIdError> {
        Self::new(BINARY_SENSOR_DOMAIN, format!("area_{slug}"))
    }

    /// Entity ID of an area's presence hold switch
    /// ("switch.area_presence_hold_<slug>")
    pub fn presence_hold(slug: &str) -> Result<Self, EntityIdError> {
        Self::new(SWITCH_DOMAIN, format!("area_presence_hold_{slug}"))
    }

    /// Get the domain part of the entity ID
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Get the object_id part of the entity ID
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Check whether this entity belongs to the binary_sensor domain
    pub fn is_binary_sensor(&self) -> bool {
        self.domain == BINARY_SENSOR_DOMAIN
    }
}

/// Check a domain or object_id part (lowercase alphanumeric + underscore,
/// cannot start or end with an underscore)
fn is_valid_part(s: &str) -> bool {
    if s.starts_with('_') || s.ends_with('_') {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 2 {
            return Err(EntityIdError::InvalidFormat);
        }
        Self::new(parts[0], parts[1])
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.object_id)
    }
}
