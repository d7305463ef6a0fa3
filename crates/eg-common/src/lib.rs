use serde::{Deserialize, Serialize};

pub mod logging;

// ============================================================================
// Event Type Domain Model
// ============================================================================

/// An event-type definition as served by the metadata cache.
///
/// Immutable from the cache's point of view: the cache only ever replaces a
/// whole definition, never mutates fields in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventType {
    /// Globally unique, non-empty name. Doubles as the cache key and the
    /// coordination-node child name.
    pub name: String,
    pub category: EventTypeCategory,
    pub schema: EventTypeSchema,
}

impl EventType {
    pub fn new(name: impl Into<String>, category: EventTypeCategory, schema: EventTypeSchema) -> Self {
        Self {
            name: name.into(),
            category,
            schema,
        }
    }
}

/// Schema attached to an event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeSchema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    pub schema: String,
}

impl EventTypeSchema {
    pub fn json_schema(schema: impl Into<String>) -> Self {
        Self {
            schema_type: SchemaType::JsonSchema,
            schema: schema.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaType {
    JsonSchema,
}

/// Processing category of an event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventTypeCategory {
    /// Business process events.
    Business,
    /// Data change events (entity snapshots).
    Data,
    /// No category assigned.
    Undefined,
}

impl Default for EventTypeCategory {
    fn default() -> Self {
        EventTypeCategory::Undefined
    }
}

impl std::fmt::Display for EventTypeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventTypeCategory::Business => write!(f, "business"),
            EventTypeCategory::Data => write!(f, "data"),
            EventTypeCategory::Undefined => write!(f, "undefined"),
        }
    }
}
