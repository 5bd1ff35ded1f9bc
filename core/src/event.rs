//! Events: the immutable facts that make up an entity stream.
//!
//! An [`Event`] targets one stream (`entity_type` + `entity_id`) and carries a flat
//! payload of scalar fields. Once constructed it is never mutated; handlers read it
//! and fold it into a projection.
//!
//! # Example
//!
//! ```
//! use strata_core::event::{Event, Payload};
//! use serde_json::json;
//!
//! let mut payload = Payload::new();
//! payload.insert("name".to_string(), json!("a"));
//!
//! let event = Event::new("evt-1", "create", "user", "u1", chrono::Utc::now())
//!     .with_payload(payload);
//!
//! assert_eq!(event.stream_id().as_str(), "user-u1");
//! assert_eq!(event.field("name"), Some(&json!("a")));
//! ```

use crate::stream::StreamId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Field map carried by an event and held by a projection.
pub type Payload = serde_json::Map<String, Value>;

/// Error types for event construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The payload was not a JSON object.
    #[error("Payload must be a JSON object")]
    PayloadNotObject,

    /// A payload field held an array or an object.
    #[error("Payload field {0} must be a string, number, boolean or null")]
    NonScalarField(String),
}

/// An immutable domain fact recorded against one entity stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    entity_type: String,
    entity_id: String,
    #[serde(default)]
    payload: Payload,
    timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event with an empty payload.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            payload: Payload::new(),
            timestamp,
        }
    }

    /// Attach a payload to a freshly constructed event.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Unique id of this event.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Type tag that selects the event-application logic.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Entity type of the target stream.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Entity id of the target stream.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Payload fields.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Look up a single payload field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// When the event was created.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Key of the stream this event belongs to.
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        StreamId::for_entity(&self.entity_type, &self.entity_id)
    }
}

/// Convert a JSON value into a flat payload.
///
/// # Errors
///
/// Returns [`EventError::PayloadNotObject`] if `value` is not an object and
/// [`EventError::NonScalarField`] if any field holds an array or an object.
pub fn payload_from_value(value: Value) -> Result<Payload, EventError> {
    let Value::Object(map) = value else {
        return Err(EventError::PayloadNotObject);
    };

    if let Some((key, _)) = map.iter().find(|(_, v)| !is_scalar(v)) {
        return Err(EventError::NonScalarField(key.clone()));
    }

    Ok(map)
}

/// Whether a value is a string, number, boolean or null.
#[must_use]
pub const fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Opaque data produced by a handler and forwarded to the log's append.
///
/// The log may use it for indexing hints. It never changes what gets persisted:
/// only the [`Event`] itself is durable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitMetadata(Option<Value>);

impl CommitMetadata {
    /// No metadata.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// Wrap a metadata value.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(Some(value))
    }

    /// Borrow the metadata value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        self.0.as_ref()
    }

    /// Take the metadata value, if any.
    #[must_use]
    pub fn into_inner(self) -> Option<Value> {
        self.0
    }
}
