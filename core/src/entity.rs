//! Entity projections.
//!
//! An [`Entity`] is never stored. It is rebuilt from version 0 for every read or
//! write by folding the entity's stream, and dropped when the operation returns.

use crate::event::Payload;
use crate::stream::{StreamId, Version};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Derived current state of one entity instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity id.
    pub id: String,
    /// Entity type name.
    pub entity_type: String,
    /// Number of events folded into `data`.
    pub version: Version,
    /// Projected fields, mutated in place by handlers.
    pub data: Payload,
}

impl Entity {
    /// An empty projection at version 0.
    #[must_use]
    pub fn empty(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            version: Version::INITIAL,
            data: Payload::new(),
        }
    }

    /// Whether any event has been folded into this projection.
    #[must_use]
    pub const fn exists(&self) -> bool {
        !self.version.is_initial()
    }

    /// Look up a projected field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Set a projected field, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.insert(key.into(), value)
    }

    /// Key of the stream this projection was folded from.
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        StreamId::for_entity(&self.entity_type, &self.id)
    }

    /// Deserialize the projected fields into a typed value.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `data` does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.data.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Panics: Test will fail if decoding fails
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        username: String,
        role: String,
    }

    #[test]
    fn empty_entity_does_not_exist() {
        let entity = Entity::empty("user", "u1");
        assert!(!entity.exists());
        assert!(entity.data.is_empty());
        assert_eq!(entity.stream_id().as_str(), "user-u1");
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: Test will fail if decoding fails
    fn decode_into_typed_struct() {
        let mut entity = Entity::empty("user", "u1");
        entity.set("username", json!("alice"));
        entity.set("role", json!("admin"));

        let user: User = entity.decode().expect("decode should succeed");
        assert_eq!(
            user,
            User {
                username: "alice".to_string(),
                role: "admin".to_string(),
            }
        );
    }

    #[test]
    fn decode_reports_missing_fields() {
        let entity = Entity::empty("user", "u1");
        assert!(entity.decode::<User>().is_err());
    }
}
