//! Stock `create` / `update` / `delete` handlers.
//!
//! Most entity types only need plain record semantics, so these are ready to
//! register with [`EntityTypeConfig::with_crud`](crate::registry::EntityTypeConfig::with_crud).

use crate::entity::Entity;
use crate::event::{CommitMetadata, Event};
use crate::handler::{EventHandler, HandlerError};
use serde_json::Value;

/// Projection field set by [`Delete`].
pub const DELETED_FIELD: &str = "deleted";

fn is_deleted(entity: &Entity) -> bool {
    matches!(entity.get(DELETED_FIELD), Some(Value::Bool(true)))
}

fn require_live(entity_id: &str, entity: &Entity) -> Result<(), HandlerError> {
    if !entity.exists() || is_deleted(entity) {
        return Err(HandlerError::NotFound {
            entity_id: entity_id.to_string(),
        });
    }
    Ok(())
}

/// `create`: the entity must not exist yet; its data becomes the payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct Create;

impl EventHandler for Create {
    fn event_type(&self) -> &str {
        "create"
    }

    fn apply(
        &self,
        entity_id: &str,
        event: &Event,
        entity: &mut Entity,
    ) -> Result<CommitMetadata, HandlerError> {
        if entity.exists() {
            return Err(HandlerError::AlreadyExists {
                entity_id: entity_id.to_string(),
            });
        }
        entity.data = event.payload().clone();
        Ok(CommitMetadata::none())
    }
}

/// `update`: the entity must exist and not be deleted; payload fields overwrite.
#[derive(Debug, Clone, Copy, Default)]
pub struct Update;

impl EventHandler for Update {
    fn event_type(&self) -> &str {
        "update"
    }

    fn apply(
        &self,
        entity_id: &str,
        event: &Event,
        entity: &mut Entity,
    ) -> Result<CommitMetadata, HandlerError> {
        require_live(entity_id, entity)?;
        for (key, value) in event.payload() {
            entity.data.insert(key.clone(), value.clone());
        }
        Ok(CommitMetadata::none())
    }
}

/// `delete`: the entity must exist and not be deleted; it is marked deleted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delete;

impl EventHandler for Delete {
    fn event_type(&self) -> &str {
        "delete"
    }

    fn apply(
        &self,
        entity_id: &str,
        _event: &Event,
        entity: &mut Entity,
    ) -> Result<CommitMetadata, HandlerError> {
        require_live(entity_id, entity)?;
        entity.set(DELETED_FIELD, Value::Bool(true));
        Ok(CommitMetadata::none())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Panics: Test will fail if a transition is rejected
mod tests {
    use super::*;
    use crate::event::payload_from_value;
    use crate::stream::Version;
    use chrono::Utc;
    use serde_json::json;

    fn event(event_type: &str, payload: Value) -> Event {
        Event::new("e", event_type, "doc", "d1", Utc::now())
            .with_payload(payload_from_value(payload).unwrap())
    }

    // Mimics the aggregation loop: apply then bump the version.
    fn fold(handler: &dyn EventHandler, event: &Event, entity: &mut Entity) -> Result<(), HandlerError> {
        handler.apply("d1", event, entity)?;
        entity.version = entity.version.next();
        Ok(())
    }

    #[test]
    fn create_update_delete_lifecycle() {
        let mut entity = Entity::empty("doc", "d1");

        fold(&Create, &event("create", json!({"title": "a", "body": "x"})), &mut entity).unwrap();
        fold(&Update, &event("update", json!({"title": "b"})), &mut entity).unwrap();
        assert_eq!(entity.get("title"), Some(&json!("b")));
        assert_eq!(entity.get("body"), Some(&json!("x")));

        fold(&Delete, &event("delete", json!({})), &mut entity).unwrap();
        assert_eq!(entity.get(DELETED_FIELD), Some(&json!(true)));
        assert_eq!(entity.version, Version::new(3));
    }

    #[test]
    fn create_twice_is_rejected() {
        let mut entity = Entity::empty("doc", "d1");
        fold(&Create, &event("create", json!({})), &mut entity).unwrap();

        let result = fold(&Create, &event("create", json!({})), &mut entity);
        assert_eq!(
            result,
            Err(HandlerError::AlreadyExists {
                entity_id: "d1".to_string()
            })
        );
    }

    #[test]
    fn update_of_missing_entity_is_rejected() {
        let mut entity = Entity::empty("doc", "d1");
        let result = fold(&Update, &event("update", json!({"title": "b"})), &mut entity);
        assert!(matches!(result, Err(HandlerError::NotFound { .. })));
        assert!(entity.data.is_empty());
    }

    #[test]
    fn deleted_entity_cannot_be_updated() {
        let mut entity = Entity::empty("doc", "d1");
        fold(&Create, &event("create", json!({})), &mut entity).unwrap();
        fold(&Delete, &event("delete", json!({})), &mut entity).unwrap();

        let result = fold(&Update, &event("update", json!({"title": "c"})), &mut entity);
        assert!(matches!(result, Err(HandlerError::NotFound { .. })));
    }
}
