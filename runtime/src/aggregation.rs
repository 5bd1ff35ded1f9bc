//! Aggregation engine: folds a stream into a projection.

use crate::error::{EngineError, Result};
use crate::metrics;
use strata_core::entity::Entity;
use strata_core::event::Event;
use strata_core::registry::EntityTypeConfig;

/// Replay `events` in commit order through the entity type's handlers.
///
/// Starts from an empty projection at version 0 and bumps the version once per
/// event. Commit metadata returned by handlers is discarded during replay.
///
/// # Errors
///
/// - `UnreplayableHistory`: an event has no handler under the current registry
/// - `CorruptHistory`: a handler rejected an event that was already committed
///
/// Both mean the stream cannot be trusted and are never retried.
pub fn aggregate(config: &EntityTypeConfig, entity_id: &str, events: &[Event]) -> Result<Entity> {
    let mut entity = Entity::empty(config.name(), entity_id);

    for event in events {
        let Some(handler) = config.handler(event.event_type()) else {
            tracing::error!(
                stream_id = %entity.stream_id(),
                event_id = event.id(),
                event_type = event.event_type(),
                "Committed event has no registered handler"
            );
            return Err(EngineError::UnreplayableHistory {
                stream_id: entity.stream_id(),
                event_id: event.id().to_string(),
                event_type: event.event_type().to_string(),
            });
        };

        if let Err(source) = handler.apply(entity_id, event, &mut entity) {
            tracing::error!(
                stream_id = %entity.stream_id(),
                event_id = event.id(),
                error = %source,
                "Handler rejected a committed event during replay"
            );
            return Err(EngineError::CorruptHistory {
                stream_id: entity.stream_id(),
                event_id: event.id().to_string(),
                source,
            });
        }

        entity.version = entity.version.next();
    }

    metrics::record_replay(events.len());
    tracing::trace!(version = %entity.version, "Replay completed");
    Ok(entity)
}
