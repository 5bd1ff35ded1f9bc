//! The write pipeline and the read path.
//!
//! A write runs these steps, in order, for one incoming event:
//!
//! 1. Resolve the entity type
//! 2. Read the stream and replay it into a projection
//! 3. Resolve the handler for the event type
//! 4. Apply the event to the projection
//! 5. Check every declared reference against the log
//! 6. Run every validator, in registration order
//! 7. Append the event, conditional on the caller's expected version or, without
//!    one, the stream version observed in step 2
//!
//! Nothing is visible outside the in-memory projection until step 7 succeeds, so a
//! failure at any earlier step leaves the log untouched.
//!
//! # Concurrency
//!
//! There is no process-wide write lock. The append in step 7 is a compare-and-set
//! against the expected version: if another writer committed to the same stream
//! in between, the log refuses the append and the caller gets a retryable
//! [`EngineError::ConcurrencyConflict`]. Writes to different streams never wait on
//! each other.

use crate::aggregation::aggregate;
use crate::error::{EngineError, Result};
use crate::metrics;
use serde_json::Value;
use std::sync::Arc;
use strata_core::entity::Entity;
use strata_core::event::Event;
use strata_core::event_log::{EventLog, EventLogError};
use strata_core::registry::{EntityRegistry, EntityTypeConfig};
use strata_core::stream::{StreamId, Version};

/// Orchestrates reads and writes against the ordered log.
#[derive(Clone)]
pub struct WritePipeline {
    registry: Arc<EntityRegistry>,
    log: Arc<dyn EventLog>,
}

impl std::fmt::Debug for WritePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WritePipeline")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl WritePipeline {
    /// Create a pipeline over a registry and a log.
    #[must_use]
    pub fn new(registry: Arc<EntityRegistry>, log: Arc<dyn EventLog>) -> Self {
        Self { registry, log }
    }

    /// The entity type registry.
    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Validate `event` against the current state of its stream and commit it.
    ///
    /// `expected_version`, when given, is forwarded to the log's compare-and-set;
    /// otherwise the version observed during replay is used. The pipeline does not
    /// compare it itself, so every earlier rejection is reported as such.
    ///
    /// Returns the entity id and the stream version after the append.
    ///
    /// # Errors
    ///
    /// - `MalformedRequest`: the event targets a different stream than requested
    /// - `UnknownEntityType`, `NoHandler`: nothing registered for the request
    /// - `Rejected`: the handler refused the transition
    /// - `InvalidReference`, `InvalidReferenceType`: a reference does not resolve
    /// - `ValidationFailed`: the first failing validator, by name
    /// - `ConcurrencyConflict`: the stream moved on before the append
    /// - `UnreplayableHistory`, `CorruptHistory`: the stream cannot be replayed
    /// - `Log`: the log service failed
    #[tracing::instrument(skip(self, event), fields(event_type = event.event_type(), event_id = event.id()))]
    pub async fn handle_event(
        &self,
        entity_type: &str,
        entity_id: &str,
        event: Event,
        expected_version: Option<Version>,
    ) -> Result<(String, Version)> {
        match self
            .write(entity_type, entity_id, event, expected_version)
            .await
        {
            Ok(version) => {
                metrics::record_commit(entity_type);
                tracing::debug!(new_version = %version, "Event committed");
                Ok((entity_id.to_string(), version))
            },
            Err(error) => {
                if error.is_retryable() {
                    metrics::record_conflict();
                }
                metrics::record_rejection(error.reason());
                tracing::warn!(error = %error, "Event rejected");
                Err(error)
            },
        }
    }

    async fn write(
        &self,
        entity_type: &str,
        entity_id: &str,
        event: Event,
        expected_version: Option<Version>,
    ) -> Result<Version> {
        if event.entity_type() != entity_type || event.entity_id() != entity_id {
            return Err(EngineError::MalformedRequest(format!(
                "event targets {} but was submitted to {}",
                event.stream_id(),
                StreamId::for_entity(entity_type, entity_id)
            )));
        }

        let config = self.registry.lookup(entity_type)?;
        let stream_id = StreamId::for_entity(entity_type, entity_id);

        let (mut entity, observed) = self.replay(config, &stream_id, entity_id).await?;
        tracing::debug!(observed_version = %observed, "Replayed stream");

        let handler =
            config
                .handler(event.event_type())
                .ok_or_else(|| EngineError::NoHandler {
                    entity_type: entity_type.to_string(),
                    event_type: event.event_type().to_string(),
                })?;

        let metadata = handler.apply(entity_id, &event, &mut entity)?;
        entity.version = entity.version.next();

        self.check_references(config, &entity).await?;
        run_validators(config, &entity)?;

        let version = self
            .log
            .store(stream_id, Some(expected_version.unwrap_or(observed)), event, metadata)
            .await?;
        Ok(version)
    }

    /// Rebuild the current projection of an entity without writing anything.
    ///
    /// Reads are not coordinated with writes: the result may already be stale by the
    /// time it is returned, so it must not drive a commit decision.
    ///
    /// # Errors
    ///
    /// - `UnknownEntityType`: nothing registered under `entity_type`
    /// - `UnreplayableHistory`, `CorruptHistory`: the stream cannot be replayed
    /// - `Log`: the log service failed
    #[tracing::instrument(skip(self))]
    pub async fn read_entity(&self, entity_type: &str, entity_id: &str) -> Result<(Entity, Version)> {
        let config = self.registry.lookup(entity_type)?;
        let stream_id = StreamId::for_entity(entity_type, entity_id);
        self.replay(config, &stream_id, entity_id).await
    }

    async fn replay(
        &self,
        config: &EntityTypeConfig,
        stream_id: &StreamId,
        entity_id: &str,
    ) -> Result<(Entity, Version)> {
        let loaded = self.log.range(stream_id.clone()).await?;
        let entity = aggregate(config, entity_id, &loaded.events)?;

        if entity.version != loaded.version {
            tracing::warn!(
                stream_id = %stream_id,
                replayed = %entity.version,
                reported = %loaded.version,
                "Log reported a version that differs from the replayed event count"
            );
        }

        Ok((entity, loaded.version))
    }

    async fn check_references(&self, config: &EntityTypeConfig, entity: &Entity) -> Result<()> {
        for reference in config.references() {
            let field = &reference.field_key;
            match entity.get(field) {
                Some(Value::String(value)) if !value.is_empty() => {
                    let target = StreamId::for_entity(&reference.target_entity_type, value);
                    match self.log.version(target.clone()).await {
                        Ok(_) => {},
                        Err(EventLogError::StreamNotFound(_)) => {
                            return Err(EngineError::InvalidReference {
                                field: field.clone(),
                                value: value.clone(),
                                stream_id: target,
                            });
                        },
                        Err(other) => return Err(other.into()),
                    }
                },
                None | Some(Value::Null) if reference.nullable => {},
                Some(Value::String(_)) if reference.nullable => {},
                _ => {
                    return Err(EngineError::InvalidReferenceType {
                        field: field.clone(),
                    });
                },
            }
        }
        Ok(())
    }
}

fn run_validators(config: &EntityTypeConfig, entity: &Entity) -> Result<()> {
    for (name, validator) in config.validators() {
        validator
            .validate(entity)
            .map_err(|source| EngineError::ValidationFailed {
                validator: name.to_string(),
                source,
            })?;
    }
    Ok(())
}
