//! Event-application logic.
//!
//! A handler both validates and folds one event type into a projection. The same
//! handler runs during replay (historical events) and on the write path (the new
//! event), so it must be deterministic and touch nothing but the projection.
//!
//! # Example
//!
//! ```
//! use strata_core::entity::Entity;
//! use strata_core::event::{CommitMetadata, Event};
//! use strata_core::handler::{EventHandler, HandlerError, handler_fn};
//! use serde_json::json;
//!
//! let create = handler_fn("create", |entity_id, event: &Event, entity: &mut Entity| {
//!     if entity.exists() {
//!         return Err(HandlerError::AlreadyExists { entity_id: entity_id.to_string() });
//!     }
//!     entity.data.extend(event.payload().clone());
//!     entity.set("active", json!(true));
//!     Ok(CommitMetadata::none())
//! });
//!
//! assert_eq!(create.event_type(), "create");
//! ```

use crate::entity::Entity;
use crate::event::{CommitMetadata, Event};
use std::fmt;
use thiserror::Error;

/// Domain error returned when an event is not a valid transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// A creation event targeted an entity that already exists.
    #[error("Entity {entity_id} already exists")]
    AlreadyExists {
        /// Target entity id.
        entity_id: String,
    },

    /// An event targeted an entity that does not exist (or was deleted).
    #[error("Entity {entity_id} does not exist")]
    NotFound {
        /// Target entity id.
        entity_id: String,
    },

    /// Any other rejected transition.
    #[error("{0}")]
    Rejected(String),
}

impl HandlerError {
    /// Reject a transition with a message.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// Per-event-type application logic, registered on an entity type.
pub trait EventHandler: Send + Sync {
    /// The event type tag this handler is registered under.
    fn event_type(&self) -> &str;

    /// Fold `event` into `entity`.
    ///
    /// Implementations mutate only `entity.data`. The returned metadata is forwarded
    /// to the log when the event is committed and ignored during replay.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] if the event is not a valid transition from the
    /// current state.
    fn apply(
        &self,
        entity_id: &str,
        event: &Event,
        entity: &mut Entity,
    ) -> Result<CommitMetadata, HandlerError>;
}

impl EventHandler for Box<dyn EventHandler> {
    fn event_type(&self) -> &str {
        self.as_ref().event_type()
    }

    fn apply(
        &self,
        entity_id: &str,
        event: &Event,
        entity: &mut Entity,
    ) -> Result<CommitMetadata, HandlerError> {
        self.as_ref().apply(entity_id, event, entity)
    }
}

/// An [`EventHandler`] backed by a closure. Built with [`handler_fn`].
pub struct FnHandler<F> {
    event_type: String,
    apply: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler")
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&str, &Event, &mut Entity) -> Result<CommitMetadata, HandlerError> + Send + Sync,
{
    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn apply(
        &self,
        entity_id: &str,
        event: &Event,
        entity: &mut Entity,
    ) -> Result<CommitMetadata, HandlerError> {
        (self.apply)(entity_id, event, entity)
    }
}

/// Build a handler from a closure.
#[must_use]
pub fn handler_fn<F>(event_type: impl Into<String>, apply: F) -> FnHandler<F>
where
    F: Fn(&str, &Event, &mut Entity) -> Result<CommitMetadata, HandlerError> + Send + Sync,
{
    FnHandler {
        event_type: event_type.into(),
        apply,
    }
}
