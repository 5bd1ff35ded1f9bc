//! Error types for the write pipeline, read path and authorization gate.

use strata_core::event_log::EventLogError;
use strata_core::handler::HandlerError;
use strata_core::registry::UnknownEntityType;
use strata_core::session::CredentialError;
use strata_core::stream::{StreamId, Version};
use strata_core::validator::ValidationError;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Why the authorization gate denied a submission.
///
/// The details are for logs. Callers only ever see the generic denial produced by
/// [`EngineError::Unauthorized`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The credential was missing or did not verify.
    #[error("Credential rejected: {0}")]
    Credential(#[from] CredentialError),

    /// The session is older than the configured session validity.
    #[error("Session has expired")]
    SessionExpired,

    /// The role is unknown or may not submit this event type.
    #[error("Invalid role {role} for event {event_type}")]
    InvalidRole {
        /// Role named in the claims.
        role: String,
        /// Event type being submitted.
        event_type: String,
    },
}

/// Everything that can go wrong on the read and write paths.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    // ═══════════════════════════════════════════════════════════
    // Request Shape
    // ═══════════════════════════════════════════════════════════

    /// The submission could not be interpreted.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    // ═══════════════════════════════════════════════════════════
    // Domain
    // ═══════════════════════════════════════════════════════════

    /// No entity type is registered under this name.
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    /// The entity type has no handler for this event type.
    #[error("No handler for event type {event_type} on entity type {entity_type}")]
    NoHandler {
        /// Target entity type.
        entity_type: String,
        /// Submitted event type.
        event_type: String,
    },

    /// The handler rejected the transition.
    #[error(transparent)]
    Rejected(#[from] HandlerError),

    /// A reference field names a stream that does not exist.
    #[error("Invalid reference: {field} - {value} - {stream_id} does not exist")]
    InvalidReference {
        /// Reference field.
        field: String,
        /// Value held by the field.
        value: String,
        /// Stream that was probed.
        stream_id: StreamId,
    },

    /// A reference field is empty on a non-nullable reference, or not a string.
    #[error("Invalid reference type for {field}, should be a non-empty string")]
    InvalidReferenceType {
        /// Reference field.
        field: String,
    },

    /// A validator rejected the projection.
    #[error("Failed validation: {validator} - {source}")]
    ValidationFailed {
        /// Name of the first failing validator.
        validator: String,
        /// The validator's message.
        source: ValidationError,
    },

    /// Queried an entity whose stream has no events.
    #[error("Entity not found: {0}")]
    EntityNotFound(StreamId),

    // ═══════════════════════════════════════════════════════════
    // Authorization
    // ═══════════════════════════════════════════════════════════

    /// The submission was not authorized.
    #[error("Unauthorized")]
    Unauthorized(#[source] AuthError),

    // ═══════════════════════════════════════════════════════════
    // Replay Integrity
    // ═══════════════════════════════════════════════════════════

    /// A committed event has no handler under the current registry.
    #[error("Unreplayable history in {stream_id}: event {event_id} of type {event_type} has no handler")]
    UnreplayableHistory {
        /// Stream being replayed.
        stream_id: StreamId,
        /// Offending event.
        event_id: String,
        /// Its event type.
        event_type: String,
    },

    /// A handler rejected a committed event during replay.
    #[error("Corrupt history in {stream_id} at event {event_id}: {source}")]
    CorruptHistory {
        /// Stream being replayed.
        stream_id: StreamId,
        /// Offending event.
        event_id: String,
        /// The handler's rejection.
        source: HandlerError,
    },

    // ═══════════════════════════════════════════════════════════
    // Concurrency & Log
    // ═══════════════════════════════════════════════════════════

    /// The stream moved on between read and commit. Safe to retry.
    #[error("Concurrency conflict on {stream_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// Stream being written.
        stream_id: StreamId,
        /// Version the write expected.
        expected: Version,
        /// Version the stream is actually at.
        actual: Version,
    },

    /// The log service failed.
    #[error("Log error: {0}")]
    Log(EventLogError),
}

impl From<EventLogError> for EngineError {
    fn from(error: EventLogError) -> Self {
        match error {
            EventLogError::ConcurrencyConflict {
                stream_id,
                expected,
                actual,
            } => Self::ConcurrencyConflict {
                stream_id,
                expected,
                actual,
            },
            other => Self::Log(other),
        }
    }
}

impl From<UnknownEntityType> for EngineError {
    fn from(error: UnknownEntityType) -> Self {
        Self::UnknownEntityType(error.0)
    }
}

impl From<AuthError> for EngineError {
    fn from(error: AuthError) -> Self {
        Self::Unauthorized(error)
    }
}

impl EngineError {
    /// Returns `true` if retrying the same submission may succeed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use strata_runtime::EngineError;
    /// # use strata_core::stream::{StreamId, Version};
    /// let conflict = EngineError::ConcurrencyConflict {
    ///     stream_id: StreamId::for_entity("user", "u1"),
    ///     expected: Version::new(1),
    ///     actual: Version::new(2),
    /// };
    /// assert!(conflict.is_retryable());
    /// assert!(!EngineError::UnknownEntityType("x".into()).is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }

    /// Returns `true` if the caller sent something the engine refuses.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedRequest(_)
                | Self::UnknownEntityType(_)
                | Self::NoHandler { .. }
                | Self::Rejected(_)
                | Self::InvalidReference { .. }
                | Self::InvalidReferenceType { .. }
                | Self::ValidationFailed { .. }
                | Self::EntityNotFound(_)
        )
    }

    /// Returns `true` if a stored stream cannot be replayed.
    #[must_use]
    pub const fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::UnreplayableHistory { .. } | Self::CorruptHistory { .. }
        )
    }

    /// Short stable label, used for metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed_request",
            Self::UnknownEntityType(_) => "unknown_entity_type",
            Self::NoHandler { .. } => "no_handler",
            Self::Rejected(_) => "rejected",
            Self::InvalidReference { .. } => "invalid_reference",
            Self::InvalidReferenceType { .. } => "invalid_reference_type",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::EntityNotFound(_) => "entity_not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::UnreplayableHistory { .. } => "unreplayable_history",
            Self::CorruptHistory { .. } => "corrupt_history",
            Self::ConcurrencyConflict { .. } => "concurrency_conflict",
            Self::Log(_) => "log",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_does_not_leak_the_failed_check() {
        let error = EngineError::from(AuthError::InvalidRole {
            role: "reader".to_string(),
            event_type: "create".to_string(),
        });
        assert_eq!(error.to_string(), "Unauthorized");
        assert!(!error.is_user_error());
    }

    #[test]
    fn log_conflicts_become_retryable_engine_conflicts() {
        let error = EngineError::from(EventLogError::ConcurrencyConflict {
            stream_id: StreamId::for_entity("order", "o1"),
            expected: Version::new(3),
            actual: Version::new(4),
        });
        assert!(error.is_retryable());
        assert_eq!(error.reason(), "concurrency_conflict");
    }

    #[test]
    fn other_log_errors_are_wrapped() {
        let error = EngineError::from(EventLogError::Backend("down".to_string()));
        assert_eq!(error, EngineError::Log(EventLogError::Backend("down".to_string())));
        assert!(!error.is_retryable());
    }

    #[test]
    fn invalid_reference_message_names_field_value_and_stream() {
        let error = EngineError::InvalidReference {
            field: "customerId".to_string(),
            value: "c9".to_string(),
            stream_id: StreamId::for_entity("customer", "c9"),
        };
        let message = error.to_string();
        assert!(message.contains("customerId"));
        assert!(message.contains("c9"));
        assert!(message.contains("customer-c9"));
    }

    #[test]
    fn validation_failure_names_the_validator() {
        let error = EngineError::ValidationFailed {
            validator: "positive_total".to_string(),
            source: ValidationError::new("total must be positive"),
        };
        assert_eq!(
            error.to_string(),
            "Failed validation: positive_total - total must be positive"
        );
    }
}
