//! Configuration errors raised while wiring up the engine.

use thiserror::Error;

/// Result type alias for configuration steps.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// A startup configuration mistake.
///
/// These are fatal: a process that hits one must not go on serving requests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two entity types were registered under the same name.
    #[error("Entity type {0} is already registered")]
    DuplicateEntityType(String),

    /// Two handlers were registered for the same event type on one entity type.
    #[error("Entity type {entity_type} already has a handler for event {event_type}")]
    DuplicateHandler {
        /// Entity type being configured.
        entity_type: String,
        /// Event type registered twice.
        event_type: String,
    },

    /// Two validators were registered under the same name on one entity type.
    #[error("Entity type {entity_type} already has a validator named {validator}")]
    DuplicateValidator {
        /// Entity type being configured.
        entity_type: String,
        /// Validator name registered twice.
        validator: String,
    },

    /// Two roles were registered under the same name.
    #[error("Role {0} is already registered")]
    DuplicateRole(String),

    /// A duration string could not be parsed.
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// A setting had a value that could not be interpreted.
    #[error("Invalid value for {key}: {value}")]
    InvalidSetting {
        /// Setting name.
        key: String,
        /// Offending value.
        value: String,
    },

    /// Authorization is on but no credential verifier was supplied.
    #[error("Authorization is enabled but no credential verifier is configured")]
    MissingVerifier,
}
