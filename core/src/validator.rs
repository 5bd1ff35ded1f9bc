//! Declarative validators run against a finished projection.
//!
//! Validators see the entity after the new event has been applied and before it is
//! committed. Closures of the right shape are validators, and [`RequiredFields`]
//! covers the common "these fields must be present" case.

use crate::entity::Entity;
use serde_json::Value;
use thiserror::Error;

/// A failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    /// Create a validation error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Predicate over a finished projection.
pub trait Validator: Send + Sync {
    /// Check the projection.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing why the projection is invalid.
    fn validate(&self, entity: &Entity) -> Result<(), ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&Entity) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, entity: &Entity) -> Result<(), ValidationError> {
        self(entity)
    }
}

/// Requires each listed field to be present, non-null and, for strings, non-empty.
#[derive(Debug, Clone)]
pub struct RequiredFields {
    fields: Vec<String>,
}

impl RequiredFields {
    /// Require the given fields.
    #[must_use]
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for RequiredFields {
    fn validate(&self, entity: &Entity) -> Result<(), ValidationError> {
        for field in &self.fields {
            match entity.get(field) {
                None | Some(Value::Null) => {
                    return Err(ValidationError::new(format!("{field} is required")));
                },
                Some(Value::String(s)) if s.is_empty() => {
                    return Err(ValidationError::new(format!("{field} must not be empty")));
                },
                Some(_) => {},
            }
        }
        Ok(())
    }
}
