//! Entity type registry.
//!
//! Each entity type is described once at startup by an [`EntityTypeConfig`]: which
//! handler applies each event type, which fields reference other entity streams, and
//! which validators must hold before a commit. The [`EntityRegistry`] is immutable
//! once the engine is built and is consulted on every read and write.
//!
//! # Example
//!
//! ```
//! use strata_core::registry::{EntityRegistry, EntityTypeConfig, Reference};
//! use strata_core::validator::RequiredFields;
//!
//! # fn main() -> Result<(), strata_core::ConfigError> {
//! let order = EntityTypeConfig::new("order")
//!     .with_crud()?
//!     .with_reference(Reference::required("customerId", "customer"))
//!     .with_validator("required", RequiredFields::new(["customerId"]))?;
//!
//! let mut registry = EntityRegistry::new();
//! registry.register(order)?;
//!
//! assert!(registry.lookup("order").is_ok());
//! assert!(registry.register(EntityTypeConfig::new("order")).is_err());
//! # Ok(())
//! # }
//! ```

use crate::crud;
use crate::error::{ConfigError, ConfigResult};
use crate::handler::EventHandler;
use crate::validator::Validator;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Lookup of an entity type that was never registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown entity type: {0}")]
pub struct UnknownEntityType(pub String);

/// A projected field that must name an existing stream of another entity type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Field in the projection holding the target entity id.
    pub field_key: String,
    /// Entity type of the target stream.
    pub target_entity_type: String,
    /// Whether an absent, null or empty value is accepted.
    pub nullable: bool,
}

impl Reference {
    /// A reference that must always resolve.
    #[must_use]
    pub fn required(field_key: impl Into<String>, target_entity_type: impl Into<String>) -> Self {
        Self {
            field_key: field_key.into(),
            target_entity_type: target_entity_type.into(),
            nullable: false,
        }
    }

    /// A reference that may be left empty.
    #[must_use]
    pub fn nullable(field_key: impl Into<String>, target_entity_type: impl Into<String>) -> Self {
        Self {
            field_key: field_key.into(),
            target_entity_type: target_entity_type.into(),
            nullable: true,
        }
    }
}

/// Static registration for one entity type.
pub struct EntityTypeConfig {
    name: String,
    event_handlers: HashMap<String, Box<dyn EventHandler>>,
    references: Vec<Reference>,
    validators: Vec<(String, Box<dyn Validator>)>,
}

impl fmt::Debug for EntityTypeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut event_types: Vec<&str> = self.event_types().collect();
        event_types.sort_unstable();
        f.debug_struct("EntityTypeConfig")
            .field("name", &self.name)
            .field("event_types", &event_types)
            .field("references", &self.references)
            .field(
                "validators",
                &self.validators.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl EntityTypeConfig {
    /// Start describing an entity type.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            event_handlers: HashMap::new(),
            references: Vec::new(),
            validators: Vec::new(),
        }
    }

    /// Entity type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a handler under its event type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateHandler`] if a handler for the same event type
    /// is already registered. Handlers are never silently replaced.
    pub fn add_event_handler<H>(&mut self, handler: H) -> ConfigResult<&mut Self>
    where
        H: EventHandler + 'static,
    {
        let event_type = handler.event_type().to_string();
        if self.event_handlers.contains_key(&event_type) {
            return Err(ConfigError::DuplicateHandler {
                entity_type: self.name.clone(),
                event_type,
            });
        }
        self.event_handlers.insert(event_type, Box::new(handler));
        Ok(self)
    }

    /// Builder form of [`add_event_handler`](Self::add_event_handler).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateHandler`] on a duplicate event type.
    pub fn with_event_handler<H>(mut self, handler: H) -> ConfigResult<Self>
    where
        H: EventHandler + 'static,
    {
        self.add_event_handler(handler)?;
        Ok(self)
    }

    /// Register the stock `create`, `update` and `delete` handlers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateHandler`] if any of those event types already
    /// has a handler.
    pub fn with_crud(self) -> ConfigResult<Self> {
        self.with_event_handler(crud::Create)?
            .with_event_handler(crud::Update)?
            .with_event_handler(crud::Delete)
    }

    /// Declare a reference field. References are checked in declaration order.
    pub fn add_reference(&mut self, reference: Reference) -> &mut Self {
        self.references.push(reference);
        self
    }

    /// Builder form of [`add_reference`](Self::add_reference).
    #[must_use]
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.add_reference(reference);
        self
    }

    /// Register a named validator. Validators run in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateValidator`] if the name is taken.
    pub fn add_validator<V>(&mut self, name: impl Into<String>, validator: V) -> ConfigResult<&mut Self>
    where
        V: Validator + 'static,
    {
        let name = name.into();
        if self.validators.iter().any(|(n, _)| *n == name) {
            return Err(ConfigError::DuplicateValidator {
                entity_type: self.name.clone(),
                validator: name,
            });
        }
        self.validators.push((name, Box::new(validator)));
        Ok(self)
    }

    /// Builder form of [`add_validator`](Self::add_validator).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateValidator`] if the name is taken.
    pub fn with_validator<V>(mut self, name: impl Into<String>, validator: V) -> ConfigResult<Self>
    where
        V: Validator + 'static,
    {
        self.add_validator(name, validator)?;
        Ok(self)
    }

    /// Handler registered for an event type.
    #[must_use]
    pub fn handler(&self, event_type: &str) -> Option<&dyn EventHandler> {
        self.event_handlers.get(event_type).map(|handler| handler.as_ref())
    }

    /// Event types with a registered handler, in no particular order.
    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.event_handlers.keys().map(String::as_str)
    }

    /// Declared references, in declaration order.
    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Named validators, in registration order.
    pub fn validators(&self) -> impl Iterator<Item = (&str, &dyn Validator)> {
        self.validators.iter().map(|(n, v)| (n.as_str(), v.as_ref()))
    }
}

/// All registered entity types, keyed by name.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<String, EntityTypeConfig>,
}

impl EntityRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateEntityType`] if the name is already taken.
    /// Configs are never merged.
    pub fn register(&mut self, config: EntityTypeConfig) -> ConfigResult<&mut Self> {
        if self.entities.contains_key(config.name()) {
            return Err(ConfigError::DuplicateEntityType(config.name));
        }
        self.entities.insert(config.name.clone(), config);
        Ok(self)
    }

    /// Find an entity type by name.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownEntityType`] if nothing is registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<&EntityTypeConfig, UnknownEntityType> {
        self.entities
            .get(name)
            .ok_or_else(|| UnknownEntityType(name.to_string()))
    }

    /// Number of registered entity types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Panics: Test will fail if registration fails
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::event::CommitMetadata;
    use crate::handler::handler_fn;
    use crate::validator::ValidationError;

    fn noop(event_type: &'static str) -> impl EventHandler + 'static {
        handler_fn(event_type, |_, _, _: &mut Entity| Ok(CommitMetadata::none()))
    }

    #[test]
    fn duplicate_entity_type_is_rejected() {
        let mut registry = EntityRegistry::new();
        registry.register(EntityTypeConfig::new("user")).unwrap();

        let result = registry.register(EntityTypeConfig::new("user"));
        assert_eq!(
            result.err(),
            Some(ConfigError::DuplicateEntityType("user".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_unknown_entity_type() {
        let registry = EntityRegistry::new();
        assert_eq!(
            registry.lookup("ghost").err(),
            Some(UnknownEntityType("ghost".to_string()))
        );
    }

    #[test]
    fn duplicate_handler_is_rejected() {
        let mut config = EntityTypeConfig::new("user");
        config.add_event_handler(noop("create")).unwrap();

        let result = config.add_event_handler(noop("create"));
        assert!(matches!(
            result,
            Err(ConfigError::DuplicateHandler { ref event_type, .. }) if event_type == "create"
        ));
    }

    #[test]
    fn crud_conflicts_with_custom_create() {
        let result = EntityTypeConfig::new("user")
            .with_event_handler(noop("create"))
            .unwrap()
            .with_crud();
        assert!(result.is_err());
    }

    #[test]
    fn validators_keep_registration_order() {
        let ok = |_: &Entity| -> Result<(), ValidationError> { Ok(()) };
        let config = EntityTypeConfig::new("order")
            .with_validator("zeta", ok)
            .unwrap()
            .with_validator("alpha", ok)
            .unwrap();

        let names: Vec<&str> = config.validators().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);

        assert!(config.with_validator("zeta", ok).is_err());
    }

    #[test]
    fn references_keep_declaration_order() {
        let config = EntityTypeConfig::new("order")
            .with_reference(Reference::required("customerId", "customer"))
            .with_reference(Reference::nullable("couponId", "coupon"));

        let fields: Vec<&str> = config
            .references()
            .iter()
            .map(|r| r.field_key.as_str())
            .collect();
        assert_eq!(fields, vec!["customerId", "couponId"]);
        assert!(config.references()[1].nullable);
    }
}
