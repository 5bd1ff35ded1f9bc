//! Capability model: which event types each role may submit.

use crate::error::{ConfigError, ConfigResult};
use std::collections::{HashMap, HashSet};

/// Event types a role may submit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Capabilities {
    /// Any event type.
    Any,
    /// Only the listed event types.
    Only(HashSet<String>),
}

/// A named capability set.
///
/// # Examples
///
/// ```
/// use strata_core::capability::Role;
///
/// let editor = Role::new("editor", ["create", "update"]);
/// assert!(editor.can("update"));
/// assert!(!editor.can("delete"));
///
/// assert!(Role::unrestricted("admin").can("delete"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Role {
    name: String,
    capabilities: Capabilities,
}

impl Role {
    /// A role allowed to submit exactly the listed event types.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            capabilities: Capabilities::Only(event_types.into_iter().map(Into::into).collect()),
        }
    }

    /// A role allowed to submit every event type.
    #[must_use]
    pub fn unrestricted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: Capabilities::Any,
        }
    }

    /// Role name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The role's capability set.
    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Whether this role may submit `event_type`.
    #[must_use]
    pub fn can(&self, event_type: &str) -> bool {
        match &self.capabilities {
            Capabilities::Any => true,
            Capabilities::Only(allowed) => allowed.contains(event_type),
        }
    }
}

/// All registered roles, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct Roles {
    roles: HashMap<String, Role>,
}

impl Roles {
    /// No roles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateRole`] if the name is already taken.
    pub fn add(&mut self, role: Role) -> ConfigResult<&mut Self> {
        if self.roles.contains_key(role.name()) {
            return Err(ConfigError::DuplicateRole(role.name));
        }
        self.roles.insert(role.name.clone(), role);
        Ok(self)
    }

    /// Find a role by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    /// Whether role `name` exists and may submit `event_type`.
    #[must_use]
    pub fn permits(&self, name: &str, event_type: &str) -> bool {
        self.get(name).is_some_and(|role| role.can(event_type))
    }

    /// Number of roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Whether no roles are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Panics: Test will fail if registration fails
mod tests {
    use super::*;

    #[test]
    fn capability_set_membership() {
        let reader = Role::new("reader", Vec::<String>::new());
        let writer = Role::new("writer", ["create"]);

        assert!(!reader.can("create"));
        assert!(writer.can("create"));
        assert!(!writer.can("Create"));
    }

    #[test]
    fn permits_requires_known_role() {
        let mut roles = Roles::new();
        roles.add(Role::new("writer", ["create"])).unwrap();

        assert!(roles.permits("writer", "create"));
        assert!(!roles.permits("writer", "delete"));
        assert!(!roles.permits("ghost", "create"));
    }

    #[test]
    fn duplicate_role_is_rejected() {
        let mut roles = Roles::new();
        roles.add(Role::unrestricted("admin")).unwrap();

        let result = roles.add(Role::new("admin", ["create"]));
        assert_eq!(
            result.err(),
            Some(ConfigError::DuplicateRole("admin".to_string()))
        );
        assert!(roles.permits("admin", "anything"));
    }
}
