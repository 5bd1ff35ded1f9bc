//! # Strata Core
//!
//! Core types and traits for the Strata event-sourcing write path.
//!
//! Application state is never stored directly. Every entity instance owns an
//! append-only stream of [`Event`](event::Event)s and its current state is a
//! projection rebuilt by folding that stream through per-event-type handlers.
//!
//! ## Core Concepts
//!
//! - **Event**: an immutable fact targeting one entity stream
//! - **Stream**: the ordered events of one `(entity type, entity id)` pair
//! - **Entity**: the projection derived by replaying a stream
//! - **Handler**: per-event-type logic that validates and folds an event
//! - **Registry**: per-entity-type handlers, references and validators
//! - **Role**: a named set of event types a caller may submit
//!
//! ## Example
//!
//! ```
//! use strata_core::handler::handler_fn;
//! use strata_core::event::CommitMetadata;
//! use strata_core::registry::{EntityRegistry, EntityTypeConfig};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), strata_core::ConfigError> {
//! let user = EntityTypeConfig::new("user").with_event_handler(handler_fn(
//!     "create",
//!     |_, event, entity| {
//!         entity.data.extend(event.payload().clone());
//!         entity.set("active", json!(true));
//!         Ok(CommitMetadata::none())
//!     },
//! ))?;
//!
//! let mut registry = EntityRegistry::new();
//! registry.register(user)?;
//! # Ok(())
//! # }
//! ```

pub use chrono::{DateTime, Utc};

pub mod capability;
pub mod crud;
pub mod entity;
pub mod error;
pub mod event;
pub mod event_log;
pub mod handler;
pub mod registry;
pub mod session;
pub mod stream;
pub mod validator;

pub use error::ConfigError;

/// Environment module - Dependency injection traits
///
/// External dependencies the engine consults at runtime are abstracted behind
/// traits so tests can substitute deterministic implementations.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
