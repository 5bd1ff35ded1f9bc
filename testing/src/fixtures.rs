//! Ready-made entity types, roles, events and claims for tests.
//!
//! The entity types model a small shop:
//!
//! - `user`: `create` copies the payload and marks the user active; `update` and
//!   `delete` are the stock CRUD handlers. `name` is required.
//! - `customer`, `coupon`: stock CRUD.
//! - `order`: stock CRUD, a required `customerId` reference, a nullable `couponId`
//!   reference, and two validators on `total` (`total_present`, then
//!   `total_positive`).

#![allow(clippy::expect_used)] // Fixture wiring is static and covered by this module's tests
#![allow(clippy::missing_panics_doc)]

use crate::test_clock;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use strata_core::capability::{Role, Roles};
use strata_core::crud::{Delete, Update};
use strata_core::entity::Entity;
use strata_core::environment::Clock;
use strata_core::event::{CommitMetadata, Event, payload_from_value};
use strata_core::handler::{HandlerError, handler_fn};
use strata_core::registry::{EntityRegistry, EntityTypeConfig, Reference};
use strata_core::session::SessionClaims;
use strata_core::validator::{RequiredFields, ValidationError};

static NEXT_EVENT: AtomicU64 = AtomicU64::new(1);

/// `user` entity type.
#[must_use]
pub fn user_config() -> EntityTypeConfig {
    let mut config = EntityTypeConfig::new("user");
    config
        .add_event_handler(handler_fn("create", |entity_id, event, entity: &mut Entity| {
            if entity.exists() {
                return Err(HandlerError::AlreadyExists {
                    entity_id: entity_id.to_string(),
                });
            }
            entity.data.clone_from(event.payload());
            entity.set("active", json!(true));
            Ok(CommitMetadata::new(json!({ "subject": event.field("name") })))
        }))
        .and_then(|config| config.add_event_handler(Update))
        .and_then(|config| config.add_event_handler(Delete))
        .and_then(|config| config.add_validator("name_required", RequiredFields::new(["name"])))
        .expect("user fixture is well formed");
    config
}

/// `customer` entity type.
#[must_use]
pub fn customer_config() -> EntityTypeConfig {
    EntityTypeConfig::new("customer")
        .with_crud()
        .expect("customer fixture is well formed")
}

/// `coupon` entity type.
#[must_use]
pub fn coupon_config() -> EntityTypeConfig {
    EntityTypeConfig::new("coupon")
        .with_crud()
        .expect("coupon fixture is well formed")
}

/// `order` entity type.
#[must_use]
pub fn order_config() -> EntityTypeConfig {
    EntityTypeConfig::new("order")
        .with_crud()
        .and_then(|config| {
            config
                .with_reference(Reference::required("customerId", "customer"))
                .with_reference(Reference::nullable("couponId", "coupon"))
                .with_validator("total_present", RequiredFields::new(["total"]))
        })
        .and_then(|config| config.with_validator("total_positive", total_positive))
        .expect("order fixture is well formed")
}

fn total_positive(entity: &Entity) -> Result<(), ValidationError> {
    match entity.get("total").and_then(Value::as_f64) {
        Some(total) if total > 0.0 => Ok(()),
        _ => Err(ValidationError::new("total must be a positive number")),
    }
}

/// A registry with every fixture entity type.
#[must_use]
pub fn shop_registry() -> EntityRegistry {
    let mut registry = EntityRegistry::new();
    for config in [user_config(), customer_config(), coupon_config(), order_config()] {
        registry.register(config).expect("fixture names are unique");
    }
    registry
}

/// `admin` (anything), `editor` (`create`, `update`) and `viewer` (nothing).
#[must_use]
pub fn shop_roles() -> Roles {
    let mut roles = Roles::new();
    roles
        .add(Role::unrestricted("admin"))
        .and_then(|roles| roles.add(Role::new("editor", ["create", "update"])))
        .and_then(|roles| roles.add(Role::new("viewer", Vec::<String>::new())))
        .expect("fixture roles are unique");
    roles
}

/// An event stamped with the test clock and a fresh id.
///
/// `payload` must be a flat JSON object.
#[must_use]
pub fn event(entity_type: &str, entity_id: &str, event_type: &str, payload: Value) -> Event {
    let id = format!("evt-{}", NEXT_EVENT.fetch_add(1, Ordering::Relaxed));
    Event::new(id, event_type, entity_type, entity_id, test_clock().now())
        .with_payload(payload_from_value(payload).expect("fixture payloads are flat objects"))
}

/// Claims issued at `issued_at` and valid for one hour.
#[must_use]
pub fn claims(role: &str, subject: &str, issued_at: DateTime<Utc>) -> SessionClaims {
    SessionClaims {
        role: role.to_string(),
        subject: subject.to_string(),
        issued_at,
        expires_at: issued_at + Duration::hours(1),
        token_id: format!("{subject}-{}", issued_at.timestamp()),
    }
}
