//! The engine facade: submission boundary, builder and query boundary.
//!
//! [`Engine`] ties the [`AuthorizationGate`] to the [`WritePipeline`]. A transport
//! layer turns its requests into [`EventSubmission`]s and its responses from
//! [`SubmissionReceipt`]s or [`EngineError`]s; nothing here knows about HTTP.
//!
//! # Example
//!
//! ```ignore
//! let engine = Engine::builder(log)
//!     .config(EngineConfig::from_env()?)
//!     .entity_type(EntityTypeConfig::new("user").with_crud()?)
//!     .role(Role::new("editor", ["create", "update"]))
//!     .verifier(verifier)
//!     .build()?;
//!
//! let receipt = engine
//!     .submit(
//!         EventSubmission::new("user", "create", json!({"name": "a"}))
//!             .with_credential(Credential::header(token)),
//!     )
//!     .await?;
//! ```

use crate::authorization::AuthorizationGate;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::pipeline::WritePipeline;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use strata_core::capability::{Role, Roles};
use strata_core::entity::Entity;
use strata_core::environment::{Clock, SystemClock};
use strata_core::error::{ConfigError, ConfigResult};
use strata_core::event::{Event, payload_from_value};
use strata_core::event_log::EventLog;
use strata_core::handler::EventHandler;
use strata_core::registry::{EntityRegistry, EntityTypeConfig};
use strata_core::session::{Credential, CredentialVerifier};
use strata_core::stream::{StreamId, Version};
use uuid::Uuid;

/// Entity type registered by [`EngineBuilder::user_entity`].
pub const USER_ENTITY_TYPE: &str = "user";

/// One event submitted for commit.
#[derive(Clone, Debug, PartialEq)]
pub struct EventSubmission {
    /// Target entity type.
    pub entity_type: String,
    /// Target entity id. A fresh id is generated when absent or empty.
    pub entity_id: Option<String>,
    /// Event type to apply.
    pub event_type: String,
    /// Stream version the caller expects to write on top of.
    pub expected_version: Option<Version>,
    /// Event id. A fresh id is generated when absent or empty.
    pub event_id: Option<String>,
    /// Credential presented by the caller.
    pub credential: Credential,
    /// Event payload. Must be a JSON object of scalar values.
    pub payload: Value,
}

impl EventSubmission {
    /// A submission with no id, no expected version and no credential.
    #[must_use]
    pub fn new(entity_type: impl Into<String>, event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: None,
            event_type: event_type.into(),
            expected_version: None,
            event_id: None,
            credential: Credential::none(),
            payload,
        }
    }

    /// Target an existing entity.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Require the stream to be at `version` before the write.
    #[must_use]
    pub const fn with_expected_version(mut self, version: Version) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Use a caller-chosen event id.
    #[must_use]
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Attach the caller's credential.
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }
}

/// What a successful submission returns to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Entity type written.
    pub entity_type: String,
    /// Entity id written, generated or supplied.
    pub entity_id: String,
    /// Stream version after the commit.
    pub version: Version,
    /// Id of the committed event.
    pub event_id: String,
}

/// Entry point for submissions and queries.
#[derive(Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    pipeline: WritePipeline,
    gate: AuthorizationGate,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Start building an engine on top of `log`.
    #[must_use]
    pub fn builder(log: Arc<dyn EventLog>) -> EngineBuilder {
        EngineBuilder::new(log)
    }

    /// The settings this engine was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The write pipeline, for callers that authorize on their own.
    #[must_use]
    pub const fn pipeline(&self) -> &WritePipeline {
        &self.pipeline
    }

    /// The authorization gate.
    #[must_use]
    pub const fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    /// Authorize, validate and commit one submission.
    ///
    /// # Errors
    ///
    /// - `Unauthorized`: the gate denied the submission
    /// - `MalformedRequest`: missing entity or event type, or a payload that is not a
    ///   flat JSON object
    /// - anything [`WritePipeline::handle_event`] returns
    #[tracing::instrument(
        skip(self, submission),
        fields(entity_type = %submission.entity_type, event_type = %submission.event_type)
    )]
    pub async fn submit(&self, submission: EventSubmission) -> Result<SubmissionReceipt> {
        let EventSubmission {
            entity_type,
            entity_id,
            event_type,
            expected_version,
            event_id,
            credential,
            payload,
        } = submission;

        self.gate.authorize(&event_type, &credential)?;

        if entity_type.is_empty() {
            return Err(EngineError::MalformedRequest("missing entity type".to_string()));
        }
        if event_type.is_empty() {
            return Err(EngineError::MalformedRequest("missing event type".to_string()));
        }
        let payload =
            payload_from_value(payload).map_err(|e| EngineError::MalformedRequest(e.to_string()))?;

        let entity_id = or_generated(entity_id);
        let event_id = or_generated(event_id);

        let event = Event::new(
            event_id.clone(),
            event_type,
            entity_type.clone(),
            entity_id.clone(),
            self.clock.now(),
        )
        .with_payload(payload);

        let (entity_id, version) = self
            .pipeline
            .handle_event(&entity_type, &entity_id, event, expected_version)
            .await?;

        Ok(SubmissionReceipt {
            entity_type,
            entity_id,
            version,
            event_id,
        })
    }

    /// Commit an already-built event without going through the gate.
    ///
    /// # Errors
    ///
    /// See [`WritePipeline::handle_event`].
    pub async fn handle_event(
        &self,
        entity_type: &str,
        entity_id: &str,
        event: Event,
        expected_version: Option<Version>,
    ) -> Result<(String, Version)> {
        self.pipeline
            .handle_event(entity_type, entity_id, event, expected_version)
            .await
    }

    /// Replay an entity. A stream with no events yields an empty projection at
    /// version 0.
    ///
    /// # Errors
    ///
    /// See [`WritePipeline::read_entity`].
    pub async fn read_entity(&self, entity_type: &str, entity_id: &str) -> Result<(Entity, Version)> {
        self.pipeline.read_entity(entity_type, entity_id).await
    }

    /// Replay an entity that must already exist.
    ///
    /// # Errors
    ///
    /// - `EntityNotFound`: the stream has no events
    /// - anything [`WritePipeline::read_entity`] returns
    pub async fn query_entity(&self, entity_type: &str, entity_id: &str) -> Result<Entity> {
        let (entity, version) = self.pipeline.read_entity(entity_type, entity_id).await?;
        if version.is_initial() {
            return Err(EngineError::EntityNotFound(StreamId::for_entity(
                entity_type,
                entity_id,
            )));
        }
        Ok(entity)
    }
}

fn or_generated(id: Option<String>) -> String {
    id.filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Parse an expected version carried as text, for example in a request header.
///
/// An empty or blank string means no version was supplied.
///
/// # Errors
///
/// Returns `MalformedRequest` if the text is not an unsigned integer.
///
/// # Examples
///
/// ```
/// use strata_runtime::engine::parse_expected_version;
/// use strata_core::stream::Version;
///
/// assert_eq!(parse_expected_version("").unwrap(), None);
/// assert_eq!(parse_expected_version(" 3 ").unwrap(), Some(Version::new(3)));
/// assert!(parse_expected_version("three").is_err());
/// ```
pub fn parse_expected_version(raw: &str) -> Result<Option<Version>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.parse::<Version>()
        .map(Some)
        .map_err(|_| EngineError::MalformedRequest(format!("invalid expected version: {raw}")))
}

/// Collects everything an [`Engine`] needs and checks it once, at [`build`].
///
/// Registration mistakes are remembered as they happen; the first one is returned
/// by `build`.
///
/// [`build`]: EngineBuilder::build
pub struct EngineBuilder {
    log: Arc<dyn EventLog>,
    config: EngineConfig,
    registry: EntityRegistry,
    roles: Roles,
    verifier: Option<Arc<dyn CredentialVerifier>>,
    clock: Option<Arc<dyn Clock>>,
    error: Option<ConfigError>,
}

impl EngineBuilder {
    /// Start from default settings and empty registries.
    #[must_use]
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self {
            log,
            config: EngineConfig::default(),
            registry: EntityRegistry::new(),
            roles: Roles::new(),
            verifier: None,
            clock: None,
            error: None,
        }
    }

    /// Use these settings.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an entity type.
    #[must_use]
    pub fn entity_type(mut self, config: EntityTypeConfig) -> Self {
        let result = self.registry.register(config).map(|_| ());
        self.remember(result);
        self
    }

    /// Register an entity type whose configuration may itself have failed to build.
    #[must_use]
    pub fn try_entity_type(mut self, config: ConfigResult<EntityTypeConfig>) -> Self {
        match config {
            Ok(config) => self.entity_type(config),
            Err(error) => {
                self.remember(Err(error));
                self
            },
        }
    }

    /// Register the built-in `user` entity type: the stock CRUD handlers plus
    /// `extra_handlers`.
    ///
    /// Hosts that keep their session subjects as entities register them here in one
    /// call.
    #[must_use]
    pub fn user_entity<I>(self, extra_handlers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn EventHandler>>,
    {
        let config = EntityTypeConfig::new(USER_ENTITY_TYPE)
            .with_crud()
            .and_then(|config| {
                extra_handlers
                    .into_iter()
                    .try_fold(config, EntityTypeConfig::with_event_handler)
            });
        self.try_entity_type(config)
    }

    /// Register a role.
    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        let result = self.roles.add(role).map(|_| ());
        self.remember(result);
        self
    }

    /// Verify credentials with `verifier`.
    #[must_use]
    pub fn verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Read the time from `clock` instead of the system clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    fn remember(&mut self, result: ConfigResult<()>) {
        if let Err(error) = result {
            tracing::error!(error = %error, "Engine configuration error");
            if self.error.is_none() {
                self.error = Some(error);
            }
        }
    }

    /// Finish building.
    ///
    /// # Errors
    ///
    /// Returns the first registration error, or [`ConfigError::MissingVerifier`]
    /// when authorization is on and no verifier was supplied.
    pub fn build(self) -> ConfigResult<Engine> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let gate = if self.config.auth_off {
            tracing::warn!(name = %self.config.name, "Authorization is disabled");
            AuthorizationGate::disabled(Arc::clone(&clock))
        } else {
            let verifier = self.verifier.ok_or(ConfigError::MissingVerifier)?;
            AuthorizationGate::new(
                Arc::new(self.roles),
                verifier,
                Arc::clone(&clock),
                self.config.session_validity,
            )
        };

        tracing::info!(
            name = %self.config.name,
            entity_types = self.registry.len(),
            auth_off = self.config.auth_off,
            "Engine built"
        );

        Ok(Engine {
            config: Arc::new(self.config),
            pipeline: WritePipeline::new(Arc::new(self.registry), self.log),
            gate,
            clock,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Panics: Test will fail if setup fails
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::event::CommitMetadata;
    use strata_core::handler::handler_fn;
    use strata_testing::{InMemoryEventLog, MockCredentialVerifier};

    fn log() -> Arc<dyn EventLog> {
        Arc::new(InMemoryEventLog::new())
    }

    #[test]
    fn parse_expected_version_accepts_blank_and_integers() {
        assert_eq!(parse_expected_version("   ").unwrap(), None);
        assert_eq!(parse_expected_version("0").unwrap(), Some(Version::INITIAL));
        assert!(matches!(
            parse_expected_version("-1"),
            Err(EngineError::MalformedRequest(_))
        ));
    }

    #[test]
    fn builder_requires_a_verifier_when_auth_is_on() {
        let error = Engine::builder(log()).build().unwrap_err();
        assert_eq!(error, ConfigError::MissingVerifier);

        let engine = Engine::builder(log())
            .verifier(Arc::new(MockCredentialVerifier::new()))
            .build()
            .unwrap();
        assert!(!engine.gate().is_disabled());
    }

    #[test]
    fn builder_does_not_need_a_verifier_when_auth_is_off() {
        let engine = Engine::builder(log())
            .config(EngineConfig::default().with_auth_off(true))
            .build()
            .unwrap();
        assert!(engine.gate().is_disabled());
        assert!(engine.config().auth_off);
    }

    #[test]
    fn builder_reports_the_first_registration_error() {
        let error = Engine::builder(log())
            .config(EngineConfig::default().with_auth_off(true))
            .entity_type(EntityTypeConfig::new("user"))
            .entity_type(EntityTypeConfig::new("user"))
            .role(Role::unrestricted("admin"))
            .role(Role::unrestricted("admin"))
            .build()
            .unwrap_err();
        assert_eq!(error, ConfigError::DuplicateEntityType("user".to_string()));
    }

    #[test]
    fn builder_surfaces_entity_type_construction_errors() {
        let error = Engine::builder(log())
            .config(EngineConfig::default().with_auth_off(true))
            .try_entity_type(EntityTypeConfig::new("user").with_crud().and_then(EntityTypeConfig::with_crud))
            .build()
            .unwrap_err();
        assert!(matches!(error, ConfigError::DuplicateHandler { .. }));
    }

    #[tokio::test]
    async fn user_entity_registers_crud_and_extra_handlers() {
        let rename: Box<dyn EventHandler> = Box::new(handler_fn(
            "rename",
            |_entity_id, event: &Event, entity: &mut Entity| {
                let name = event.field("name").cloned().unwrap_or(Value::Null);
                entity.set("name", name);
                Ok(CommitMetadata::none())
            },
        ));
        let engine = Engine::builder(log())
            .config(EngineConfig::default().with_auth_off(true))
            .user_entity([rename])
            .build()
            .unwrap();

        let submit = |event_type: &str, payload| {
            engine.submit(
                EventSubmission::new(USER_ENTITY_TYPE, event_type, payload).with_entity_id("u1"),
            )
        };
        submit("create", json!({"name": "a"})).await.unwrap();
        let receipt = submit("rename", json!({"name": "b"})).await.unwrap();
        assert_eq!(receipt.version, Version::new(2));

        let user = engine.query_entity(USER_ENTITY_TYPE, "u1").await.unwrap();
        assert_eq!(user.get("name"), Some(&json!("b")));
    }

    #[test]
    fn user_entity_rejects_a_second_crud_handler() {
        let create: Box<dyn EventHandler> = Box::new(strata_core::crud::Create);
        let error = Engine::builder(log())
            .config(EngineConfig::default().with_auth_off(true))
            .user_entity([create])
            .build()
            .unwrap_err();
        assert_eq!(
            error,
            ConfigError::DuplicateHandler {
                entity_type: USER_ENTITY_TYPE.to_string(),
                event_type: "create".to_string(),
            }
        );
    }

    #[test]
    fn receipts_serialize_with_numeric_versions() {
        let receipt = SubmissionReceipt {
            entity_type: "user".to_string(),
            entity_id: "u1".to_string(),
            version: Version::new(1),
            event_id: "e1".to_string(),
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["version"], serde_json::json!(1));
    }
}
