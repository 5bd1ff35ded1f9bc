//! # Strata Runtime
//!
//! Write pipeline, read path and authorization gate for the Strata engine.
//!
//! ## Core Components
//!
//! - **Aggregation**: folds a stream into a projection ([`aggregation::aggregate`])
//! - **Write Pipeline**: replays, applies, checks references, validates and commits
//!   one event under a per-stream compare-and-set ([`WritePipeline`])
//! - **Authorization Gate**: credential to role to capability ([`AuthorizationGate`])
//! - **Engine**: the transport-agnostic submission and query boundary ([`Engine`])
//!
//! ## Example
//!
//! ```ignore
//! use strata_runtime::{Engine, EngineConfig, EventSubmission};
//!
//! strata_runtime::init_tracing();
//!
//! let engine = Engine::builder(log)
//!     .config(EngineConfig::from_env()?)
//!     .entity_type(EntityTypeConfig::new("customer").with_crud()?)
//!     .verifier(verifier)
//!     .build()?;
//!
//! let receipt = engine
//!     .submit(EventSubmission::new("customer", "create", json!({"name": "Ada"})))
//!     .await?;
//!
//! let customer = engine.query_entity("customer", &receipt.entity_id).await?;
//! ```

pub mod aggregation;
pub mod authorization;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod pipeline;

pub use authorization::AuthorizationGate;
pub use config::EngineConfig;
pub use engine::{
    Engine, EngineBuilder, EventSubmission, SubmissionReceipt, USER_ENTITY_TYPE,
    parse_expected_version,
};
pub use error::{AuthError, EngineError, Result};
pub use pipeline::WritePipeline;

/// Install a global `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Intended for binaries embedding the engine. Does nothing if a subscriber is
/// already installed.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already installed");
    }
}
