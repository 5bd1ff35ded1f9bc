//! # Strata Testing
//!
//! Testing utilities for the Strata engine.
//!
//! This crate provides:
//! - [`InMemoryEventLog`]: a compare-and-set ordered log backed by a `HashMap`
//! - [`MockCredentialVerifier`]: scripted token-to-claims verification
//! - [`FixedClock`]: deterministic time
//! - [`fixtures`]: a small shop of entity types, roles, events and claims
//! - [`properties`]: proptest strategies for payloads and ids
//!
//! ## Example
//!
//! ```ignore
//! use strata_testing::{InMemoryEventLog, fixtures};
//!
//! #[tokio::test]
//! async fn creates_a_user() {
//!     let log = Arc::new(InMemoryEventLog::new());
//!     let pipeline = WritePipeline::new(Arc::new(fixtures::shop_registry()), log.clone());
//!
//!     let event = fixtures::event("user", "u1", "create", json!({"name": "a"}));
//!     let (_, version) = pipeline.handle_event("user", "u1", event, None).await.unwrap();
//!     assert_eq!(version, Version::new(1));
//! }
//! ```

use chrono::{DateTime, Utc};
use strata_core::environment::Clock;

mod credentials;
mod event_log;
pub mod fixtures;
pub mod properties;

pub use credentials::MockCredentialVerifier;
pub use event_log::InMemoryEventLog;
pub use fixtures::claims;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, RwLock};

    /// Clock for deterministic tests.
    ///
    /// Returns the same time until moved with [`advance`](Self::advance). Clones
    /// share the current time, so a test can hold one clone and hand another to
    /// the engine.
    ///
    /// # Example
    ///
    /// ```
    /// use strata_testing::mocks::FixedClock;
    /// use strata_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let before = clock.now();
    /// assert_eq!(before, clock.now());
    ///
    /// clock.advance(Duration::minutes(10));
    /// assert_eq!(clock.now() - before, Duration::minutes(10));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a clock stopped at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward by `by`.
        ///
        /// # Panics
        ///
        /// Panics if a previous holder of the lock panicked.
        #[allow(clippy::unwrap_used)] // Panics: lock poisoning only follows a panicking test
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.write().unwrap();
            *time += by;
        }
    }

    impl Clock for FixedClock {
        #[allow(clippy::unwrap_used)] // Panics: lock poisoning only follows a panicking test
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

pub use mocks::{FixedClock, test_clock};

/// Install a test-friendly `tracing` subscriber.
///
/// Honors `RUST_LOG`. Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
