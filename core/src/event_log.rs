//! The ordered-log abstraction the write path commits to.
//!
//! The engine never owns durable storage. It reads whole streams, probes streams for
//! existence, and appends single events through [`EventLog`]. Implementations decide
//! how events are persisted and must enforce the compare-and-set on append.
//!
//! # Implementations
//!
//! - `InMemoryEventLog` (in `strata-testing`): `HashMap`-backed, for tests
//!
//! # Example
//!
//! ```no_run
//! use strata_core::event::{CommitMetadata, Event};
//! use strata_core::event_log::{EventLog, EventLogError};
//! use strata_core::stream::Version;
//!
//! async fn append<L: EventLog>(log: &L, event: Event) -> Result<Version, EventLogError> {
//!     let stream_id = event.stream_id();
//!     let loaded = log.range(stream_id.clone()).await?;
//!
//!     // Commit only if nobody else appended since we read.
//!     log.store(stream_id, Some(loaded.version), event, CommitMetadata::none())
//!         .await
//! }
//! ```

use crate::event::{CommitMetadata, Event};
use crate::stream::{StreamId, Version};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`EventLog`] methods.
pub type LogFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, EventLogError>> + Send + 'a>>;

/// Errors that can occur during ordered-log operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventLogError {
    /// The stream moved past the version the writer observed.
    #[error("Concurrency conflict on {stream_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The stream ID where the conflict occurred.
        stream_id: StreamId,
        /// The version the writer expected the stream to be at.
        expected: Version,
        /// The actual current version of the stream.
        actual: Version,
    },

    /// The stream has never been written.
    #[error("Stream not found: {0}")]
    StreamNotFound(StreamId),

    /// The backing service failed.
    #[error("Log backend error: {0}")]
    Backend(String),
}

/// All events of one stream, in commit order, with the stream's version.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadedStream {
    /// Events oldest first.
    pub events: Vec<Event>,
    /// Stream length at read time; `Version::INITIAL` for an absent stream.
    pub version: Version,
}

impl LoadedStream {
    /// A stream that has never been written.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            events: Vec::new(),
            version: Version::INITIAL,
        }
    }
}

/// Ordered, append-only log of entity streams.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures instead of using `async fn` so the engine can hold
/// the log as `Arc<dyn EventLog>`.
pub trait EventLog: Send + Sync {
    /// Load every event of a stream in commit order.
    ///
    /// A stream that does not exist loads as [`LoadedStream::empty`], not an error.
    ///
    /// # Errors
    ///
    /// - `Backend`: the log service failed
    fn range(&self, stream_id: StreamId) -> LogFuture<'_, LoadedStream>;

    /// Append one event to a stream.
    ///
    /// With `Some(expected)`, the append succeeds only if the stream is currently at
    /// `expected`. With `None`, the event is appended unconditionally.
    ///
    /// Returns the stream version after the append.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict`: the stream is not at `expected`
    /// - `Backend`: the log service failed
    fn store(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        event: Event,
        metadata: CommitMetadata,
    ) -> LogFuture<'_, Version>;

    /// Probe a stream for existence and return its version.
    ///
    /// # Errors
    ///
    /// - `StreamNotFound`: the stream has never been written
    /// - `Backend`: the log service failed
    fn version(&self, stream_id: StreamId) -> LogFuture<'_, Version>;
}
