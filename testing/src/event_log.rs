//! In-memory ordered log for tests.
//!
//! Streams live in a `HashMap` behind a lock; the compare-and-set in
//! [`EventLog::store`] runs under the write lock, so concurrent writers to one
//! stream see exactly the conflicts a real log would report.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use strata_core::event::{CommitMetadata, Event};
use strata_core::event_log::{EventLog, EventLogError, LoadedStream, LogFuture};
use strata_core::stream::{StreamId, Version};

type Streams = HashMap<StreamId, Vec<(Event, CommitMetadata)>>;

/// `HashMap`-backed [`EventLog`].
///
/// Cloning shares the underlying streams.
///
/// # Example
///
/// ```
/// use strata_core::event::{CommitMetadata, Event};
/// use strata_core::event_log::EventLog;
/// use strata_core::stream::{StreamId, Version};
/// use strata_testing::{InMemoryEventLog, test_clock};
/// use strata_core::environment::Clock;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let log = InMemoryEventLog::new();
/// let event = Event::new("e1", "create", "user", "u1", test_clock().now());
///
/// let version = log
///     .store(StreamId::for_entity("user", "u1"), Some(Version::INITIAL), event, CommitMetadata::none())
///     .await?;
/// assert_eq!(version, Version::new(1));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventLog {
    streams: Arc<RwLock<Streams>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryEventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stream with events, bypassing every check.
    ///
    /// Useful for setting up histories the engine itself would never write.
    pub fn seed(&self, events: impl IntoIterator<Item = Event>) {
        let mut streams = self.streams.write().unwrap();
        for event in events {
            streams
                .entry(event.stream_id())
                .or_default()
                .push((event, CommitMetadata::none()));
        }
    }

    /// Make every subsequent call fail with a backend error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Events committed to a stream, oldest first.
    #[must_use]
    pub fn events(&self, stream_id: &StreamId) -> Vec<Event> {
        self.streams
            .read()
            .unwrap()
            .get(stream_id)
            .map(|entries| entries.iter().map(|(event, _)| event.clone()).collect())
            .unwrap_or_default()
    }

    /// Commit metadata forwarded with each event of a stream.
    #[must_use]
    pub fn metadata(&self, stream_id: &StreamId) -> Vec<CommitMetadata> {
        self.streams
            .read()
            .unwrap()
            .get(stream_id)
            .map(|entries| entries.iter().map(|(_, metadata)| metadata.clone()).collect())
            .unwrap_or_default()
    }

    /// Current length of a stream, 0 if absent.
    #[must_use]
    pub fn stream_version(&self, stream_id: &StreamId) -> Version {
        Version::new(
            self.streams
                .read()
                .unwrap()
                .get(stream_id)
                .map_or(0, |entries| entries.len() as u64),
        )
    }

    /// Number of streams with at least one event.
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.read().unwrap().len()
    }

    /// Whether nothing has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.read().unwrap().is_empty()
    }

    /// Drop every stream (for test isolation).
    pub fn clear(&self) {
        self.streams.write().unwrap().clear();
    }

    fn check_available(&self) -> Result<(), EventLogError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EventLogError::Backend("log unavailable".to_string()));
        }
        Ok(())
    }
}

impl EventLog for InMemoryEventLog {
    fn range(&self, stream_id: StreamId) -> LogFuture<'_, LoadedStream> {
        Box::pin(async move {
            self.check_available()?;
            let streams = self.streams.read().unwrap();
            Ok(streams.get(&stream_id).map_or_else(LoadedStream::empty, |entries| {
                LoadedStream {
                    events: entries.iter().map(|(event, _)| event.clone()).collect(),
                    version: Version::new(entries.len() as u64),
                }
            }))
        })
    }

    fn store(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        event: Event,
        metadata: CommitMetadata,
    ) -> LogFuture<'_, Version> {
        Box::pin(async move {
            self.check_available()?;
            let mut streams = self.streams.write().unwrap();
            let entries = streams.entry(stream_id.clone()).or_default();
            let actual = Version::new(entries.len() as u64);

            if let Some(expected) = expected_version.filter(|expected| *expected != actual) {
                if entries.is_empty() {
                    streams.remove(&stream_id);
                }
                return Err(EventLogError::ConcurrencyConflict {
                    stream_id,
                    expected,
                    actual,
                });
            }

            entries.push((event, metadata));
            Ok(actual.next())
        })
    }

    fn version(&self, stream_id: StreamId) -> LogFuture<'_, Version> {
        Box::pin(async move {
            self.check_available()?;
            self.streams
                .read()
                .unwrap()
                .get(&stream_id)
                .map(|entries| Version::new(entries.len() as u64))
                .ok_or(EventLogError::StreamNotFound(stream_id))
        })
    }
}
