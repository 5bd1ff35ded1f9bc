//! Stream identification and versioning types.
//!
//! Every entity instance owns exactly one stream. The stream key is the entity type
//! and the entity id joined with a dash (`"order-42"`), and the stream's version is
//! the number of events committed to it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `StreamId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid stream ID: {0}")]
pub struct ParseStreamIdError(String);

/// Key of one entity stream in the ordered log.
///
/// Built from an entity type and an entity id with [`StreamId::for_entity`]. The same
/// key shape is used when probing a reference target, so `customer-c1` names the
/// stream of customer `c1` no matter which entity holds the reference.
///
/// # Examples
///
/// ```
/// use strata_core::stream::StreamId;
///
/// let stream_id = StreamId::for_entity("order", "42");
/// assert_eq!(stream_id.as_str(), "order-42");
///
/// let parsed: StreamId = "customer-c1".parse().unwrap();
/// assert_eq!(parsed, StreamId::for_entity("customer", "c1"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId(String);

impl StreamId {
    /// Build the stream key for an entity instance.
    #[must_use]
    pub fn for_entity(entity_type: &str, entity_id: &str) -> Self {
        Self(format!("{entity_type}-{entity_id}"))
    }

    /// Get the stream key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StreamId {
    type Err = ParseStreamIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseStreamIdError("Stream ID cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for StreamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Length of a stream: the number of events committed to it.
///
/// A stream that was never written is at [`Version::INITIAL`]. Each successful
/// commit moves the stream forward by exactly one, so the version returned by a
/// write is the stream length immediately after that write.
///
/// # Examples
///
/// ```
/// use strata_core::stream::Version;
///
/// let v0 = Version::INITIAL;
/// assert_eq!(v0.next(), Version::new(1));
/// assert_eq!(Version::new(5).value(), 5);
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// The version of a stream with no events.
    pub const INITIAL: Self = Self(0);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Check if this is the initial version (0).
    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

impl FromStr for Version {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod stream_id_tests {
        use super::*;

        #[test]
        fn for_entity_joins_type_and_id() {
            let id = StreamId::for_entity("customer", "c1");
            assert_eq!(id.as_str(), "customer-c1");
        }

        #[test]
        fn ids_containing_dashes_are_kept_verbatim() {
            let id = StreamId::for_entity("order", "2024-01-a");
            assert_eq!(id.as_str(), "order-2024-01-a");
        }

        #[test]
        fn parse_empty_string_fails() {
            let result = "".parse::<StreamId>();
            assert!(result.is_err());
        }

        #[test]
        fn display() {
            let id = StreamId::for_entity("user", "u1");
            assert_eq!(format!("{id}"), "user-u1");
        }
    }

    mod version_tests {
        use super::*;

        #[test]
        fn initial_version() {
            assert_eq!(Version::INITIAL, Version::new(0));
            assert_eq!(Version::default(), Version::INITIAL);
            assert!(Version::INITIAL.is_initial());
        }

        #[test]
        fn next_version() {
            let v1 = Version::INITIAL.next();
            assert_eq!(v1, Version::new(1));
            assert_eq!(v1.next(), Version::new(2));
            assert!(!v1.is_initial());
        }

        #[test]
        fn parses_from_header_text() {
            assert_eq!(" 7 ".parse::<Version>(), Ok(Version::new(7)));
            assert!("seven".parse::<Version>().is_err());
            assert!("-1".parse::<Version>().is_err());
        }

        #[test]
        fn ordering() {
            assert!(Version::new(1) < Version::new(2));
        }
    }
}
