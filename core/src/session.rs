//! Session claims and the credential-verification seam.
//!
//! Issuing and verifying credentials happens outside the engine. The engine only
//! needs a function from a bearer string to [`SessionClaims`], expressed as the
//! [`CredentialVerifier`] trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims carried by a verified session credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Role name used for the capability check.
    pub role: String,
    /// Identity of the caller (for example a username).
    pub subject: String,
    /// When the credential was issued.
    pub issued_at: DateTime<Utc>,
    /// When the credential stops being valid.
    pub expires_at: DateTime<Utc>,
    /// Unique id of the credential.
    pub token_id: String,
}

/// Bearer credential presented with a submission.
///
/// A non-empty cookie value takes precedence over the header token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credential {
    /// Session cookie value.
    pub cookie: Option<String>,
    /// Token carried in a request header.
    pub header: Option<String>,
}

impl Credential {
    /// No credential at all.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            cookie: None,
            header: None,
        }
    }

    /// A credential carried in a cookie.
    #[must_use]
    pub fn cookie(token: impl Into<String>) -> Self {
        Self {
            cookie: Some(token.into()),
            header: None,
        }
    }

    /// A credential carried in a request header.
    #[must_use]
    pub fn header(token: impl Into<String>) -> Self {
        Self {
            cookie: None,
            header: Some(token.into()),
        }
    }

    /// The bearer string to verify: the cookie if non-empty, otherwise the header.
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        [self.cookie.as_deref(), self.header.as_deref()]
            .into_iter()
            .flatten()
            .find(|token| !token.is_empty())
    }
}

/// Why a credential could not be verified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No credential was presented.
    #[error("Missing credential")]
    Missing,

    /// The credential could not be decoded.
    #[error("Malformed credential")]
    Malformed,

    /// The credential's signature did not verify.
    #[error("Invalid credential signature")]
    InvalidSignature,

    /// The credential is past its expiry.
    #[error("Credential has expired")]
    Expired,
}

/// Turns a bearer string into session claims.
pub trait CredentialVerifier: Send + Sync {
    /// Verify `bearer` and return its claims.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] when the credential is malformed, badly signed
    /// or expired.
    fn verify(&self, bearer: &str) -> Result<SessionClaims, CredentialError>;
}
