//! Scripted credential verification.

use std::collections::HashMap;
use strata_core::session::{CredentialError, CredentialVerifier, SessionClaims};

/// [`CredentialVerifier`] that maps known tokens to fixed claims.
///
/// Unknown tokens fail with `InvalidSignature`; tokens registered through
/// [`with_failure`](Self::with_failure) fail with the given error.
#[derive(Clone, Debug, Default)]
pub struct MockCredentialVerifier {
    tokens: HashMap<String, Result<SessionClaims, CredentialError>>,
}

impl MockCredentialVerifier {
    /// A verifier that knows no tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` and return `claims` for it.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, claims: SessionClaims) -> Self {
        self.tokens.insert(token.into(), Ok(claims));
        self
    }

    /// Refuse `token` with `error`.
    #[must_use]
    pub fn with_failure(mut self, token: impl Into<String>, error: CredentialError) -> Self {
        self.tokens.insert(token.into(), Err(error));
        self
    }
}

impl CredentialVerifier for MockCredentialVerifier {
    fn verify(&self, bearer: &str) -> Result<SessionClaims, CredentialError> {
        self.tokens
            .get(bearer)
            .cloned()
            .unwrap_or(Err(CredentialError::InvalidSignature))
    }
}
