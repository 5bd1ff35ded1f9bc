//! Authorization gate.
//!
//! Sits in front of the write pipeline and decides whether the caller behind a
//! credential may submit a given event type. Verifying the credential itself is
//! delegated to a [`CredentialVerifier`]; the gate owns the expiry and capability
//! checks.

use crate::error::AuthError;
use crate::metrics;
use chrono::Duration;
use std::sync::Arc;
use strata_core::capability::Roles;
use strata_core::environment::Clock;
use strata_core::session::{Credential, CredentialError, CredentialVerifier, SessionClaims};

/// Permits or denies event submissions based on the caller's role.
#[derive(Clone)]
pub struct AuthorizationGate {
    roles: Arc<Roles>,
    verifier: Option<Arc<dyn CredentialVerifier>>,
    clock: Arc<dyn Clock>,
    session_validity: Duration,
    auth_off: bool,
}

impl std::fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGate")
            .field("roles", &self.roles)
            .field("has_verifier", &self.verifier.is_some())
            .field("session_validity", &self.session_validity)
            .field("auth_off", &self.auth_off)
            .finish_non_exhaustive()
    }
}

impl AuthorizationGate {
    /// Create a gate that checks every submission.
    #[must_use]
    pub fn new(
        roles: Arc<Roles>,
        verifier: Arc<dyn CredentialVerifier>,
        clock: Arc<dyn Clock>,
        session_validity: Duration,
    ) -> Self {
        Self {
            roles,
            verifier: Some(verifier),
            clock,
            session_validity,
            auth_off: false,
        }
    }

    /// Create a gate that lets everything through.
    #[must_use]
    pub fn disabled(clock: Arc<dyn Clock>) -> Self {
        Self {
            roles: Arc::new(Roles::new()),
            verifier: None,
            clock,
            session_validity: Duration::zero(),
            auth_off: true,
        }
    }

    /// Returns `true` if the gate is bypassed.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.auth_off
    }

    /// Decide whether the holder of `credential` may submit `event_type`.
    ///
    /// Returns the verified claims, or `None` when the gate is disabled.
    ///
    /// # Errors
    ///
    /// - `Credential`: nothing was presented, or the verifier refused it
    /// - `SessionExpired`: the claims are past their expiry or older than the
    ///   configured session validity
    /// - `InvalidRole`: the role is unknown or may not submit `event_type`
    #[tracing::instrument(skip(self, credential))]
    pub fn authorize(
        &self,
        event_type: &str,
        credential: &Credential,
    ) -> Result<Option<SessionClaims>, AuthError> {
        let Some(verifier) = self.verifier.as_ref().filter(|_| !self.auth_off) else {
            return Ok(None);
        };

        match self.check(verifier.as_ref(), event_type, credential) {
            Ok(claims) => {
                tracing::debug!(role = %claims.role, subject = %claims.subject, "Submission authorized");
                Ok(Some(claims))
            },
            Err(error) => {
                metrics::record_denial();
                tracing::warn!(error = %error, "Submission denied");
                Err(error)
            },
        }
    }

    fn check(
        &self,
        verifier: &dyn CredentialVerifier,
        event_type: &str,
        credential: &Credential,
    ) -> Result<SessionClaims, AuthError> {
        let bearer = credential.bearer().ok_or(CredentialError::Missing)?;
        let claims = verifier.verify(bearer)?;

        let now = self.clock.now();
        // A validity that reaches past the representable range never lapses.
        let outlived = claims
            .issued_at
            .checked_add_signed(self.session_validity)
            .is_some_and(|deadline| deadline < now);
        if now >= claims.expires_at || outlived {
            return Err(AuthError::SessionExpired);
        }

        if !self.roles.permits(&claims.role, event_type) {
            return Err(AuthError::InvalidRole {
                role: claims.role,
                event_type: event_type.to_string(),
            });
        }

        Ok(claims)
    }
}
