use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use credo_auth::{
    AccessCredentialId, AccessTokenCodec, CredentialStatus, PrincipalId, Role,
    TokenValidationError, ValidationFailure, fingerprint, validate_claims,
};

use crate::credential_store::CredentialStore;
use crate::principal_store::PrincipalStore;

/// Outcome of a successful validation.
///
/// `role` is the principal's current role from the identity store, not the
/// role embedded at issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidatedAccess {
    pub principal_id: PrincipalId,
    pub role: Role,
    pub credential_id: AccessCredentialId,
    pub expires_at: DateTime<Utc>,
}

/// Turns a presented access value into a principal, or a specific failure.
///
/// Credential status is read from the store on every call; nothing is cached.
#[derive(Clone)]
pub struct CredentialValidator {
    credentials: Arc<dyn CredentialStore>,
    principals: Arc<dyn PrincipalStore>,
    codec: Arc<dyn AccessTokenCodec>,
}

impl CredentialValidator {
    pub(crate) fn new(
        credentials: Arc<dyn CredentialStore>,
        principals: Arc<dyn PrincipalStore>,
        codec: Arc<dyn AccessTokenCodec>,
    ) -> Self {
        Self {
            credentials,
            principals,
            codec,
        }
    }

    pub async fn validate(
        &self,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<ValidatedAccess, ValidationFailure> {
        let result = self.check(value, now).await;
        if let Err(failure) = &result {
            debug!(credential = fingerprint(value), code = failure.code(), "access credential rejected");
        }
        result
    }

    async fn check(
        &self,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<ValidatedAccess, ValidationFailure> {
        if value.is_empty() {
            return Err(ValidationFailure::MalformedCredential);
        }

        // 1) Signature and embedded window; no store access on failure.
        let claims = self
            .codec
            .decode(value)
            .map_err(|_| ValidationFailure::MalformedCredential)?;
        validate_claims(&claims, now).map_err(|e| match e {
            TokenValidationError::Expired => ValidationFailure::ExpiredCredential,
            TokenValidationError::NotYetValid | TokenValidationError::InvalidTimeWindow => {
                ValidationFailure::MalformedCredential
            }
        })?;

        // 2) Store record.
        let record = self
            .credentials
            .find_access_by_value(value)
            .await
            .map_err(|e| ValidationFailure::Storage(e.into()))?
            .ok_or(ValidationFailure::UnknownCredential)?;

        if record.id != claims.jti || record.principal_id != claims.sub {
            return Err(ValidationFailure::UnknownCredential);
        }
        match record.status {
            CredentialStatus::Revoked => return Err(ValidationFailure::RevokedCredential),
            CredentialStatus::Expired => return Err(ValidationFailure::ExpiredCredential),
            CredentialStatus::Active if record.is_expired(now) => {
                return Err(ValidationFailure::ExpiredCredential);
            }
            CredentialStatus::Active => {}
        }

        // 3) Owner must still exist and be active.
        let principal = self
            .principals
            .find_by_id(record.principal_id)
            .await
            .map_err(|e| ValidationFailure::Storage(e.into()))?
            .filter(|principal| principal.active)
            .ok_or(ValidationFailure::PrincipalInactive)?;

        Ok(ValidatedAccess {
            principal_id: principal.id,
            role: principal.role,
            credential_id: record.id,
            expires_at: record.expires_at,
        })
    }
}
