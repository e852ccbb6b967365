//! Session services: issuance, validation, rotation, revocation and inspection.
//!
//! Every operation takes `now` explicitly. Callers at the edge pass
//! `Utc::now()`; tests pass whatever instant they need.

mod issuer;
mod revocation;
mod rotation;
mod stats;
mod validator;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use credo_auth::{
    AccessTokenCodec, AuthFailure, CapabilityDenied, Origin, PasswordVerifier, PrincipalId,
    RefreshFailure, Role, SessionStats, SessionSummary, StorageUnavailable, ValidationFailure,
};

use crate::CredentialConfig;
use crate::credential_store::{CredentialStore, RevokedCount};
use crate::principal_store::PrincipalStore;

pub use issuer::{CredentialIssuer, IssuedSession};
pub use revocation::{RevocationManager, RevocationReason};
pub use rotation::{RotatedAccess, RotationEngine};
pub use stats::SessionInspector;
pub use validator::{CredentialValidator, ValidatedAccess};

/// Façade over the session components, wired to one set of stores.
#[derive(Clone)]
pub struct SessionManager {
    issuer: CredentialIssuer,
    validator: CredentialValidator,
    rotation: RotationEngine,
    revocation: RevocationManager,
    inspector: SessionInspector,
    credentials: Arc<dyn CredentialStore>,
    config: Arc<CredentialConfig>,
}

impl SessionManager {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        principals: Arc<dyn PrincipalStore>,
        passwords: Arc<dyn PasswordVerifier>,
        codec: Arc<dyn AccessTokenCodec>,
        config: CredentialConfig,
    ) -> Self {
        let minter = issuer::AccessMinter::new(codec.clone(), config.access_ttl);

        Self {
            issuer: CredentialIssuer::new(
                credentials.clone(),
                principals.clone(),
                passwords,
                minter.clone(),
                config.refresh_ttl,
            ),
            validator: CredentialValidator::new(credentials.clone(), principals.clone(), codec),
            rotation: RotationEngine::new(
                credentials.clone(),
                principals,
                minter,
                config.overuse_threshold,
            ),
            revocation: RevocationManager::new(credentials.clone()),
            inspector: SessionInspector::new(credentials.clone(), config.recent_usage_window),
            credentials,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &CredentialConfig {
        &self.config
    }

    pub fn credential_store(&self) -> Arc<dyn CredentialStore> {
        self.credentials.clone()
    }

    pub fn issuer(&self) -> &CredentialIssuer {
        &self.issuer
    }

    pub async fn login(
        &self,
        login: &str,
        password: &str,
        origin: &Origin,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, AuthFailure> {
        self.issuer.login(login, password, origin, now).await
    }

    pub async fn validate_access(
        &self,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<ValidatedAccess, ValidationFailure> {
        self.validator.validate(value, now).await
    }

    pub async fn refresh(
        &self,
        refresh_value: &str,
        origin: &Origin,
        now: DateTime<Utc>,
    ) -> Result<RotatedAccess, RefreshFailure> {
        self.rotation.rotate(refresh_value, origin, now).await
    }

    pub async fn revoke_session(
        &self,
        access_value: &str,
        refresh_value: Option<&str>,
    ) -> Result<RevokedCount, StorageUnavailable> {
        self.revocation
            .revoke_session(access_value, refresh_value, RevocationReason::Logout)
            .await
    }

    pub async fn revoke_all_sessions(
        &self,
        principal_id: PrincipalId,
        reason: RevocationReason,
    ) -> Result<RevokedCount, StorageUnavailable> {
        self.revocation.revoke_all(principal_id, reason).await
    }

    pub fn authorize(&self, role: Role, required: Role) -> Result<(), CapabilityDenied> {
        credo_auth::authorize(role, required)
    }

    pub async fn session_stats(
        &self,
        principal_id: PrincipalId,
        now: DateTime<Utc>,
    ) -> Result<SessionStats, StorageUnavailable> {
        self.inspector.stats(principal_id, now).await
    }

    pub async fn list_sessions(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Vec<SessionSummary>, StorageUnavailable> {
        self.inspector.list(principal_id).await
    }
}
