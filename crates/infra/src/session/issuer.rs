use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

use credo_auth::{
    AccessClaims, AccessCredential, AccessCredentialId, AccessTokenCodec, AuthFailure,
    CredentialStatus, IssuanceError, Origin, PasswordVerifier, Principal, PrincipalId,
    RefreshCredential, RefreshCredentialId, Role, fingerprint, generate_refresh_value,
};

use crate::credential_store::CredentialStore;
use crate::principal_store::PrincipalStore;

/// Result of a successful login: one fresh access/refresh pair.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub principal_id: PrincipalId,
    pub role: Role,
    pub access_value: String,
    pub refresh_value: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl core::fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IssuedSession")
            .field("principal_id", &self.principal_id)
            .field("role", &self.role)
            .field("access", &fingerprint(&self.access_value))
            .field("refresh", &fingerprint(&self.refresh_value))
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish()
    }
}

/// Signs new access credentials. Shared by login and rotation.
#[derive(Clone)]
pub(crate) struct AccessMinter {
    codec: Arc<dyn AccessTokenCodec>,
    access_ttl: Duration,
}

impl AccessMinter {
    pub(crate) fn new(codec: Arc<dyn AccessTokenCodec>, access_ttl: Duration) -> Self {
        Self { codec, access_ttl }
    }

    pub(crate) fn mint(
        &self,
        principal: &Principal,
        refresh_id: RefreshCredentialId,
        origin: &Origin,
        now: DateTime<Utc>,
    ) -> Result<AccessCredential, IssuanceError> {
        let id = AccessCredentialId::new();
        let expires_at = now + self.access_ttl;
        let claims = AccessClaims::new(principal.id, principal.role, id, now, expires_at);
        let value = self
            .codec
            .encode(&claims)
            .map_err(|e| IssuanceError::Signing(e.to_string()))?;

        Ok(AccessCredential {
            id,
            value,
            principal_id: principal.id,
            refresh_id: Some(refresh_id),
            issued_at: now,
            expires_at,
            status: CredentialStatus::Active,
            origin: origin.clone(),
        })
    }
}

/// Verifies a login and persists a new credential pair.
#[derive(Clone)]
pub struct CredentialIssuer {
    credentials: Arc<dyn CredentialStore>,
    principals: Arc<dyn PrincipalStore>,
    passwords: Arc<dyn PasswordVerifier>,
    minter: AccessMinter,
    refresh_ttl: Duration,
}

impl CredentialIssuer {
    pub(crate) fn new(
        credentials: Arc<dyn CredentialStore>,
        principals: Arc<dyn PrincipalStore>,
        passwords: Arc<dyn PasswordVerifier>,
        minter: AccessMinter,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            credentials,
            principals,
            passwords,
            minter,
            refresh_ttl,
        }
    }

    /// Authenticate by username or email and issue a pair.
    ///
    /// The password is checked before the active flag, so an inactive account
    /// only reports `PrincipalInactive` to a caller who knows the password.
    #[instrument(skip_all, fields(login = %login))]
    pub async fn login(
        &self,
        login: &str,
        password: &str,
        origin: &Origin,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, AuthFailure> {
        let result = self.authenticate(login, password).await;
        let principal = match result {
            Ok(principal) => principal,
            Err(failure) => {
                warn!(code = failure.code(), ip = ?origin.ip, "login rejected");
                return Err(failure);
            }
        };

        let session = self.issue(&principal, origin, now).await?;
        info!(
            principal_id = %session.principal_id,
            role = %session.role,
            ip = ?origin.ip,
            "login succeeded"
        );
        Ok(session)
    }

    async fn authenticate(&self, login: &str, password: &str) -> Result<Principal, AuthFailure> {
        if login.trim().is_empty() || password.is_empty() {
            return Err(AuthFailure::InvalidCredentials);
        }

        let account = self
            .principals
            .find_by_login(login.trim())
            .await
            .map_err(|e| AuthFailure::Storage(e.into()))?;
        let Some(account) = account else {
            self.passwords.verify_missing(password);
            return Err(AuthFailure::InvalidCredentials);
        };

        if !self.passwords.verify(password, &account.password_hash) {
            return Err(AuthFailure::InvalidCredentials);
        }
        if !account.principal.active {
            return Err(AuthFailure::PrincipalInactive);
        }
        Ok(account.principal)
    }

    /// Issue a pair for an already authenticated principal.
    ///
    /// Both records are persisted in one store call; on failure neither exists.
    pub async fn issue(
        &self,
        principal: &Principal,
        origin: &Origin,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, IssuanceError> {
        let refresh = RefreshCredential {
            id: RefreshCredentialId::new(),
            value: generate_refresh_value(),
            principal_id: principal.id,
            issued_at: now,
            expires_at: now + self.refresh_ttl,
            revoked: false,
            last_used_at: None,
            usage_count: 0,
            origin: origin.clone(),
        };
        let access = self.minter.mint(principal, refresh.id, origin, now)?;

        self.credentials.insert_pair(&access, &refresh).await?;

        Ok(IssuedSession {
            principal_id: principal.id,
            role: principal.role,
            access_value: access.value,
            refresh_value: refresh.value,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
        })
    }
}
