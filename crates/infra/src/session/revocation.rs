use std::sync::Arc;

use tracing::{info, instrument};

use credo_auth::{PrincipalId, StorageUnavailable, fingerprint};

use crate::credential_store::{CredentialStore, RevokedCount};

/// Why credentials are being revoked. Recorded in the audit log only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationReason {
    Logout,
    LogoutEverywhere,
    AdminAction,
}

impl RevocationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevocationReason::Logout => "logout",
            RevocationReason::LogoutEverywhere => "logout_everywhere",
            RevocationReason::AdminAction => "admin_action",
        }
    }
}

/// Moves credentials to their terminal revoked state.
///
/// Revoking something already terminal (or unknown) is not an error; it just
/// contributes zero to the count.
#[derive(Clone)]
pub struct RevocationManager {
    credentials: Arc<dyn CredentialStore>,
}

impl RevocationManager {
    pub(crate) fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }

    /// Revoke one access credential and, when presented, its refresh credential.
    ///
    /// The refresh credential is only touched when it belongs to the same
    /// principal as the access credential (or the access value is unknown).
    #[instrument(skip_all, fields(access = fingerprint(access_value), reason = reason.as_str()))]
    pub async fn revoke_session(
        &self,
        access_value: &str,
        refresh_value: Option<&str>,
        reason: RevocationReason,
    ) -> Result<RevokedCount, StorageUnavailable> {
        let mut count = RevokedCount::default();

        let access = self.credentials.find_access_by_value(access_value).await?;
        if let Some(access) = &access {
            if self.credentials.revoke_access(access.id).await? {
                count.access += 1;
            }
        }

        if let Some(refresh_value) = refresh_value {
            let refresh = self.credentials.find_refresh_by_value(refresh_value).await?;
            let owner_matches = |owner: PrincipalId| {
                access
                    .as_ref()
                    .is_none_or(|access| access.principal_id == owner)
            };
            if let Some(refresh) = refresh.filter(|r| owner_matches(r.principal_id)) {
                if self.credentials.revoke_refresh(refresh.id).await? {
                    count.refresh += 1;
                }
            }
        }

        info!(
            principal_id = ?access.as_ref().map(|a| a.principal_id.to_string()),
            access = count.access,
            refresh = count.refresh,
            "session revoked"
        );
        Ok(count)
    }

    /// Revoke every live credential of a principal (all devices).
    #[instrument(skip_all, fields(principal_id = %principal_id, reason = reason.as_str()))]
    pub async fn revoke_all(
        &self,
        principal_id: PrincipalId,
        reason: RevocationReason,
    ) -> Result<RevokedCount, StorageUnavailable> {
        let count = self
            .credentials
            .revoke_all_for_principal(principal_id)
            .await?;
        info!(
            access = count.access,
            refresh = count.refresh,
            "all sessions revoked"
        );
        Ok(count)
    }
}
