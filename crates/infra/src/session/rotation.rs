use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use credo_auth::{Origin, PrincipalId, RefreshCredential, RefreshFailure, fingerprint};

use super::issuer::AccessMinter;
use crate::credential_store::CredentialStore;
use crate::principal_store::PrincipalStore;

/// A freshly minted access credential from one rotation.
#[derive(Clone, PartialEq, Eq)]
pub struct RotatedAccess {
    pub principal_id: PrincipalId,
    pub access_value: String,
    pub access_expires_at: DateTime<Utc>,
    /// Usage count of the refresh credential after this rotation.
    pub usage_count: u64,
    /// The usage count crossed the overuse threshold. Informational only.
    pub overused: bool,
}

impl core::fmt::Debug for RotatedAccess {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RotatedAccess")
            .field("principal_id", &self.principal_id)
            .field("access", &fingerprint(&self.access_value))
            .field("access_expires_at", &self.access_expires_at)
            .field("usage_count", &self.usage_count)
            .field("overused", &self.overused)
            .finish()
    }
}

/// Exchanges a refresh credential for a new access credential.
///
/// Refresh credentials are reusable until they expire or are revoked.
#[derive(Clone)]
pub struct RotationEngine {
    credentials: Arc<dyn CredentialStore>,
    principals: Arc<dyn PrincipalStore>,
    minter: AccessMinter,
    overuse_threshold: u64,
}

impl RotationEngine {
    pub(crate) fn new(
        credentials: Arc<dyn CredentialStore>,
        principals: Arc<dyn PrincipalStore>,
        minter: AccessMinter,
        overuse_threshold: u64,
    ) -> Self {
        Self {
            credentials,
            principals,
            minter,
            overuse_threshold,
        }
    }

    #[instrument(skip_all, fields(refresh = fingerprint(value)))]
    pub async fn rotate(
        &self,
        value: &str,
        origin: &Origin,
        now: DateTime<Utc>,
    ) -> Result<RotatedAccess, RefreshFailure> {
        let result = self.try_rotate(value, origin, now).await;
        match &result {
            Ok(rotated) => {
                info!(
                    principal_id = %rotated.principal_id,
                    usage_count = rotated.usage_count,
                    "refresh credential rotated"
                );
                if rotated.overused {
                    warn!(
                        principal_id = %rotated.principal_id,
                        usage_count = rotated.usage_count,
                        threshold = self.overuse_threshold,
                        "refresh credential usage above threshold"
                    );
                }
            }
            Err(failure) => warn!(code = failure.code(), ip = ?origin.ip, "refresh rejected"),
        }
        result
    }

    async fn try_rotate(
        &self,
        value: &str,
        origin: &Origin,
        now: DateTime<Utc>,
    ) -> Result<RotatedAccess, RefreshFailure> {
        if value.is_empty() {
            return Err(RefreshFailure::InvalidRefresh);
        }

        let refresh = self
            .credentials
            .find_refresh_by_value(value)
            .await
            .map_err(|e| RefreshFailure::Storage(e.into()))?
            .ok_or(RefreshFailure::InvalidRefresh)?;
        if let Some(reason) = terminal_reason(&refresh, now) {
            return Err(reason);
        }

        let principal = self
            .principals
            .find_by_id(refresh.principal_id)
            .await
            .map_err(|e| RefreshFailure::Storage(e.into()))?
            .filter(|principal| principal.active);
        let Some(principal) = principal else {
            // An inactive owner ends the refresh credential's life.
            self.credentials
                .revoke_refresh(refresh.id)
                .await
                .map_err(|e| RefreshFailure::Storage(e.into()))?;
            info!(
                principal_id = %refresh.principal_id,
                reason = "principal_inactive",
                "refresh credential revoked"
            );
            return Err(RefreshFailure::PrincipalInactive);
        };

        let access = self.minter.mint(&principal, refresh.id, origin, now)?;

        // The store re-checks usability under its own lock/transaction, so a
        // concurrent revoke either lands before (rejected) or after (allowed).
        let updated = self
            .credentials
            .record_rotation(refresh.id, &access, now)
            .await
            .map_err(|e| RefreshFailure::Storage(e.into()))?;

        let Some(updated) = updated else {
            let current = self
                .credentials
                .find_refresh(refresh.id)
                .await
                .map_err(|e| RefreshFailure::Storage(e.into()))?
                .ok_or(RefreshFailure::InvalidRefresh)?;
            return Err(terminal_reason(&current, now).unwrap_or(RefreshFailure::InvalidRefresh));
        };

        Ok(RotatedAccess {
            principal_id: principal.id,
            access_value: access.value,
            access_expires_at: access.expires_at,
            usage_count: updated.usage_count,
            overused: updated.is_overused(self.overuse_threshold),
        })
    }
}

fn terminal_reason(refresh: &RefreshCredential, now: DateTime<Utc>) -> Option<RefreshFailure> {
    if refresh.revoked {
        Some(RefreshFailure::RevokedRefresh)
    } else if refresh.is_expired(now) {
        Some(RefreshFailure::ExpiredRefresh)
    } else {
        None
    }
}
