//! Durable record of every issued access and refresh credential.
//!
//! The store is the only shared mutable resource of the credential lifecycle.
//! Every method is a single linearizable step: implementations must never
//! expose a half-written pair, lose a usage-count increment, or move a status
//! out of a terminal state.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use credo_auth::{
    AccessCredential, AccessCredentialId, PrincipalId, RefreshCredential, RefreshCredentialId,
    SessionStats,
};

use crate::StoreError;

pub use in_memory::InMemoryCredentialStore;
pub use postgres::PostgresCredentialStore;

/// Number of credentials moved to a terminal state by one revocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RevokedCount {
    pub access: u64,
    pub refresh: u64,
}

impl RevokedCount {
    pub fn total(&self) -> u64 {
        self.access + self.refresh
    }
}

impl core::ops::AddAssign for RevokedCount {
    fn add_assign(&mut self, rhs: Self) {
        self.access += rhs.access;
        self.refresh += rhs.refresh;
    }
}

/// Rows deleted by one retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub access: u64,
    pub refresh: u64,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a freshly issued pair. Both rows or neither.
    async fn insert_pair(
        &self,
        access: &AccessCredential,
        refresh: &RefreshCredential,
    ) -> Result<(), StoreError>;

    async fn find_access_by_value(&self, value: &str)
    -> Result<Option<AccessCredential>, StoreError>;

    async fn find_refresh_by_value(
        &self,
        value: &str,
    ) -> Result<Option<RefreshCredential>, StoreError>;

    async fn find_refresh(
        &self,
        id: RefreshCredentialId,
    ) -> Result<Option<RefreshCredential>, StoreError>;

    /// Record one rotation of `refresh_id`.
    ///
    /// In one atomic step: if the refresh credential exists, is not revoked and
    /// has not expired at `now`, insert `access`, set `last_used_at = now` and
    /// increment `usage_count`, then return the updated refresh record.
    /// Otherwise change nothing and return `None`.
    async fn record_rotation(
        &self,
        refresh_id: RefreshCredentialId,
        access: &AccessCredential,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshCredential>, StoreError>;

    /// Flip an access credential to `Revoked`. `false` if missing or already terminal.
    async fn revoke_access(&self, id: AccessCredentialId) -> Result<bool, StoreError>;

    /// Set the revoked flag. `false` if missing or already revoked.
    async fn revoke_refresh(&self, id: RefreshCredentialId) -> Result<bool, StoreError>;

    /// Revoke every `Active` access and every non-revoked refresh credential of a principal.
    async fn revoke_all_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<RevokedCount, StoreError>;

    /// Refresh credentials of a principal, most recently used first, never-used last.
    async fn list_refresh_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Vec<RefreshCredential>, StoreError>;

    /// Counts for one principal. Only non-revoked refresh credentials count as
    /// recently used.
    async fn session_stats(
        &self,
        principal_id: PrincipalId,
        now: DateTime<Utc>,
        recently_used_since: DateTime<Utc>,
    ) -> Result<SessionStats, StoreError>;

    /// Delete terminal rows older than `cutoff`.
    ///
    /// Access rows: status is not `Active` and `expires_at < cutoff`.
    /// Refresh rows: `expires_at < cutoff`, or revoked and `issued_at < cutoff`.
    async fn purge_terminal(&self, cutoff: DateTime<Utc>) -> Result<PurgeReport, StoreError>;

    /// Flip `Active` access credentials whose expiry has passed to `Expired`.
    async fn expire_lapsed_access(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[async_trait]
impl<S> CredentialStore for Arc<S>
where
    S: CredentialStore + ?Sized,
{
    async fn insert_pair(
        &self,
        access: &AccessCredential,
        refresh: &RefreshCredential,
    ) -> Result<(), StoreError> {
        (**self).insert_pair(access, refresh).await
    }

    async fn find_access_by_value(
        &self,
        value: &str,
    ) -> Result<Option<AccessCredential>, StoreError> {
        (**self).find_access_by_value(value).await
    }

    async fn find_refresh_by_value(
        &self,
        value: &str,
    ) -> Result<Option<RefreshCredential>, StoreError> {
        (**self).find_refresh_by_value(value).await
    }

    async fn find_refresh(
        &self,
        id: RefreshCredentialId,
    ) -> Result<Option<RefreshCredential>, StoreError> {
        (**self).find_refresh(id).await
    }

    async fn record_rotation(
        &self,
        refresh_id: RefreshCredentialId,
        access: &AccessCredential,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshCredential>, StoreError> {
        (**self).record_rotation(refresh_id, access, now).await
    }

    async fn revoke_access(&self, id: AccessCredentialId) -> Result<bool, StoreError> {
        (**self).revoke_access(id).await
    }

    async fn revoke_refresh(&self, id: RefreshCredentialId) -> Result<bool, StoreError> {
        (**self).revoke_refresh(id).await
    }

    async fn revoke_all_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<RevokedCount, StoreError> {
        (**self).revoke_all_for_principal(principal_id).await
    }

    async fn list_refresh_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Vec<RefreshCredential>, StoreError> {
        (**self).list_refresh_for_principal(principal_id).await
    }

    async fn session_stats(
        &self,
        principal_id: PrincipalId,
        now: DateTime<Utc>,
        recently_used_since: DateTime<Utc>,
    ) -> Result<SessionStats, StoreError> {
        (**self)
            .session_stats(principal_id, now, recently_used_since)
            .await
    }

    async fn purge_terminal(&self, cutoff: DateTime<Utc>) -> Result<PurgeReport, StoreError> {
        (**self).purge_terminal(cutoff).await
    }

    async fn expire_lapsed_access(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        (**self).expire_lapsed_access(now).await
    }
}
