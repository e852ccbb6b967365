use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use credo_auth::{
    AccessCredential, AccessCredentialId, CredentialStatus, PrincipalId, RefreshCredential,
    RefreshCredentialId, SessionStats,
};

use super::{CredentialStore, PurgeReport, RevokedCount};
use crate::StoreError;

#[derive(Debug, Default)]
struct Tables {
    access: HashMap<AccessCredentialId, AccessCredential>,
    access_by_value: HashMap<String, AccessCredentialId>,
    refresh: HashMap<RefreshCredentialId, RefreshCredential>,
    refresh_by_value: HashMap<String, RefreshCredentialId>,
}

impl Tables {
    fn insert_access(&mut self, access: &AccessCredential) -> Result<(), StoreError> {
        if self.access_by_value.contains_key(&access.value) || self.access.contains_key(&access.id) {
            return Err(StoreError::Conflict("access credential already exists".to_string()));
        }
        self.access_by_value.insert(access.value.clone(), access.id);
        self.access.insert(access.id, access.clone());
        Ok(())
    }
}

/// In-memory credential store.
///
/// Intended for tests/dev. One lock guards both tables, so every trait method
/// is trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    tables: RwLock<Tables>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows (access, refresh). Test helper.
    pub fn row_counts(&self) -> Result<(usize, usize), StoreError> {
        let tables = self.read()?;
        Ok((tables.access.len(), tables.refresh.len()))
    }

    pub fn find_access(&self, id: AccessCredentialId) -> Result<Option<AccessCredential>, StoreError> {
        Ok(self.read()?.access.get(&id).cloned())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

fn most_recently_used_first(a: &RefreshCredential, b: &RefreshCredential) -> Ordering {
    match (a.last_used_at, b.last_used_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.issued_at.cmp(&a.issued_at),
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn insert_pair(
        &self,
        access: &AccessCredential,
        refresh: &RefreshCredential,
    ) -> Result<(), StoreError> {
        let mut tables = self.write()?;

        if tables.refresh_by_value.contains_key(&refresh.value)
            || tables.refresh.contains_key(&refresh.id)
        {
            return Err(StoreError::Conflict("refresh credential already exists".to_string()));
        }
        // Checked before either insert so a conflict leaves nothing behind.
        if tables.access_by_value.contains_key(&access.value) {
            return Err(StoreError::Conflict("access credential already exists".to_string()));
        }

        tables.insert_access(access)?;
        tables.refresh_by_value.insert(refresh.value.clone(), refresh.id);
        tables.refresh.insert(refresh.id, refresh.clone());
        Ok(())
    }

    async fn find_access_by_value(
        &self,
        value: &str,
    ) -> Result<Option<AccessCredential>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .access_by_value
            .get(value)
            .and_then(|id| tables.access.get(id))
            .cloned())
    }

    async fn find_refresh_by_value(
        &self,
        value: &str,
    ) -> Result<Option<RefreshCredential>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .refresh_by_value
            .get(value)
            .and_then(|id| tables.refresh.get(id))
            .cloned())
    }

    async fn find_refresh(
        &self,
        id: RefreshCredentialId,
    ) -> Result<Option<RefreshCredential>, StoreError> {
        Ok(self.read()?.refresh.get(&id).cloned())
    }

    async fn record_rotation(
        &self,
        refresh_id: RefreshCredentialId,
        access: &AccessCredential,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshCredential>, StoreError> {
        let mut tables = self.write()?;

        let usable = tables
            .refresh
            .get(&refresh_id)
            .is_some_and(|refresh| refresh.is_usable(now));
        if !usable {
            return Ok(None);
        }

        tables.insert_access(access)?;
        let Some(refresh) = tables.refresh.get_mut(&refresh_id) else {
            return Ok(None);
        };
        refresh.mark_used(now);
        Ok(Some(refresh.clone()))
    }

    async fn revoke_access(&self, id: AccessCredentialId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        Ok(tables.access.get_mut(&id).is_some_and(|access| access.revoke()))
    }

    async fn revoke_refresh(&self, id: RefreshCredentialId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        Ok(tables.refresh.get_mut(&id).is_some_and(|refresh| refresh.revoke()))
    }

    async fn revoke_all_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<RevokedCount, StoreError> {
        let mut tables = self.write()?;
        let mut count = RevokedCount::default();

        for access in tables
            .access
            .values_mut()
            .filter(|access| access.principal_id == principal_id)
        {
            if access.revoke() {
                count.access += 1;
            }
        }
        for refresh in tables
            .refresh
            .values_mut()
            .filter(|refresh| refresh.principal_id == principal_id)
        {
            if refresh.revoke() {
                count.refresh += 1;
            }
        }

        Ok(count)
    }

    async fn list_refresh_for_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Vec<RefreshCredential>, StoreError> {
        let tables = self.read()?;
        let mut out: Vec<RefreshCredential> = tables
            .refresh
            .values()
            .filter(|refresh| refresh.principal_id == principal_id)
            .cloned()
            .collect();
        out.sort_by(most_recently_used_first);
        Ok(out)
    }

    async fn session_stats(
        &self,
        principal_id: PrincipalId,
        now: DateTime<Utc>,
        recently_used_since: DateTime<Utc>,
    ) -> Result<SessionStats, StoreError> {
        let tables = self.read()?;
        let mut stats = SessionStats::default();

        for access in tables.access.values() {
            if access.principal_id == principal_id && access.is_usable(now) {
                stats.active_access += 1;
            }
        }
        for refresh in tables
            .refresh
            .values()
            .filter(|refresh| refresh.principal_id == principal_id)
        {
            if refresh.is_usable(now) {
                stats.valid_refresh += 1;
            }
            if !refresh.revoked
                && refresh.last_used_at.is_some_and(|used| used > recently_used_since)
            {
                stats.recently_used_refresh += 1;
            }
        }

        Ok(stats)
    }

    async fn purge_terminal(&self, cutoff: DateTime<Utc>) -> Result<PurgeReport, StoreError> {
        let mut tables = self.write()?;
        let Tables {
            access,
            access_by_value,
            refresh,
            refresh_by_value,
        } = &mut *tables;

        let access_before = access.len();
        access.retain(|_, cred| cred.status == CredentialStatus::Active || cred.expires_at >= cutoff);
        access_by_value.retain(|_, id| access.contains_key(id));

        let refresh_before = refresh.len();
        refresh.retain(|_, cred| {
            let past_expiry = cred.expires_at < cutoff;
            let old_revoked = cred.revoked && cred.issued_at < cutoff;
            !(past_expiry || old_revoked)
        });
        refresh_by_value.retain(|_, id| refresh.contains_key(id));

        Ok(PurgeReport {
            access: (access_before - access.len()) as u64,
            refresh: (refresh_before - refresh.len()) as u64,
        })
    }

    async fn expire_lapsed_access(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.write()?;
        let mut flipped = 0;
        for access in tables.access.values_mut() {
            if access.status == CredentialStatus::Active
                && access.is_expired(now)
                && access.mark_expired()
            {
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}
