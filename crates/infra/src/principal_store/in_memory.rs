use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use credo_auth::{Principal, PrincipalAccount, PrincipalId, Role};

use super::PrincipalStore;
use crate::StoreError;

/// In-memory identity store (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryPrincipalStore {
    accounts: RwLock<HashMap<PrincipalId, PrincipalAccount>>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account. Usernames and emails must be unique.
    pub fn insert(&self, account: PrincipalAccount) -> Result<(), StoreError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let clash = accounts.values().any(|existing| {
            existing.username == account.username
                || (account.email.is_some() && existing.email == account.email)
        });
        if clash {
            return Err(StoreError::Conflict(format!(
                "login '{}' already taken",
                account.username
            )));
        }

        accounts.insert(account.principal.id, account);
        Ok(())
    }

    /// Returns `false` when the principal does not exist.
    pub fn set_active(&self, id: PrincipalId, active: bool) -> Result<bool, StoreError> {
        self.update(id, |account| account.principal.active = active)
    }

    pub fn set_role(&self, id: PrincipalId, role: Role) -> Result<bool, StoreError> {
        self.update(id, |account| account.principal.role = role)
    }

    fn update(
        &self,
        id: PrincipalId,
        apply: impl FnOnce(&mut PrincipalAccount),
    ) -> Result<bool, StoreError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        match accounts.get_mut(&id) {
            Some(account) => {
                apply(account);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(accounts.get(&id).map(|account| account.principal))
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<PrincipalAccount>, StoreError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let by_username = accounts.values().find(|account| account.username == login);
        let found = by_username.or_else(|| {
            accounts
                .values()
                .find(|account| account.email.as_deref() == Some(login))
        });
        Ok(found.cloned())
    }
}
