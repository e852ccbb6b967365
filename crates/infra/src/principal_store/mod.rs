//! Read access to the identity store.
//!
//! Principals are owned elsewhere; the credential lifecycle only looks them up.
//! The in-memory adapter also exposes a few mutators so tests and dev seeding
//! can flip roles and the active flag.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use credo_auth::{Principal, PrincipalAccount, PrincipalId};

use crate::StoreError;

pub use in_memory::InMemoryPrincipalStore;
pub use postgres::PostgresPrincipalStore;

#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError>;

    /// Match `login` against usernames first, then emails.
    async fn find_by_login(&self, login: &str) -> Result<Option<PrincipalAccount>, StoreError>;

    /// A missing principal is not active.
    async fn is_active(&self, id: PrincipalId) -> Result<bool, StoreError> {
        Ok(self
            .find_by_id(id)
            .await?
            .is_some_and(|principal| principal.active))
    }
}

#[async_trait]
impl<S> PrincipalStore for Arc<S>
where
    S: PrincipalStore + ?Sized,
{
    async fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<PrincipalAccount>, StoreError> {
        (**self).find_by_login(login).await
    }

    async fn is_active(&self, id: PrincipalId) -> Result<bool, StoreError> {
        (**self).is_active(id).await
    }
}
