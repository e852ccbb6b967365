use serde::{Deserialize, Serialize};

pub use credo_core::PrincipalId;

use crate::Role;

/// Identity a credential is issued for.
///
/// Owned by the identity store; this crate only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
    pub active: bool,
}

impl Principal {
    pub fn new(id: PrincipalId, role: Role) -> Self {
        Self {
            id,
            role,
            active: true,
        }
    }
}

/// Login view of a principal: the identity plus what is needed to verify a password.
///
/// `Debug` is implemented by hand so the hash never reaches a log line.
#[derive(Clone, PartialEq, Eq)]
pub struct PrincipalAccount {
    pub principal: Principal,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
}

impl PrincipalAccount {
    /// `true` when `login` names this account by username or email.
    pub fn matches_login(&self, login: &str) -> bool {
        self.username == login || self.email.as_deref() == Some(login)
    }
}

impl core::fmt::Debug for PrincipalAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrincipalAccount")
            .field("principal", &self.principal)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}
