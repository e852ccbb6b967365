use axum::http::{HeaderMap, header};

use credo_auth::{AccessCredentialId, Origin, PrincipalId, Role};
use credo_infra::ValidatedAccess;

/// Principal context for a request (validated identity + current role).
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrincipalContext {
    principal_id: PrincipalId,
    role: Role,
    credential_id: AccessCredentialId,
}

impl PrincipalContext {
    pub fn new(principal_id: PrincipalId, role: Role, credential_id: AccessCredentialId) -> Self {
        Self {
            principal_id,
            role,
            credential_id,
        }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn credential_id(&self) -> AccessCredentialId {
        self.credential_id
    }
}

impl From<&ValidatedAccess> for PrincipalContext {
    fn from(validated: &ValidatedAccess) -> Self {
        Self::new(
            validated.principal_id,
            validated.role,
            validated.credential_id,
        )
    }
}

/// The raw bearer value the request was authenticated with.
///
/// Logout needs the value itself, not just the identity behind it.
#[derive(Clone)]
pub struct PresentedCredential(String);

impl PresentedCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PresentedCredential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("PresentedCredential")
            .field(&credo_auth::fingerprint(&self.0))
            .finish()
    }
}

/// Client origin from proxy headers.
///
/// IP: first hop of `X-Forwarded-For`, else `X-Real-IP`.
pub fn origin_from_headers(headers: &HeaderMap) -> Origin {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let ip = header_str("x-forwarded-for")
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .or_else(|| header_str("x-real-ip"))
        .map(str::to_string);

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Origin::new(ip, user_agent)
}
