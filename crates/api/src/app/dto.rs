use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credo_auth::{Capability, PrincipalId, Role};
use credo_infra::{IssuedSession, RevokedCount, RotatedAccess, ValidatedAccess};

const TOKEN_TYPE: &str = "Bearer";

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    #[serde(alias = "login")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub access_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub required: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub principal_id: PrincipalId,
    pub role: Role,
}

impl From<IssuedSession> for LoginResponse {
    fn from(session: IssuedSession) -> Self {
        Self {
            access_token: session.access_value,
            refresh_token: session.refresh_value,
            token_type: TOKEN_TYPE,
            access_expires_at: session.access_expires_at,
            refresh_expires_at: session.refresh_expires_at,
            principal_id: session.principal_id,
            role: session.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub access_expires_at: DateTime<Utc>,
}

impl From<RotatedAccess> for RefreshResponse {
    fn from(rotated: RotatedAccess) -> Self {
        Self {
            access_token: rotated.access_value,
            token_type: TOKEN_TYPE,
            access_expires_at: rotated.access_expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub principal_id: PrincipalId,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl From<ValidatedAccess> for ValidateResponse {
    fn from(validated: ValidatedAccess) -> Self {
        Self {
            valid: true,
            principal_id: validated.principal_id,
            role: validated.role,
            expires_at: validated.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RevokedResponse {
    pub revoked_access: u64,
    pub revoked_refresh: u64,
    pub total: u64,
}

impl From<RevokedCount> for RevokedResponse {
    fn from(count: RevokedCount) -> Self {
        Self {
            revoked_access: count.access,
            revoked_refresh: count.refresh,
            total: count.total(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub principal_id: PrincipalId,
    pub role: Role,
    pub capabilities: Vec<Capability>,
}
