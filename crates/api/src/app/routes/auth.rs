//! Credential exchange endpoints.
//!
//! Login, refresh and validate are public: the credential in the body is the
//! authentication. Logout runs behind the auth middleware.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;

use credo_infra::RevocationReason;

use crate::app::dto::{
    LoginRequest, LoginResponse, LogoutRequest, RefreshRequest, RefreshResponse,
    RevokedResponse, ValidateRequest, ValidateResponse,
};
use crate::app::{errors, services::AppServices};
use crate::context::{PresentedCredential, PrincipalContext, origin_from_headers};

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> axum::response::Response {
    let origin = origin_from_headers(&headers);

    match services
        .sessions
        .login(&req.username, &req.password, &origin, Utc::now())
        .await
    {
        Ok(session) => (StatusCode::OK, Json(LoginResponse::from(session))).into_response(),
        Err(e) => errors::auth_failure_to_response(e),
    }
}

/// POST /auth/refresh
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Json(req): Json<RefreshRequest>,
) -> axum::response::Response {
    let origin = origin_from_headers(&headers);

    match services
        .sessions
        .refresh(&req.refresh_token, &origin, Utc::now())
        .await
    {
        Ok(rotated) => (StatusCode::OK, Json(RefreshResponse::from(rotated))).into_response(),
        Err(e) => errors::refresh_failure_to_response(e),
    }
}

/// POST /auth/validate
pub async fn validate(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<ValidateRequest>,
) -> axum::response::Response {
    match services
        .sessions
        .validate_access(&req.access_token, Utc::now())
        .await
    {
        Ok(validated) => (StatusCode::OK, Json(ValidateResponse::from(validated))).into_response(),
        Err(e) => errors::validation_failure_to_response(e),
    }
}

/// POST /auth/logout
///
/// Revokes the presented access credential; the refresh credential too when
/// the body names one. An empty body is allowed; a malformed one is rejected
/// before anything is revoked.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(presented): Extension<PresentedCredential>,
    body: Bytes,
) -> axum::response::Response {
    let req = match parse_logout_body(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };

    match services
        .sessions
        .revoke_session(presented.value(), req.refresh_token.as_deref())
        .await
    {
        Ok(count) => (StatusCode::OK, Json(RevokedResponse::from(count))).into_response(),
        Err(e) => errors::storage_to_response(e),
    }
}

fn parse_logout_body(body: &[u8]) -> Result<LogoutRequest, axum::response::Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(LogoutRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.to_string())
    })
}

/// POST /auth/logout-all
pub async fn logout_all(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services
        .sessions
        .revoke_all_sessions(principal.principal_id(), RevocationReason::LogoutEverywhere)
        .await
    {
        Ok(count) => (StatusCode::OK, Json(RevokedResponse::from(count))).into_response(),
        Err(e) => errors::storage_to_response(e),
    }
}
