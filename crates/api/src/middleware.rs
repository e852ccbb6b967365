use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use credo_infra::SessionManager;

use crate::app::errors;
use crate::context::{PresentedCredential, PrincipalContext};

#[derive(Clone)]
pub struct AuthState {
    pub sessions: SessionManager,
}

/// Validate the bearer credential and attach the caller's context.
///
/// Every check runs against the credential store, so a revoked credential is
/// rejected on the very next request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers()).map_err(|status| {
        errors::json_error(status, "missing_credential", "bearer credential required")
    })?;

    let validated = state
        .sessions
        .validate_access(token, Utc::now())
        .await
        .map_err(errors::validation_failure_to_response)?;

    let presented = PresentedCredential::new(token);
    req.extensions_mut()
        .insert(PrincipalContext::from(&validated));
    req.extensions_mut().insert(presented);

    Ok(next.run(req).await)
}

pub(crate) fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
