use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use credo_auth::{Capability, Role};

use crate::app::dto::WhoAmIResponse;
use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> axum::response::Response {
    if let Err(denied) = authz::require_role(&principal, Role::Reader) {
        return denied;
    }

    Json(WhoAmIResponse {
        principal_id: principal.principal_id(),
        role: principal.role(),
        capabilities: principal.role().capabilities(),
    })
    .into_response()
}

/// GET /sessions/stats - counts for the caller's own sessions
pub async fn session_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(&principal, &Capability::ReadOwnSessions) {
        return denied;
    }

    match services
        .sessions
        .session_stats(principal.principal_id(), Utc::now())
        .await
    {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => errors::storage_to_response(e),
    }
}

/// GET /sessions - the caller's refresh credentials, most recently used first
pub async fn list_sessions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(&principal, &Capability::ReadOwnSessions) {
        return denied;
    }

    match services.sessions.list_sessions(principal.principal_id()).await {
        Ok(sessions) => {
            (StatusCode::OK, Json(serde_json::json!({ "sessions": sessions }))).into_response()
        }
        Err(e) => errors::storage_to_response(e),
    }
}
