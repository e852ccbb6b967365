//! Admin routes for credential management of other principals.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use credo_auth::{Capability, PrincipalId};
use credo_infra::RevocationReason;

use crate::app::dto::RevokedResponse;
use crate::app::{errors, services::AppServices};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/principals/:id/sessions", get(list_principal_sessions))
        .route("/principals/:id/revoke", post(revoke_principal_sessions))
}

fn parse_principal_id(raw: &str) -> Result<PrincipalId, axum::response::Response> {
    raw.parse::<PrincipalId>().map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_principal_id", e.to_string())
    })
}

/// GET /admin/principals/:id/sessions
pub async fn list_principal_sessions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(&principal, &Capability::ManageCredentials) {
        return denied;
    }
    let target = match parse_principal_id(&id) {
        Ok(target) => target,
        Err(resp) => return resp,
    };

    match services.sessions.list_sessions(target).await {
        Ok(sessions) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "principal_id": target,
                "sessions": sessions,
            })),
        )
            .into_response(),
        Err(e) => errors::storage_to_response(e),
    }
}

/// POST /admin/principals/:id/revoke
pub async fn revoke_principal_sessions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(&principal, &Capability::ManageCredentials) {
        return denied;
    }
    let target = match parse_principal_id(&id) {
        Ok(target) => target,
        Err(resp) => return resp,
    };

    tracing::info!(
        admin_id = %principal.principal_id(),
        target_id = %target,
        "admin revoking all sessions"
    );

    match services
        .sessions
        .revoke_all_sessions(target, RevocationReason::AdminAction)
        .await
    {
        Ok(count) => (StatusCode::OK, Json(RevokedResponse::from(count))).into_response(),
        Err(e) => errors::storage_to_response(e),
    }
}
