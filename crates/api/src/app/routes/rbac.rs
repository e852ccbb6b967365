//! RBAC audit endpoints.
//!
//! Visibility into the role hierarchy and into individual gate decisions, to
//! answer "why was this request denied?".

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use credo_auth::{Capability, Role, explain_authorization, role_registry};

use crate::app::dto::ExplainQuery;
use crate::app::errors;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/explain", get(explain))
}

/// GET /rbac/roles - every role with its implied roles and capabilities
pub async fn list_roles(
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(&principal, &Capability::ManageUsers) {
        return denied;
    }

    (StatusCode::OK, Json(serde_json::json!({ "roles": role_registry() }))).into_response()
}

/// GET /rbac/explain?required=editor - explain the gate for the caller's role
pub async fn explain(
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<ExplainQuery>,
) -> axum::response::Response {
    let required = match query.required.parse::<Role>() {
        Ok(role) => role,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_role", e.to_string()),
    };

    let explanation = explain_authorization(principal.role(), required);
    (StatusCode::OK, Json(explanation)).into_response()
}
