//! Gated probe endpoints.
//!
//! They carry no content model of their own; they exist so every role level
//! has a route to exercise the gate against.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use credo_auth::Capability;

use crate::app::dto::CreateArticleRequest;
use crate::app::errors;
use crate::authz;
use crate::context::PrincipalContext;

/// GET /content (Reader)
pub async fn list_content(
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(&principal, &Capability::ReadContent) {
        return denied;
    }

    (StatusCode::OK, Json(json!({ "items": [] }))).into_response()
}

/// POST /articles (Editor)
pub async fn create_article(
    Extension(principal): Extension<PrincipalContext>,
    Json(req): Json<CreateArticleRequest>,
) -> axum::response::Response {
    if let Err(denied) = authz::require(&principal, &Capability::WriteArticles) {
        return denied;
    }

    if req.title.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "title is required");
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "title": req.title,
            "body_length": req.body.len(),
            "author_id": principal.principal_id(),
        })),
    )
        .into_response()
}
