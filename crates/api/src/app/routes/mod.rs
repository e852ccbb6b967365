use axum::{
    Router,
    routing::{get, post},
};

pub mod admin;
pub mod auth;
pub mod content;
pub mod rbac;
pub mod system;

/// Router for unauthenticated endpoints (credential exchange).
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/validate", post(auth::validate))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/logout-all", post(auth::logout_all))
        .route("/whoami", get(system::whoami))
        .route("/sessions", get(system::list_sessions))
        .route("/sessions/stats", get(system::session_stats))
        .route("/content", get(content::list_content))
        .route("/articles", post(content::create_article))
        .nest("/admin", admin::router())
        .nest("/rbac", rbac::router())
}
