use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use credo_auth::{
    AuthFailure, CapabilityDenied, ErrorClass, RefreshFailure, StorageUnavailable,
    ValidationFailure,
};

/// HTTP status for a failure class.
pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Authentication | ErrorClass::Validation | ErrorClass::Refresh => {
            StatusCode::UNAUTHORIZED
        }
        ErrorClass::CapabilityDenied => StatusCode::FORBIDDEN,
        ErrorClass::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn auth_failure_to_response(err: AuthFailure) -> axum::response::Response {
    if matches!(err.class(), ErrorClass::Internal) {
        tracing::error!(error = %err, "login failed internally");
    }
    json_error(status_for(err.class()), err.public_code(), err.public_message())
}

pub fn validation_failure_to_response(err: ValidationFailure) -> axum::response::Response {
    json_error(status_for(err.class()), err.public_code(), err.public_message())
}

pub fn refresh_failure_to_response(err: RefreshFailure) -> axum::response::Response {
    if matches!(err.class(), ErrorClass::Internal) {
        tracing::error!(error = %err, "refresh failed internally");
    }
    json_error(status_for(err.class()), err.public_code(), err.public_message())
}

pub fn capability_denied_to_response(err: CapabilityDenied) -> axum::response::Response {
    json_error(status_for(err.class()), err.code(), err.public_message())
}

pub fn storage_to_response(err: StorageUnavailable) -> axum::response::Response {
    tracing::warn!(error = %err, "storage unavailable");
    json_error(status_for(err.class()), err.code(), err.public_message())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use credo_auth::Role;

    #[test]
    fn classes_map_to_distinct_statuses() {
        assert_eq!(status_for(ErrorClass::Validation), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(ErrorClass::CapabilityDenied), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(ErrorClass::StorageUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn denied_and_storage_responses_carry_their_status() {
        let denied = CapabilityDenied {
            role: Role::Reader,
            required: Role::Admin,
        };
        assert_eq!(
            capability_denied_to_response(denied).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            storage_to_response(StorageUnavailable::new("pool timed out")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            auth_failure_to_response(AuthFailure::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
