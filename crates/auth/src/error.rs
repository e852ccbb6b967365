//! Failure taxonomy for the credential lifecycle.
//!
//! Every failure carries a specific internal `code()` for logs and audit, and a
//! `public_code()`/`public_message()` pair that is safe to hand to a caller.
//! Authentication and refresh failures deliberately collapse to the same
//! public pair so a caller cannot probe which step failed.

use serde::Serialize;
use thiserror::Error;

const INVALID_CREDENTIALS_CODE: &str = "invalid_credentials";
const INVALID_CREDENTIALS_MESSAGE: &str = "invalid credentials";
const UNAVAILABLE_CODE: &str = "storage_unavailable";
const UNAVAILABLE_MESSAGE: &str = "service temporarily unavailable, retry later";

/// Coarse failure class used to pick a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Authentication,
    Validation,
    Refresh,
    CapabilityDenied,
    StorageUnavailable,
    Internal,
}

impl ErrorClass {
    /// Only storage faults are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::StorageUnavailable)
    }
}

/// The credential store could not be reached or failed mid-operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("credential storage unavailable: {0}")]
pub struct StorageUnavailable(pub String);

impl StorageUnavailable {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }

    pub fn code(&self) -> &'static str {
        UNAVAILABLE_CODE
    }

    pub fn public_message(&self) -> &'static str {
        UNAVAILABLE_MESSAGE
    }

    pub fn class(&self) -> ErrorClass {
        ErrorClass::StorageUnavailable
    }

    pub fn is_retryable(&self) -> bool {
        true
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IssuanceError {
    #[error(transparent)]
    Storage(#[from] StorageUnavailable),

    #[error("failed to sign access credential: {0}")]
    Signing(String),
}

impl IssuanceError {
    pub fn code(&self) -> &'static str {
        match self {
            IssuanceError::Storage(_) => UNAVAILABLE_CODE,
            IssuanceError::Signing(_) => "signing_failed",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            IssuanceError::Storage(_) => ErrorClass::StorageUnavailable,
            IssuanceError::Signing(_) => ErrorClass::Internal,
        }
    }

    fn public_pair(&self) -> (&'static str, &'static str) {
        match self {
            IssuanceError::Storage(_) => (UNAVAILABLE_CODE, UNAVAILABLE_MESSAGE),
            IssuanceError::Signing(_) => ("internal_error", "internal error"),
        }
    }
}

/// Login failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// Unknown login, wrong password, or blank input.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password matched but the principal is deactivated.
    #[error("principal is inactive")]
    PrincipalInactive,

    #[error(transparent)]
    Issuance(#[from] IssuanceError),

    #[error(transparent)]
    Storage(#[from] StorageUnavailable),
}

impl AuthFailure {
    pub fn code(&self) -> &'static str {
        match self {
            AuthFailure::InvalidCredentials => "invalid_credentials",
            AuthFailure::PrincipalInactive => "principal_inactive",
            AuthFailure::Issuance(e) => e.code(),
            AuthFailure::Storage(e) => e.code(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            AuthFailure::InvalidCredentials | AuthFailure::PrincipalInactive => {
                ErrorClass::Authentication
            }
            AuthFailure::Issuance(e) => e.class(),
            AuthFailure::Storage(e) => e.class(),
        }
    }

    pub fn public_code(&self) -> &'static str {
        match self {
            AuthFailure::Issuance(e) => e.public_pair().0,
            AuthFailure::Storage(e) => e.code(),
            _ => INVALID_CREDENTIALS_CODE,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            AuthFailure::Issuance(e) => e.public_pair().1,
            AuthFailure::Storage(e) => e.public_message(),
            _ => INVALID_CREDENTIALS_MESSAGE,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}

/// A presented access credential was not accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("access credential is malformed")]
    MalformedCredential,

    #[error("access credential has expired")]
    ExpiredCredential,

    #[error("access credential has been revoked")]
    RevokedCredential,

    #[error("access credential is unknown")]
    UnknownCredential,

    #[error("principal is inactive")]
    PrincipalInactive,

    #[error(transparent)]
    Storage(#[from] StorageUnavailable),
}

impl ValidationFailure {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationFailure::MalformedCredential => "malformed_credential",
            ValidationFailure::ExpiredCredential => "expired_credential",
            ValidationFailure::RevokedCredential => "revoked_credential",
            ValidationFailure::UnknownCredential => "unknown_credential",
            ValidationFailure::PrincipalInactive => "principal_inactive",
            ValidationFailure::Storage(e) => e.code(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ValidationFailure::Storage(e) => e.class(),
            _ => ErrorClass::Validation,
        }
    }

    /// Validation reasons are not secret to the credential holder.
    pub fn public_code(&self) -> &'static str {
        self.code()
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            ValidationFailure::MalformedCredential => "access credential is malformed",
            ValidationFailure::ExpiredCredential => "access credential has expired",
            ValidationFailure::RevokedCredential => "access credential has been revoked",
            ValidationFailure::UnknownCredential => "access credential is not recognised",
            ValidationFailure::PrincipalInactive => "account is inactive",
            ValidationFailure::Storage(e) => e.public_message(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}

/// A presented refresh credential could not be rotated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    #[error("refresh credential is unknown")]
    InvalidRefresh,

    #[error("refresh credential has expired")]
    ExpiredRefresh,

    #[error("refresh credential has been revoked")]
    RevokedRefresh,

    #[error("principal is inactive")]
    PrincipalInactive,

    #[error(transparent)]
    Issuance(#[from] IssuanceError),

    #[error(transparent)]
    Storage(#[from] StorageUnavailable),
}

impl RefreshFailure {
    pub fn code(&self) -> &'static str {
        match self {
            RefreshFailure::InvalidRefresh => "invalid_refresh",
            RefreshFailure::ExpiredRefresh => "expired_refresh",
            RefreshFailure::RevokedRefresh => "revoked_refresh",
            RefreshFailure::PrincipalInactive => "principal_inactive",
            RefreshFailure::Issuance(e) => e.code(),
            RefreshFailure::Storage(e) => e.code(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            RefreshFailure::Issuance(e) => e.class(),
            RefreshFailure::Storage(e) => e.class(),
            _ => ErrorClass::Refresh,
        }
    }

    pub fn public_code(&self) -> &'static str {
        match self {
            RefreshFailure::Issuance(e) => e.public_pair().0,
            RefreshFailure::Storage(e) => e.code(),
            _ => INVALID_CREDENTIALS_CODE,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            RefreshFailure::Issuance(e) => e.public_pair().1,
            RefreshFailure::Storage(e) => e.public_message(),
            _ => INVALID_CREDENTIALS_MESSAGE,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}
