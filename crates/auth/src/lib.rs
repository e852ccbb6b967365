//! `credo-auth`: credential model, role gate and failure taxonomy.
//!
//! This crate is intentionally decoupled from HTTP and storage: it defines the
//! records, the ports (`AccessTokenCodec`, `PasswordVerifier`) and the pure
//! decisions. Session services that touch a store live in `credo-infra`.

pub mod authorize;
pub mod capabilities;
pub mod claims;
pub mod codec;
pub mod credential;
pub mod error;
pub mod opaque;
pub mod password;
pub mod principal;
pub mod roles;

pub use authorize::{
    AuthorizationDecision, AuthorizationExplanation, CapabilityDenied, RoleDefinition, RoleGated,
    authorize, authorize_operation, explain_authorization, role_registry,
};
pub use capabilities::Capability;
pub use claims::{AccessClaims, TokenValidationError, validate_claims};
pub use codec::{AccessTokenCodec, CodecError, Hs256JwtCodec};
pub use credential::{
    AccessCredential, CredentialStatus, Origin, RefreshCredential, SessionStats, SessionSummary,
};
pub use error::{
    AuthFailure, ErrorClass, IssuanceError, RefreshFailure, StorageUnavailable, ValidationFailure,
};
pub use opaque::{fingerprint, generate_refresh_value};
pub use password::{Argon2PasswordVerifier, PasswordHashError, PasswordVerifier, hash_password};
pub use principal::{Principal, PrincipalAccount, PrincipalId};
pub use roles::Role;

pub use credo_core::{AccessCredentialId, RefreshCredentialId};
