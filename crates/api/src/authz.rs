//! API-side role gate.
//!
//! Handlers call this before doing any work; the gate itself is the pure
//! `credo_auth::authorize`, fed the role the middleware just read from the
//! identity store.

use axum::response::Response;

use credo_auth::{CapabilityDenied, Role, RoleGated, authorize, authorize_operation};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Gate a request on a minimum role.
pub fn require_role(principal: &PrincipalContext, required: Role) -> Result<(), Response> {
    authorize(principal.role(), required).map_err(|denied| deny(principal, denied))
}

/// Gate a request on a named operation (usually a `Capability`).
pub fn require<O: RoleGated + ?Sized>(principal: &PrincipalContext, op: &O) -> Result<(), Response> {
    authorize_operation(principal.role(), op).map_err(|denied| deny(principal, denied))
}

fn deny(principal: &PrincipalContext, denied: CapabilityDenied) -> Response {
    tracing::info!(
        principal_id = %principal.principal_id(),
        role = %denied.role,
        required = %denied.required,
        "capability denied"
    );
    errors::capability_denied_to_response(denied)
}
