use serde::Serialize;
use thiserror::Error;

use crate::{Capability, ErrorClass, Role};

/// Denial produced by the authorization gate.
///
/// This is deliberately a separate type from the authentication failures:
/// the caller is known, it just may not perform the operation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("capability denied: role '{role}' does not satisfy required role '{required}'")]
pub struct CapabilityDenied {
    pub role: Role,
    pub required: Role,
}

impl CapabilityDenied {
    pub fn code(&self) -> &'static str {
        "capability_denied"
    }

    pub fn public_message(&self) -> &'static str {
        "insufficient role for this operation"
    }

    pub fn class(&self) -> ErrorClass {
        ErrorClass::CapabilityDenied
    }

    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Contract for protected operations (checked at the resource boundary).
///
/// Implement this on anything that must be gated; the transport layer
/// authorizes before running it.
pub trait RoleGated {
    fn required_role(&self) -> Role;
}

impl RoleGated for Capability {
    fn required_role(&self) -> Role {
        self.minimum_role()
    }
}

/// Authorize a role against a required role.
///
/// - No IO
/// - No panics
/// - Total over every (role, required) pair
pub fn authorize(role: Role, required: Role) -> Result<(), CapabilityDenied> {
    if role.satisfies(required) {
        Ok(())
    } else {
        Err(CapabilityDenied { role, required })
    }
}

/// Authorize a role for a gated operation.
pub fn authorize_operation<O: RoleGated + ?Sized>(role: Role, op: &O) -> Result<(), CapabilityDenied> {
    authorize(role, op.required_role())
}

/// Derived, never persisted: the gate's answer plus the denial when there is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    pub denial: Option<CapabilityDenied>,
}

impl AuthorizationDecision {
    pub fn decide(role: Role, required: Role) -> Self {
        match authorize(role, required) {
            Ok(()) => Self {
                allowed: true,
                denial: None,
            },
            Err(denied) => Self {
                allowed: false,
                denial: Some(denied),
            },
        }
    }

    pub fn into_result(self) -> Result<(), CapabilityDenied> {
        match self.denial {
            Some(denied) => Err(denied),
            None => Ok(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub role: Role,
    pub required_role: Role,
    pub granted: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// Roles that would be granted this operation.
    pub granting_roles: Vec<Role>,
    /// Capabilities the role currently holds.
    pub capabilities: Vec<Capability>,
}

/// Explain why an authorization decision was made (or would be made).
pub fn explain_authorization(role: Role, required: Role) -> AuthorizationExplanation {
    let decision = AuthorizationDecision::decide(role, required);
    let granting_roles = required.superset_chain().to_vec();

    let reason = if !decision.allowed {
        format!(
            "role '{}' is below '{}'; one of {:?} is required",
            role,
            required,
            granting_roles.iter().map(|r| r.as_str()).collect::<Vec<_>>()
        )
    } else if role == required {
        format!("role '{}' matches the required role", role)
    } else {
        format!("role '{}' includes every capability of '{}'", role, required)
    };

    AuthorizationExplanation {
        role,
        required_role: required,
        granted: decision.allowed,
        reason,
        granting_roles,
        capabilities: role.capabilities(),
    }
}

/// Role definition with its implied roles and capabilities (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub name: Role,
    pub description: &'static str,
    pub implies: Vec<Role>,
    pub capabilities: Vec<Capability>,
}

/// Complete view of the role hierarchy.
pub fn role_registry() -> Vec<RoleDefinition> {
    Role::ALL
        .into_iter()
        .map(|role| RoleDefinition {
            name: role,
            description: role.description(),
            implies: role.implied_roles(),
            capabilities: role.capabilities(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hierarchy_decisions() {
        assert!(authorize(Role::Admin, Role::Editor).is_ok());
        assert!(authorize(Role::Editor, Role::Editor).is_ok());
        assert_eq!(
            authorize(Role::Reader, Role::Editor),
            Err(CapabilityDenied {
                role: Role::Reader,
                required: Role::Editor
            })
        );
        assert!(authorize(Role::Editor, Role::Admin).is_err());
        assert!(authorize(Role::Reader, Role::Reader).is_ok());
    }

    #[test]
    fn full_decision_table() {
        // (role, required, allowed)
        let table = [
            (Role::Reader, Role::Reader, true),
            (Role::Reader, Role::Editor, false),
            (Role::Reader, Role::Admin, false),
            (Role::Editor, Role::Reader, true),
            (Role::Editor, Role::Editor, true),
            (Role::Editor, Role::Admin, false),
            (Role::Admin, Role::Reader, true),
            (Role::Admin, Role::Editor, true),
            (Role::Admin, Role::Admin, true),
        ];
        for (role, required, allowed) in table {
            let decision = AuthorizationDecision::decide(role, required);
            assert_eq!(decision.allowed, allowed, "{role} vs {required}");
            assert_eq!(decision.denial.is_some(), !allowed);
        }
    }

    #[test]
    fn capability_gates_use_minimum_role() {
        assert!(authorize_operation(Role::Reader, &Capability::ReadContent).is_ok());
        assert!(authorize_operation(Role::Reader, &Capability::WriteArticles).is_err());
        assert!(authorize_operation(Role::Editor, &Capability::WriteCategories).is_ok());
        assert!(authorize_operation(Role::Editor, &Capability::ManageCredentials).is_err());
    }

    #[test]
    fn explanation_lists_granting_roles_on_denial() {
        let explanation = explain_authorization(Role::Reader, Role::Editor);
        assert!(!explanation.granted);
        assert_eq!(explanation.granting_roles, vec![Role::Editor, Role::Admin]);
        assert!(explanation.reason.contains("below"));
    }

    #[test]
    fn registry_covers_every_role() {
        let registry = role_registry();
        assert_eq!(registry.len(), Role::ALL.len());
        let admin = registry.iter().find(|d| d.name == Role::Admin).unwrap();
        assert_eq!(admin.implies, Role::ALL.to_vec());
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Reader), Just(Role::Editor), Just(Role::Admin)]
    }

    proptest! {
        #[test]
        fn every_role_satisfies_itself(role in any_role()) {
            prop_assert!(authorize(role, role).is_ok());
        }

        #[test]
        fn authorization_is_transitive(a in any_role(), b in any_role(), c in any_role()) {
            if authorize(a, b).is_ok() && authorize(b, c).is_ok() {
                prop_assert!(authorize(a, c).is_ok());
            }
        }

        #[test]
        fn granted_roles_hold_the_required_capabilities(role in any_role(), required in any_role()) {
            let granted = authorize(role, required).is_ok();
            let covers = required
                .capabilities()
                .iter()
                .all(|cap| role.capabilities().contains(cap));
            prop_assert_eq!(granted, covers);
        }
    }
}
