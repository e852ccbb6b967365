use core::str::FromStr;

use serde::{Deserialize, Serialize};

use credo_core::DomainError;

/// Role identifier used for RBAC.
///
/// Roles form a closed set with nested capability sets:
/// `Admin ⊇ Editor ⊇ Reader`. The nesting is encoded once, in
/// [`Role::superset_chain`], and every decision goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access to published content.
    Reader,
    /// Creates and edits articles and categories.
    Editor,
    /// Manages users and their credentials.
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Reader, Role::Editor, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::Reader => "Read-only access to published content",
            Role::Editor => "Create and edit articles and categories",
            Role::Admin => "Manage users and their credentials",
        }
    }

    /// Roles whose capability set contains this role's, including itself.
    pub fn superset_chain(self) -> &'static [Role] {
        match self {
            Role::Reader => &[Role::Reader, Role::Editor, Role::Admin],
            Role::Editor => &[Role::Editor, Role::Admin],
            Role::Admin => &[Role::Admin],
        }
    }

    /// Roles this role implies (itself plus everything below it).
    pub fn implied_roles(self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|lower| self.satisfies(*lower))
            .collect()
    }

    /// `true` when a principal holding `self` may perform an operation gated on `required`.
    pub fn satisfies(self, required: Role) -> bool {
        required.superset_chain().contains(&self)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reader" => Ok(Role::Reader),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::unknown_variant("role", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive_and_closed() {
        assert_eq!("Editor".parse::<Role>().unwrap(), Role::Editor);
        assert_eq!(" admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn implied_roles_are_nested() {
        assert_eq!(Role::Reader.implied_roles(), vec![Role::Reader]);
        assert_eq!(Role::Editor.implied_roles(), vec![Role::Reader, Role::Editor]);
        assert_eq!(Role::Admin.implied_roles(), Role::ALL.to_vec());
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&Role::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
        let back: Role = serde_json::from_str("\"reader\"").unwrap();
        assert_eq!(back, Role::Reader);
    }
}
