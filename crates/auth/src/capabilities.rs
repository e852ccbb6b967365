use serde::{Deserialize, Serialize};

use crate::Role;

/// Named permission required to perform a protected operation.
///
/// Each capability has a single minimum role; a role's capability set is
/// every capability whose minimum role it satisfies, so the sets nest the
/// same way the roles do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "content.read")]
    ReadContent,
    #[serde(rename = "sessions.read_own")]
    ReadOwnSessions,
    #[serde(rename = "articles.write")]
    WriteArticles,
    #[serde(rename = "categories.write")]
    WriteCategories,
    #[serde(rename = "users.manage")]
    ManageUsers,
    #[serde(rename = "credentials.manage")]
    ManageCredentials,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::ReadContent,
        Capability::ReadOwnSessions,
        Capability::WriteArticles,
        Capability::WriteCategories,
        Capability::ManageUsers,
        Capability::ManageCredentials,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ReadContent => "content.read",
            Capability::ReadOwnSessions => "sessions.read_own",
            Capability::WriteArticles => "articles.write",
            Capability::WriteCategories => "categories.write",
            Capability::ManageUsers => "users.manage",
            Capability::ManageCredentials => "credentials.manage",
        }
    }

    pub fn minimum_role(&self) -> Role {
        match self {
            Capability::ReadContent | Capability::ReadOwnSessions => Role::Reader,
            Capability::WriteArticles | Capability::WriteCategories => Role::Editor,
            Capability::ManageUsers | Capability::ManageCredentials => Role::Admin,
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    /// Capability set granted to this role.
    pub fn capabilities(self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.satisfies(cap.minimum_role()))
            .collect()
    }
}
