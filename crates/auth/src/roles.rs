use core::str::FromStr;

use serde::{Deserialize, Serialize};

use scholaris_core::DomainError;

/// Role of a principal.
///
/// A closed set: every policy table matches on it exhaustively, so adding a
/// role fails to compile until each table has been revisited.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    SuperAdmin,
    Admin,
    Administration,
    Teacher,
    Student,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Administration,
        Role::Teacher,
        Role::Student,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "superadmin",
            Role::Admin => "admin",
            Role::Administration => "administration",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    /// Whether principals of this role belong to exactly one tenant.
    pub fn is_tenant_scoped(&self) -> bool {
        match self {
            Role::SuperAdmin => false,
            Role::Admin | Role::Administration | Role::Teacher | Role::Student => true,
        }
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
            "superadmin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "administration" => Ok(Role::Administration),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}
