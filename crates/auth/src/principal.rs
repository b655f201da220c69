use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scholaris_core::{ClassId, DomainError, PrincipalId, TenantId};

use crate::Role;

/// An authenticated actor.
///
/// # Invariants
/// - Every non-superadmin principal belongs to exactly one tenant; a
///   superadmin belongs to none.
/// - `tenant_id` and `role` never change after creation (no setter exists).
/// - A student always carries a `class_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    id: PrincipalId,
    role: Role,
    #[serde(rename = "schoolId")]
    tenant_id: Option<TenantId>,
    pub name: String,
    pub email: String,
    pub class_id: Option<ClassId>,
    pub must_change_password: bool,
    #[serde(skip)]
    password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a tenant member.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub role: Role,
    pub tenant_id: TenantId,
    pub name: String,
    pub email: String,
    pub class_id: Option<ClassId>,
    pub password_hash: String,
}

/// Fields a client may change on an existing principal.
///
/// Role, tenant and balance fields are deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct PrincipalUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub class_id: Option<ClassId>,
    pub password_hash: Option<String>,
}

impl Principal {
    /// Create a member of a tenant. Superadmins are created with [`Principal::superadmin`].
    pub fn new_member(input: NewPrincipal, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if !input.role.is_tenant_scoped() {
            return Err(DomainError::validation(
                "superadmin principals cannot belong to a tenant",
            ));
        }

        let class_id = match input.role {
            Role::Student => Some(
                input
                    .class_id
                    .ok_or_else(|| DomainError::validation("student must be assigned to a class"))?,
            ),
            _ => None,
        };

        Ok(Self {
            id: PrincipalId::new(),
            role: input.role,
            tenant_id: Some(input.tenant_id),
            name: validate_name(&input.name)?,
            email: normalize_email(&input.email)?,
            class_id,
            must_change_password: true,
            password_hash: validate_hash(input.password_hash)?,
            created_at: now,
            updated_at: now,
        })
    }

    /// Create the global operator account.
    pub fn superadmin(
        name: &str,
        email: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id: PrincipalId::new(),
            role: Role::SuperAdmin,
            tenant_id: None,
            name: validate_name(name)?,
            email: normalize_email(email)?,
            class_id: None,
            must_change_password: false,
            password_hash: validate_hash(password_hash)?,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> PrincipalId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn is_superadmin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    /// Apply a client update. Validation failures leave `self` untouched.
    pub fn apply_update(&mut self, update: PrincipalUpdate, now: DateTime<Utc>) -> Result<(), DomainError> {
        let name = update.name.as_deref().map(validate_name).transpose()?;
        let email = update.email.as_deref().map(normalize_email).transpose()?;
        let hash = update.password_hash.map(validate_hash).transpose()?;

        if update.class_id.is_some() && self.role != Role::Student {
            return Err(DomainError::validation("only students are assigned to a class"));
        }

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if let Some(class_id) = update.class_id {
            self.class_id = Some(class_id);
        }
        if let Some(hash) = hash {
            self.password_hash = hash;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Replace the credential after a successful change-password flow.
    pub fn change_password(&mut self, password_hash: String, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.password_hash = validate_hash(password_hash)?;
        self.must_change_password = false;
        self.updated_at = now;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(name.to_string())
}

fn validate_hash(hash: String) -> Result<String, DomainError> {
    if hash.is_empty() {
        return Err(DomainError::validation("password hash cannot be empty"));
    }
    Ok(hash)
}

/// Trim + lowercase, with a basic shape check (`local@domain.tld`).
pub fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email)
}
