//! Role hierarchy & creation policy.
//!
//! Pure decisions, no IO. The hierarchy is strict and non-transitive: each
//! actor role has an exact target set rather than "this role and below".
//!
//! | actor          | create                 | list                            | update/delete          |
//! |----------------|------------------------|---------------------------------|------------------------|
//! | superadmin     | admin (and tenants)    | –                               | –                      |
//! | admin          | administration         | administration, teacher, student| administration, teacher, student |
//! | administration | teacher, student       | teacher, student                | teacher, student       |
//! | teacher        | –                      | –                               | –                      |
//! | student        | –                      | –                               | –                      |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Action, Role};

/// Kind of mutation applied to an existing principal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Update,
    Delete,
}

impl core::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MutationKind::Update => f.write_str("update"),
            MutationKind::Delete => f.write_str("delete"),
        }
    }
}

/// Denial by the role policy. Always a client error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyDenial {
    #[error("role policy: {role} is not authorized to perform '{action}'")]
    ActionNotPermitted { role: Role, action: Action },

    #[error("role policy: {creator} cannot create {target} principals")]
    CreationNotAllowed { creator: Role, target: Role },

    #[error("role policy: {actor} cannot list {target} principals")]
    ListingNotAllowed { actor: Role, target: Role },

    #[error("role policy: {actor} cannot {kind} {target} principals")]
    MutationNotAllowed {
        actor: Role,
        target: Role,
        kind: MutationKind,
    },
}

/// Check that `role` may attempt `action` at all.
pub fn authorize_action(role: Role, action: Action) -> Result<(), PolicyDenial> {
    if action.permits(role) {
        Ok(())
    } else {
        Err(PolicyDenial::ActionNotPermitted { role, action })
    }
}

/// Exact set of principal roles `creator` may create.
pub fn creatable_roles(creator: Role) -> &'static [Role] {
    match creator {
        Role::SuperAdmin => &[Role::Admin],
        Role::Admin => &[Role::Administration],
        Role::Administration => &[Role::Teacher, Role::Student],
        Role::Teacher | Role::Student => &[],
    }
}

/// Exact set of principal roles `actor` may list.
pub fn listable_roles(actor: Role) -> &'static [Role] {
    match actor {
        Role::SuperAdmin => &[],
        Role::Admin => &[Role::Administration, Role::Teacher, Role::Student],
        Role::Administration => &[Role::Teacher, Role::Student],
        Role::Teacher | Role::Student => &[],
    }
}

/// Exact set of principal roles `actor` may update or delete.
///
/// The admin tier protects itself: nobody mutates an admin or superadmin
/// through this path, and administration cannot touch its peers.
pub fn mutable_roles(actor: Role) -> &'static [Role] {
    match actor {
        Role::SuperAdmin => &[],
        Role::Admin => &[Role::Administration, Role::Teacher, Role::Student],
        Role::Administration => &[Role::Teacher, Role::Student],
        Role::Teacher | Role::Student => &[],
    }
}

pub fn authorize_create(creator: Role, target: Role) -> Result<(), PolicyDenial> {
    if creatable_roles(creator).contains(&target) {
        Ok(())
    } else {
        Err(PolicyDenial::CreationNotAllowed { creator, target })
    }
}

pub fn authorize_list(actor: Role, target: Role) -> Result<(), PolicyDenial> {
    if listable_roles(actor).contains(&target) {
        Ok(())
    } else {
        Err(PolicyDenial::ListingNotAllowed { actor, target })
    }
}

/// Must be evaluated on every update/delete against the *loaded* target,
/// whatever route or lookup produced it.
pub fn authorize_mutate(actor: Role, target: Role, kind: MutationKind) -> Result<(), PolicyDenial> {
    if mutable_roles(actor).contains(&target) {
        Ok(())
    } else {
        Err(PolicyDenial::MutationNotAllowed {
            actor,
            target,
            kind,
        })
    }
}
