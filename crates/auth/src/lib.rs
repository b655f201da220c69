//! `scholaris-auth`: identity, sessions and the role policy.
//!
//! Decoupled from HTTP and storage: callers hand in principals and clocks.

pub mod claims;
pub mod error;
pub mod password;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod session;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use error::AuthError;
pub use password::{Argon2Hasher, CredentialHasher, check_password_strength};
pub use permissions::Action;
pub use policy::{
    MutationKind, PolicyDenial, authorize_action, authorize_create, authorize_list,
    authorize_mutate, creatable_roles, listable_roles, mutable_roles,
};
pub use principal::{NewPrincipal, Principal, PrincipalUpdate, normalize_email};
pub use roles::Role;
pub use session::{Hs256Sessions, SessionIssuer, TokenValidator};
