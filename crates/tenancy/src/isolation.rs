//! Tenant isolation gate.
//!
//! Non-superadmin principals are always confined to their own tenant; a
//! client-supplied tenant id is only ever compared, never trusted.

use thiserror::Error;

use scholaris_auth::Principal;
use scholaris_core::TenantId;

/// The tenant a request is bound to after the isolation gate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EffectiveTenant {
    /// Superadmin acting across all tenants.
    Global,
    Scoped(TenantId),
}

impl EffectiveTenant {
    pub fn tenant_id(&self) -> Option<TenantId> {
        match self {
            EffectiveTenant::Global => None,
            EffectiveTenant::Scoped(t) => Some(*t),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IsolationError {
    #[error("cross-tenant data access is prohibited")]
    CrossTenant,

    #[error("principal is not attached to a school")]
    MissingTenant,

    #[error("conflicting school ids in request")]
    Ambiguous,
}

/// Bind the effective tenant for one requested id (or none).
pub fn resolve_effective_tenant(
    principal: &Principal,
    requested: Option<TenantId>,
) -> Result<EffectiveTenant, IsolationError> {
    if principal.is_superadmin() {
        return Ok(match requested {
            Some(t) => EffectiveTenant::Scoped(t),
            None => EffectiveTenant::Global,
        });
    }

    let own = principal.tenant_id().ok_or(IsolationError::MissingTenant)?;
    match requested {
        Some(t) if t != own => Err(IsolationError::CrossTenant),
        _ => Ok(EffectiveTenant::Scoped(own)),
    }
}

/// Resolve against every tenant id a request carries (path, query, body).
///
/// Each source is checked on its own, so a matching query cannot mask a
/// foreign id in the body.
pub fn resolve_requested<I>(principal: &Principal, requested: I) -> Result<EffectiveTenant, IsolationError>
where
    I: IntoIterator<Item = TenantId>,
{
    let mut bound = resolve_effective_tenant(principal, None)?;
    for t in requested {
        let next = resolve_effective_tenant(principal, Some(t))?;
        bound = match (bound, next) {
            (EffectiveTenant::Global, n) => n,
            (EffectiveTenant::Scoped(a), EffectiveTenant::Scoped(b)) if a != b => {
                return Err(IsolationError::Ambiguous);
            }
            (b, _) => b,
        };
    }
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use scholaris_auth::{NewPrincipal, Role};

    fn teacher(tenant: TenantId) -> Principal {
        Principal::new_member(
            NewPrincipal {
                role: Role::Teacher,
                tenant_id: tenant,
                name: "Tia".into(),
                email: "tia@school.test".into(),
                class_id: None,
                password_hash: "h".into(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn superadmin() -> Principal {
        Principal::superadmin("Root", "root@platform.test", "h".into(), Utc::now()).unwrap()
    }

    #[test]
    fn member_without_request_is_bound_to_own_tenant() {
        let t = TenantId::new();
        assert_eq!(
            resolve_effective_tenant(&teacher(t), None),
            Ok(EffectiveTenant::Scoped(t))
        );
    }

    #[test]
    fn member_naming_foreign_tenant_is_denied() {
        let p = teacher(TenantId::new());
        let err = resolve_effective_tenant(&p, Some(TenantId::new())).unwrap_err();
        assert_eq!(err, IsolationError::CrossTenant);
        assert_eq!(err.to_string(), "cross-tenant data access is prohibited");
    }

    #[test]
    fn superadmin_is_global_unless_it_names_a_tenant() {
        let t = TenantId::new();
        assert_eq!(resolve_effective_tenant(&superadmin(), None), Ok(EffectiveTenant::Global));
        assert_eq!(
            resolve_effective_tenant(&superadmin(), Some(t)),
            Ok(EffectiveTenant::Scoped(t))
        );
    }

    #[test]
    fn one_foreign_source_among_matching_ones_is_denied() {
        let own = TenantId::new();
        let p = teacher(own);
        assert_eq!(
            resolve_requested(&p, [own, TenantId::new(), own]),
            Err(IsolationError::CrossTenant)
        );
        assert_eq!(resolve_requested(&p, [own, own]), Ok(EffectiveTenant::Scoped(own)));
    }

    #[test]
    fn superadmin_with_two_different_tenants_is_ambiguous() {
        assert_eq!(
            resolve_requested(&superadmin(), [TenantId::new(), TenantId::new()]),
            Err(IsolationError::Ambiguous)
        );
    }

    proptest! {
        #[test]
        fn member_never_escapes_own_tenant(a in any::<u128>(), b in any::<u128>()) {
            let own = TenantId::from_uuid(uuid::Uuid::from_u128(a));
            let other = TenantId::from_uuid(uuid::Uuid::from_u128(b));
            let p = teacher(own);
            match resolve_effective_tenant(&p, Some(other)) {
                Ok(bound) => prop_assert_eq!(bound, EffectiveTenant::Scoped(own)),
                Err(e) => {
                    prop_assert_ne!(own, other);
                    prop_assert_eq!(e, IsolationError::CrossTenant);
                }
            }
        }
    }
}
