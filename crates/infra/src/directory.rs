//! Principal directory: the single source of truth for identities.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use scholaris_auth::{Principal, Role};
use scholaris_core::{DomainError, PrincipalId, TenantId};

use crate::StoreError;

/// Email addresses are unique platform-wide. Scoped operations take the
/// caller's tenant (`None` only for platform-level principals) and never
/// return a principal outside it.
pub trait PrincipalDirectory: Send + Sync {
    fn insert(&self, principal: Principal) -> Result<(), StoreError>;

    /// Identity lookup for session resolution (not tenant-scoped).
    fn get(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError>;

    fn get_in_tenant(&self, tenant_id: TenantId, id: PrincipalId) -> Result<Option<Principal>, StoreError>;

    fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError>;

    /// Members of `tenant_id` holding any of `roles`, oldest first.
    fn list(&self, tenant_id: TenantId, roles: &[Role]) -> Result<Vec<Principal>, StoreError>;

    fn count(&self, tenant_id: TenantId, role: Role) -> Result<usize, StoreError>;

    fn update(
        &self,
        scope: Option<TenantId>,
        id: PrincipalId,
        mutate: &mut dyn FnMut(&mut Principal) -> Result<(), DomainError>,
    ) -> Result<Principal, StoreError>;

    fn remove(&self, tenant_id: TenantId, id: PrincipalId) -> Result<Principal, StoreError>;
}

impl<S> PrincipalDirectory for Arc<S>
where
    S: PrincipalDirectory + ?Sized,
{
    fn insert(&self, principal: Principal) -> Result<(), StoreError> {
        (**self).insert(principal)
    }

    fn get(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        (**self).get(id)
    }

    fn get_in_tenant(&self, tenant_id: TenantId, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        (**self).get_in_tenant(tenant_id, id)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError> {
        (**self).find_by_email(email)
    }

    fn list(&self, tenant_id: TenantId, roles: &[Role]) -> Result<Vec<Principal>, StoreError> {
        (**self).list(tenant_id, roles)
    }

    fn count(&self, tenant_id: TenantId, role: Role) -> Result<usize, StoreError> {
        (**self).count(tenant_id, role)
    }

    fn update(
        &self,
        scope: Option<TenantId>,
        id: PrincipalId,
        mutate: &mut dyn FnMut(&mut Principal) -> Result<(), DomainError>,
    ) -> Result<Principal, StoreError> {
        (**self).update(scope, id, mutate)
    }

    fn remove(&self, tenant_id: TenantId, id: PrincipalId) -> Result<Principal, StoreError> {
        (**self).remove(tenant_id, id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPrincipalDirectory {
    inner: RwLock<HashMap<PrincipalId, Principal>>,
}

impl InMemoryPrincipalDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(map: &HashMap<PrincipalId, Principal>, email: &str, except: Option<PrincipalId>) -> bool {
    map.values()
        .any(|p| p.email == email && Some(p.id()) != except)
}

impl PrincipalDirectory for InMemoryPrincipalDirectory {
    fn insert(&self, principal: Principal) -> Result<(), StoreError> {
        let mut map = self.inner.write()?;
        if email_taken(&map, &principal.email, None) {
            return Err(StoreError::Conflict("email already registered".into()));
        }
        if map.contains_key(&principal.id()) {
            return Err(StoreError::Conflict("principal already exists".into()));
        }
        map.insert(principal.id(), principal);
        Ok(())
    }

    fn get(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        Ok(self.inner.read()?.get(&id).cloned())
    }

    fn get_in_tenant(&self, tenant_id: TenantId, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        Ok(self
            .inner
            .read()?
            .get(&id)
            .filter(|p| p.tenant_id() == Some(tenant_id))
            .cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .inner
            .read()?
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    fn list(&self, tenant_id: TenantId, roles: &[Role]) -> Result<Vec<Principal>, StoreError> {
        let map = self.inner.read()?;
        let mut out: Vec<Principal> = map
            .values()
            .filter(|p| p.tenant_id() == Some(tenant_id) && roles.contains(&p.role()))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id().cmp(&b.id())));
        Ok(out)
    }

    fn count(&self, tenant_id: TenantId, role: Role) -> Result<usize, StoreError> {
        Ok(self
            .inner
            .read()?
            .values()
            .filter(|p| p.tenant_id() == Some(tenant_id) && p.role() == role)
            .count())
    }

    fn update(
        &self,
        scope: Option<TenantId>,
        id: PrincipalId,
        mutate: &mut dyn FnMut(&mut Principal) -> Result<(), DomainError>,
    ) -> Result<Principal, StoreError> {
        let mut map = self.inner.write()?;
        let current = map
            .get(&id)
            .filter(|p| p.tenant_id() == scope)
            .ok_or(StoreError::NotFound)?;

        let mut draft = current.clone();
        mutate(&mut draft)?;
        if draft.id() != id || draft.tenant_id() != scope {
            return Err(StoreError::Domain(DomainError::invariant(
                "principal identity and tenant are immutable",
            )));
        }
        if email_taken(&map, &draft.email, Some(id)) {
            return Err(StoreError::Conflict("email already registered".into()));
        }

        map.insert(id, draft.clone());
        Ok(draft)
    }

    fn remove(&self, tenant_id: TenantId, id: PrincipalId) -> Result<Principal, StoreError> {
        let mut map = self.inner.write()?;
        let owned = map.get(&id).is_some_and(|p| p.tenant_id() == Some(tenant_id));
        if !owned {
            return Err(StoreError::NotFound);
        }
        map.remove(&id).ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scholaris_auth::{NewPrincipal, PrincipalUpdate};

    fn member(tenant: TenantId, role: Role, email: &str) -> Principal {
        Principal::new_member(
            NewPrincipal {
                role,
                tenant_id: tenant,
                name: "Pat".into(),
                email: email.into(),
                class_id: None,
                password_hash: "h".into(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let dir = InMemoryPrincipalDirectory::new();
        let t = TenantId::new();
        dir.insert(member(t, Role::Teacher, "pat@school.test")).unwrap();
        let err = dir
            .insert(member(TenantId::new(), Role::Admin, "PAT@school.test"))
            .unwrap_err();
        assert_eq!(err, StoreError::Conflict("email already registered".into()));
    }

    #[test]
    fn scoped_reads_hide_foreign_principals() {
        let dir = InMemoryPrincipalDirectory::new();
        let (t1, t2) = (TenantId::new(), TenantId::new());
        let p = member(t1, Role::Teacher, "pat@school.test");
        let id = p.id();
        dir.insert(p).unwrap();

        assert!(dir.get_in_tenant(t1, id).unwrap().is_some());
        assert!(dir.get_in_tenant(t2, id).unwrap().is_none());
        assert!(dir.list(t2, &[Role::Teacher]).unwrap().is_empty());
        assert_eq!(dir.remove(t2, id), Err(StoreError::NotFound));
        assert_eq!(
            dir.update(Some(t2), id, &mut |_| Ok(())).unwrap_err(),
            StoreError::NotFound
        );
    }

    #[test]
    fn list_and_count_filter_by_role() {
        let dir = InMemoryPrincipalDirectory::new();
        let t = TenantId::new();
        dir.insert(member(t, Role::Teacher, "a@school.test")).unwrap();
        dir.insert(member(t, Role::Administration, "b@school.test")).unwrap();
        dir.insert(member(t, Role::Admin, "c@school.test")).unwrap();

        assert_eq!(dir.list(t, &[Role::Teacher, Role::Administration]).unwrap().len(), 2);
        assert_eq!(dir.count(t, Role::Admin).unwrap(), 1);
        assert_eq!(dir.count(t, Role::Student).unwrap(), 0);
    }

    #[test]
    fn update_rechecks_email_uniqueness() {
        let dir = InMemoryPrincipalDirectory::new();
        let t = TenantId::new();
        dir.insert(member(t, Role::Teacher, "a@school.test")).unwrap();
        let b = member(t, Role::Teacher, "b@school.test");
        let b_id = b.id();
        dir.insert(b).unwrap();

        let err = dir
            .update(Some(t), b_id, &mut |p| {
                p.apply_update(
                    PrincipalUpdate {
                        email: Some("a@school.test".into()),
                        ..PrincipalUpdate::default()
                    },
                    Utc::now(),
                )
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(dir.get(b_id).unwrap().unwrap().email, "b@school.test");
    }

    #[test]
    fn find_by_email_normalizes_input() {
        let dir = InMemoryPrincipalDirectory::new();
        dir.insert(member(TenantId::new(), Role::Teacher, "pat@school.test")).unwrap();
        assert!(dir.find_by_email("  Pat@School.TEST ").unwrap().is_some());
    }
}
