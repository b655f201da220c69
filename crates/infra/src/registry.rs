//! Tenant registry (platform-level; not itself tenant-scoped).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use scholaris_core::{DomainError, TenantId};
use scholaris_tenancy::Tenant;

use crate::StoreError;

/// School names (case-insensitive) and contact emails are globally unique.
pub trait TenantRegistry: Send + Sync {
    fn create(&self, tenant: Tenant) -> Result<(), StoreError>;

    fn get(&self, id: TenantId) -> Result<Option<Tenant>, StoreError>;

    /// All tenants, oldest first.
    fn list(&self) -> Result<Vec<Tenant>, StoreError>;

    fn update(
        &self,
        id: TenantId,
        mutate: &mut dyn FnMut(&mut Tenant) -> Result<(), DomainError>,
    ) -> Result<Tenant, StoreError>;

    fn remove(&self, id: TenantId) -> Result<Option<Tenant>, StoreError>;
}

impl<S> TenantRegistry for Arc<S>
where
    S: TenantRegistry + ?Sized,
{
    fn create(&self, tenant: Tenant) -> Result<(), StoreError> {
        (**self).create(tenant)
    }

    fn get(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        (**self).get(id)
    }

    fn list(&self) -> Result<Vec<Tenant>, StoreError> {
        (**self).list()
    }

    fn update(
        &self,
        id: TenantId,
        mutate: &mut dyn FnMut(&mut Tenant) -> Result<(), DomainError>,
    ) -> Result<Tenant, StoreError> {
        (**self).update(id, mutate)
    }

    fn remove(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        (**self).remove(id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTenantRegistry {
    inner: RwLock<HashMap<TenantId, Tenant>>,
}

impl InMemoryTenantRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TenantRegistry for InMemoryTenantRegistry {
    fn create(&self, tenant: Tenant) -> Result<(), StoreError> {
        let mut map = self.inner.write()?;
        if map.values().any(|t| t.same_name(&tenant.name)) {
            return Err(StoreError::Conflict("school name already registered".into()));
        }
        if map.values().any(|t| t.contact_email == tenant.contact_email) {
            return Err(StoreError::Conflict("school email already registered".into()));
        }
        map.insert(tenant.id(), tenant);
        Ok(())
    }

    fn get(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        Ok(self.inner.read()?.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Tenant>, StoreError> {
        let mut out: Vec<Tenant> = self.inner.read()?.values().cloned().collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id().cmp(&b.id())));
        Ok(out)
    }

    fn update(
        &self,
        id: TenantId,
        mutate: &mut dyn FnMut(&mut Tenant) -> Result<(), DomainError>,
    ) -> Result<Tenant, StoreError> {
        let mut map = self.inner.write()?;
        let slot = map.get_mut(&id).ok_or(StoreError::NotFound)?;
        let mut draft = slot.clone();
        mutate(&mut draft)?;
        *slot = draft.clone();
        Ok(draft)
    }

    fn remove(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        Ok(self.inner.write()?.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scholaris_tenancy::NewTenant;

    fn school(name: &str, email: &str) -> Tenant {
        Tenant::register_trial(
            NewTenant {
                name: name.into(),
                contact_email: email.into(),
                address: "1 Main St".into(),
                phone_number: "555-0100".into(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn names_are_unique_ignoring_case() {
        let reg = InMemoryTenantRegistry::new();
        reg.create(school("Greenfield", "a@greenfield.test")).unwrap();
        let err = reg.create(school("GREENFIELD", "b@greenfield.test")).unwrap_err();
        assert_eq!(err, StoreError::Conflict("school name already registered".into()));
    }

    #[test]
    fn contact_emails_are_unique() {
        let reg = InMemoryTenantRegistry::new();
        reg.create(school("Greenfield", "office@school.test")).unwrap();
        assert!(matches!(
            reg.create(school("Riverside", "office@school.test")),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn toggle_through_update() {
        let reg = InMemoryTenantRegistry::new();
        let t = school("Greenfield", "a@greenfield.test");
        let id = t.id();
        reg.create(t).unwrap();

        let updated = reg
            .update(id, &mut |t| {
                t.toggle_active();
                Ok(())
            })
            .unwrap();
        assert!(!updated.is_active());
        assert!(!reg.get(id).unwrap().unwrap().is_active());
        assert_eq!(reg.update(TenantId::new(), &mut |_| Ok(())), Err(StoreError::NotFound));
    }
}
