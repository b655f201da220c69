//! Tenant-isolated key/value storage for academic records.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use scholaris_core::{DomainError, TenantId};

use crate::StoreError;

/// Every operation takes the tenant; a key from another tenant is invisible.
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, StoreError>;

    /// Insert unless an existing record of the tenant `clashes` with the new one.
    /// `what` names the record in the conflict message.
    fn insert_unique(
        &self,
        tenant_id: TenantId,
        key: K,
        value: V,
        what: &str,
        clashes: &dyn Fn(&V, &V) -> bool,
    ) -> Result<(), StoreError>;

    /// Mutate in place under the write lock. A rejected mutation leaves the
    /// record untouched.
    fn update(
        &self,
        tenant_id: TenantId,
        key: &K,
        mutate: &mut dyn FnMut(&mut V) -> Result<(), DomainError>,
    ) -> Result<V, StoreError>;

    fn remove(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, StoreError>;

    fn list(&self, tenant_id: TenantId) -> Result<Vec<V>, StoreError>;
}

impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    S: TenantStore<K, V> + ?Sized,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, StoreError> {
        (**self).get(tenant_id, key)
    }

    fn insert_unique(
        &self,
        tenant_id: TenantId,
        key: K,
        value: V,
        what: &str,
        clashes: &dyn Fn(&V, &V) -> bool,
    ) -> Result<(), StoreError> {
        (**self).insert_unique(tenant_id, key, value, what, clashes)
    }

    fn update(
        &self,
        tenant_id: TenantId,
        key: &K,
        mutate: &mut dyn FnMut(&mut V) -> Result<(), DomainError>,
    ) -> Result<V, StoreError> {
        (**self).update(tenant_id, key, mutate)
    }

    fn remove(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, StoreError> {
        (**self).remove(tenant_id, key)
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<V>, StoreError> {
        (**self).list(tenant_id)
    }
}

#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    inner: RwLock<HashMap<(TenantId, K), V>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, StoreError> {
        let map = self.inner.read()?;
        Ok(map.get(&(tenant_id, key.clone())).cloned())
    }

    fn insert_unique(
        &self,
        tenant_id: TenantId,
        key: K,
        value: V,
        what: &str,
        clashes: &dyn Fn(&V, &V) -> bool,
    ) -> Result<(), StoreError> {
        let mut map = self.inner.write()?;
        let taken = map
            .iter()
            .any(|((t, k), v)| *t == tenant_id && (*k == key || clashes(v, &value)));
        if taken {
            return Err(StoreError::Conflict(format!("{what} already exists")));
        }
        map.insert((tenant_id, key), value);
        Ok(())
    }

    fn update(
        &self,
        tenant_id: TenantId,
        key: &K,
        mutate: &mut dyn FnMut(&mut V) -> Result<(), DomainError>,
    ) -> Result<V, StoreError> {
        let mut map = self.inner.write()?;
        let slot = map
            .get_mut(&(tenant_id, key.clone()))
            .ok_or(StoreError::NotFound)?;

        let mut draft = slot.clone();
        mutate(&mut draft)?;
        *slot = draft.clone();
        Ok(draft)
    }

    fn remove(&self, tenant_id: TenantId, key: &K) -> Result<Option<V>, StoreError> {
        let mut map = self.inner.write()?;
        Ok(map.remove(&(tenant_id, key.clone())))
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<V>, StoreError> {
        let map = self.inner.read()?;
        Ok(map
            .iter()
            .filter_map(|((t, _k), v)| if *t == tenant_id { Some(v.clone()) } else { None })
            .collect())
    }
}
