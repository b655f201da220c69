use std::sync::RwLock;

use thiserror::Error;

use scholaris_core::TenantId;

use crate::AuditEntry;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Append-only destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError>;

    /// Entries for one tenant (or platform-level entries when `None`), oldest first.
    fn entries(&self, tenant_id: Option<TenantId>) -> Result<Vec<AuditEntry>, AuditError>;
}

/// In-process sink. Entries are never updated or removed.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditSink for InMemoryAuditLog {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuditError::Unavailable("audit log lock poisoned".into()))?;
        entries.push(entry);
        Ok(())
    }

    fn entries(&self, tenant_id: Option<TenantId>) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AuditError::Unavailable("audit log lock poisoned".into()))?;
        Ok(entries
            .iter()
            .filter(|e| e.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuditModule;
    use chrono::Utc;
    use scholaris_core::PrincipalId;

    #[test]
    fn entries_are_filtered_by_tenant() {
        let log = InMemoryAuditLog::new();
        let t1 = TenantId::new();
        let actor = PrincipalId::new();

        log.append(AuditEntry::new(actor, "a", AuditModule::Fees, Some(t1), Utc::now()))
            .unwrap();
        log.append(AuditEntry::new(actor, "b", AuditModule::Fees, Some(TenantId::new()), Utc::now()))
            .unwrap();
        log.append(AuditEntry::new(actor, "c", AuditModule::SuperAdmin, None, Utc::now()))
            .unwrap();

        let own: Vec<_> = log.entries(Some(t1)).unwrap().into_iter().map(|e| e.action).collect();
        assert_eq!(own, vec!["a".to_string()]);
        assert_eq!(log.entries(None).unwrap().len(), 1);
    }
}
