use std::sync::Arc;

use crate::{AuditEntry, AuditSink};

/// Best-effort front for an [`AuditSink`].
#[derive(Clone)]
pub struct AuditTrail {
    sink: Arc<dyn AuditSink>,
}

impl AuditTrail {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &Arc<dyn AuditSink> {
        &self.sink
    }

    /// Append an entry; failures are logged and swallowed.
    pub fn record(&self, entry: AuditEntry) {
        let action = entry.action.clone();
        let module = entry.module;
        if let Err(e) = self.sink.append(entry) {
            tracing::warn!(
                error = %e,
                action = %action,
                module = module.as_str(),
                "audit entry dropped"
            );
        }
    }
}

impl core::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuditTrail").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scholaris_core::{PrincipalId, TenantId};

    use crate::{AuditError, AuditModule, InMemoryAuditLog};

    struct BrokenSink;

    impl AuditSink for BrokenSink {
        fn append(&self, _entry: AuditEntry) -> Result<(), AuditError> {
            Err(AuditError::Unavailable("disk full".into()))
        }

        fn entries(&self, _tenant_id: Option<TenantId>) -> Result<Vec<AuditEntry>, AuditError> {
            Err(AuditError::Unavailable("disk full".into()))
        }
    }

    #[test]
    fn failing_sink_does_not_propagate() {
        let trail = AuditTrail::new(Arc::new(BrokenSink));
        trail.record(AuditEntry::new(
            PrincipalId::new(),
            "Recorded payment",
            AuditModule::Fees,
            None,
            Utc::now(),
        ));
    }

    #[test]
    fn records_with_details() {
        let log = Arc::new(InMemoryAuditLog::new());
        let trail = AuditTrail::new(log.clone());
        let tenant = TenantId::new();

        trail.record(
            AuditEntry::new(PrincipalId::new(), "Created student", AuditModule::UserManagement, Some(tenant), Utc::now())
                .with_details(serde_json::json!({ "email": "sam@school.test" })),
        );

        let entries = log.entries(Some(tenant)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].details["email"], "sam@school.test");
    }
}
