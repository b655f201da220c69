use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scholaris_core::{AuditEntryId, PrincipalId, TenantId};

/// Functional area an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditModule {
    Auth,
    SuperAdmin,
    UserManagement,
    Fees,
    Academics,
}

impl AuditModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditModule::Auth => "auth",
            AuditModule::SuperAdmin => "super_admin",
            AuditModule::UserManagement => "user_management",
            AuditModule::Fees => "fees",
            AuditModule::Academics => "academics",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: AuditEntryId,
    #[serde(rename = "userId")]
    pub actor: PrincipalId,
    pub action: String,
    pub module: AuditModule,
    #[serde(rename = "schoolId", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: PrincipalId,
        action: impl Into<String>,
        module: AuditModule,
        tenant_id: Option<TenantId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            actor,
            action: action.into(),
            module,
            tenant_id,
            details: serde_json::Value::Null,
            ip_address: None,
            recorded_at: now,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }
}
