use chrono::{DateTime, Utc};

use scholaris_auth::{Action, Principal, Role, authorize_action};
use scholaris_core::{PrincipalId, TenantId};
use scholaris_tenancy::{EffectiveTenant, IsolationError, SubscriptionStatus};

use crate::app::errors::ApiError;

/// Everything a handler knows about the caller, fixed by the gate pipeline.
///
/// Built once per request after identity, isolation and subscription have
/// passed; handlers receive it explicitly and pass it down.
#[derive(Debug, Clone)]
pub struct RequestContext {
    principal: Principal,
    tenant: EffectiveTenant,
    subscription: SubscriptionStatus,
    client_ip: Option<String>,
    now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(
        principal: Principal,
        tenant: EffectiveTenant,
        subscription: SubscriptionStatus,
        client_ip: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            principal,
            tenant,
            subscription,
            client_ip,
            now,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn actor(&self) -> PrincipalId {
        self.principal.id()
    }

    pub fn role(&self) -> Role {
        self.principal.role()
    }

    pub fn effective_tenant(&self) -> EffectiveTenant {
        self.tenant
    }

    /// The bound tenant; tenant-scoped handlers fail closed without one.
    pub fn tenant_id(&self) -> Result<TenantId, ApiError> {
        self.tenant
            .tenant_id()
            .ok_or_else(|| IsolationError::MissingTenant.into())
    }

    pub fn subscription(&self) -> SubscriptionStatus {
        self.subscription
    }

    pub fn client_ip(&self) -> Option<String> {
        self.client_ip.clone()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn authorize(&self, action: Action) -> Result<(), ApiError> {
        authorize_action(self.role(), action).map_err(ApiError::from)
    }
}
