//! Service wiring and the operations shared by several route groups.
//!
//! Every operation takes the caller's [`RequestContext`]; nothing here reads
//! identity or tenant from ambient state.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use scholaris_academics::{AttendanceRecord, ClassGroup, Homework, HomeworkSubmission, Task};
use scholaris_audit::{AuditEntry, AuditModule, AuditTrail, InMemoryAuditLog};
use scholaris_auth::{
    Action, Argon2Hasher, AuthError, CredentialHasher, Hs256Sessions, MutationKind, NewPrincipal,
    Principal, PrincipalUpdate, Role, SessionIssuer, TokenValidator, authorize_create,
    authorize_list, authorize_mutate, check_password_strength, normalize_email,
};
use scholaris_core::{
    AttendanceId, ClassId, HomeworkId, Money, PrincipalId, SubmissionId, TaskId, TenantId,
};
use scholaris_infra::{
    FeeLedger, FeeStore, InMemoryFeeStore, InMemoryPrincipalDirectory, InMemoryTenantRegistry,
    InMemoryTenantStore, PrincipalDirectory, TenantRegistry, TenantStore, enroll_student,
    withdraw_student,
};

use crate::app::dto::{
    AnalyticsView, CreatePrincipalRequest, CreatedPrincipal, UpdatePrincipalRequest, parse_id,
};
use crate::app::errors::ApiError;
use crate::config::{ApiConfig, SuperAdminSeed};
use crate::context::RequestContext;

pub struct AppServices {
    pub registry: Arc<dyn TenantRegistry>,
    pub directory: Arc<dyn PrincipalDirectory>,
    pub ledger: FeeLedger<Arc<dyn FeeStore>>,
    pub classes: Arc<dyn TenantStore<ClassId, ClassGroup>>,
    pub homework: Arc<dyn TenantStore<HomeworkId, Homework>>,
    pub submissions: Arc<dyn TenantStore<SubmissionId, HomeworkSubmission>>,
    pub tasks: Arc<dyn TenantStore<TaskId, Task>>,
    pub attendance: Arc<dyn TenantStore<AttendanceId, AttendanceRecord>>,
    pub audit: AuditTrail,
    pub sessions: Arc<dyn SessionIssuer>,
    pub tokens: Arc<dyn TokenValidator>,
    pub hasher: Arc<dyn CredentialHasher>,
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices").finish_non_exhaustive()
    }
}

impl AppServices {
    /// Process-local stores; state is lost on restart.
    pub fn in_memory(config: &ApiConfig) -> Result<Self, AuthError> {
        let hasher = match config.password_hash_cost {
            Some((memory_kib, iterations)) => Argon2Hasher::new(memory_kib, iterations)?,
            None => Argon2Hasher::default(),
        };
        let sessions = Arc::new(Hs256Sessions::new(config.jwt_secret.as_bytes(), config.token_ttl));
        let fee_store: Arc<dyn FeeStore> = Arc::new(InMemoryFeeStore::new());

        Ok(Self {
            registry: Arc::new(InMemoryTenantRegistry::new()),
            directory: Arc::new(InMemoryPrincipalDirectory::new()),
            ledger: FeeLedger::new(fee_store, config.fee_payment_max_attempts),
            classes: Arc::new(InMemoryTenantStore::new()),
            homework: Arc::new(InMemoryTenantStore::new()),
            submissions: Arc::new(InMemoryTenantStore::new()),
            tasks: Arc::new(InMemoryTenantStore::new()),
            attendance: Arc::new(InMemoryTenantStore::new()),
            audit: AuditTrail::new(Arc::new(InMemoryAuditLog::new())),
            sessions: sessions.clone(),
            tokens: sessions,
            hasher: Arc::new(hasher),
        })
    }

    /// Create the platform superadmin unless an account with that email exists.
    pub async fn seed_superadmin(&self, seed: &SuperAdminSeed, now: DateTime<Utc>) -> Result<Principal, ApiError> {
        let email = normalize_email(&seed.email)?;
        if let Some(existing) = self.directory.find_by_email(&email)? {
            if existing.is_superadmin() {
                return Ok(existing);
            }
            return Err(ApiError::Conflict(format!("{email} is already used by a school account")));
        }

        let hash = self.hash_password(&seed.password).await?;
        let principal = Principal::superadmin(&seed.name, &email, hash, now)?;
        self.directory.insert(principal.clone())?;
        tracing::info!(principal_id = %principal.id(), email = %email, "superadmin seeded");
        Ok(principal)
    }

    /// Strength check, then Argon2 on the blocking pool.
    pub async fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        check_password_strength(password)?;
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))??;
        Ok(hash)
    }

    /// `Ok(false)` on mismatch. Runs on the blocking pool like [`Self::hash_password`].
    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ApiError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| ApiError::Internal(format!("password check task failed: {e}")))??;
        Ok(matches)
    }

    /// Best-effort audit entry attributed to the caller.
    pub fn record_audit(
        &self,
        ctx: &RequestContext,
        action: impl Into<String>,
        module: AuditModule,
        details: serde_json::Value,
    ) {
        self.audit.record(
            AuditEntry::new(
                ctx.actor(),
                action,
                module,
                ctx.effective_tenant().tenant_id(),
                ctx.now(),
            )
            .with_details(details)
            .with_ip(ctx.client_ip()),
        );
    }

    pub fn class_in_tenant(&self, tenant_id: TenantId, class_id: ClassId) -> Result<ClassGroup, ApiError> {
        self.classes
            .get(tenant_id, &class_id)?
            .ok_or_else(|| ApiError::not_found("class"))
    }

    /// Load a member of `tenant_id` holding `role`; anything else is "not found".
    pub fn member_with_role(
        &self,
        tenant_id: TenantId,
        id: PrincipalId,
        role: Role,
    ) -> Result<Principal, ApiError> {
        self.directory
            .get_in_tenant(tenant_id, id)?
            .filter(|p| p.role() == role)
            .ok_or_else(|| ApiError::not_found(role.as_str()))
    }

    /// Create a principal of `role` in the caller's tenant.
    ///
    /// Students are enrolled together with their opening fee account.
    pub async fn create_member(
        &self,
        ctx: &RequestContext,
        role: Role,
        req: CreatePrincipalRequest,
    ) -> Result<CreatedPrincipal, ApiError> {
        ctx.authorize(Action::CreatePrincipal)?;
        authorize_create(ctx.role(), role)?;
        let tenant_id = ctx.tenant_id()?;
        let now = ctx.now();

        let class_id = match (role, req.class_id.as_deref()) {
            (Role::Student, None) => {
                return Err(ApiError::Validation("student must be assigned to a class".into()));
            }
            (Role::Student, Some(raw)) => {
                let class_id: ClassId = parse_id(raw)?;
                self.class_in_tenant(tenant_id, class_id)?;
                Some(class_id)
            }
            _ => None,
        };

        let principal = Principal::new_member(
            NewPrincipal {
                role,
                tenant_id,
                name: req.name,
                email: req.email,
                class_id,
                password_hash: self.hash_password(&req.password).await?,
            },
            now,
        )?;

        let (principal, fee_account) = if role == Role::Student {
            let total = Money::from_minor(req.total_fee.unwrap_or(0));
            let period = req
                .billing_period
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| now.format("%B %Y").to_string());
            let (student, account) =
                enroll_student(&*self.directory, &self.ledger, principal, total, &period, now)?;
            (student, Some(account))
        } else {
            self.directory.insert(principal.clone())?;
            (principal, None)
        };

        tracing::info!(
            tenant_id = %tenant_id,
            principal_id = %principal.id(),
            role = %role,
            created_by = %ctx.actor(),
            "principal created"
        );
        self.record_audit(
            ctx,
            format!("Created {role}: {}", principal.email),
            AuditModule::UserManagement,
            serde_json::json!({ "userId": principal.id() }),
        );

        Ok(CreatedPrincipal {
            principal,
            fee_account,
        })
    }

    /// Members of the caller's tenant holding any of `roles`. Every role must
    /// be listable by the caller.
    pub fn list_members(&self, ctx: &RequestContext, roles: &[Role]) -> Result<Vec<Principal>, ApiError> {
        for role in roles {
            authorize_list(ctx.role(), *role)?;
        }
        Ok(self.directory.list(ctx.tenant_id()?, roles)?)
    }

    pub async fn update_member(
        &self,
        ctx: &RequestContext,
        id: PrincipalId,
        req: UpdatePrincipalRequest,
    ) -> Result<Principal, ApiError> {
        ctx.authorize(Action::UpdatePrincipal)?;
        if req.role.is_some() {
            return Err(ApiError::Validation("role cannot be changed".into()));
        }
        let tenant_id = ctx.tenant_id()?;

        let target = self
            .directory
            .get_in_tenant(tenant_id, id)?
            .ok_or_else(|| ApiError::not_found("user"))?;
        authorize_mutate(ctx.role(), target.role(), MutationKind::Update)?;

        let class_id = match req.class_id.as_deref() {
            Some(raw) => {
                let class_id: ClassId = parse_id(raw)?;
                self.class_in_tenant(tenant_id, class_id)?;
                Some(class_id)
            }
            None => None,
        };
        let password_hash = match req.password.as_deref() {
            Some(p) => Some(self.hash_password(p).await?),
            None => None,
        };
        let update = PrincipalUpdate {
            name: req.name,
            email: req.email,
            class_id,
            password_hash,
        };

        let now = ctx.now();
        let updated = self
            .directory
            .update(Some(tenant_id), id, &mut |p| p.apply_update(update.clone(), now))?;

        self.record_audit(
            ctx,
            format!("Updated {}: {}", updated.role(), updated.email),
            AuditModule::UserManagement,
            serde_json::json!({ "userId": id }),
        );
        Ok(updated)
    }

    /// Delete a member; a student's fee accounts are closed with it.
    pub fn delete_member(&self, ctx: &RequestContext, id: PrincipalId) -> Result<Principal, ApiError> {
        ctx.authorize(Action::DeletePrincipal)?;
        let tenant_id = ctx.tenant_id()?;

        let target = self
            .directory
            .get_in_tenant(tenant_id, id)?
            .ok_or_else(|| ApiError::not_found("user"))?;
        authorize_mutate(ctx.role(), target.role(), MutationKind::Delete)?;

        let removed = match target.role() {
            Role::Student => withdraw_student(&*self.directory, &self.ledger, tenant_id, id)?,
            _ => self.directory.remove(tenant_id, id)?,
        };

        tracing::info!(
            tenant_id = %tenant_id,
            principal_id = %id,
            role = %removed.role(),
            deleted_by = %ctx.actor(),
            "principal deleted"
        );
        self.record_audit(
            ctx,
            format!("Deleted {}: {}", removed.role(), removed.email),
            AuditModule::UserManagement,
            serde_json::json!({ "userId": id }),
        );
        Ok(removed)
    }

    pub fn analytics(&self, tenant_id: TenantId) -> Result<AnalyticsView, ApiError> {
        Ok(AnalyticsView {
            student_count: self.directory.count(tenant_id, Role::Student)?,
            teacher_count: self.directory.count(tenant_id, Role::Teacher)?,
            class_count: self.classes.list(tenant_id)?.len(),
            fees: self.ledger.aggregate(tenant_id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholaris_academics::NewClass;
    use scholaris_tenancy::{EffectiveTenant, SubscriptionStatus};

    fn services() -> AppServices {
        let config = ApiConfig {
            password_hash_cost: Some((8, 1)),
            ..ApiConfig::default()
        };
        AppServices::in_memory(&config).unwrap()
    }

    fn member(svc: &AppServices, role: Role, tenant: TenantId, email: &str, class_id: Option<ClassId>) -> Principal {
        let p = Principal::new_member(
            NewPrincipal {
                role,
                tenant_id: tenant,
                name: "Member".into(),
                email: email.into(),
                class_id,
                password_hash: svc.hasher.hash("secret-pass").unwrap(),
            },
            Utc::now(),
        )
        .unwrap();
        svc.directory.insert(p.clone()).unwrap();
        p
    }

    fn ctx(principal: &Principal) -> RequestContext {
        RequestContext::new(
            principal.clone(),
            EffectiveTenant::Scoped(principal.tenant_id().unwrap()),
            SubscriptionStatus::Active,
            None,
            Utc::now(),
        )
    }

    fn class(svc: &AppServices, tenant: TenantId) -> ClassId {
        let c = ClassGroup::new(
            NewClass {
                tenant_id: tenant,
                name: "Grade 5".into(),
                section: "A".into(),
                homeroom_teacher_id: None,
            },
            Utc::now(),
        )
        .unwrap();
        let id = c.id;
        svc.classes.insert_unique(tenant, id, c, "class", &|_, _| false).unwrap();
        id
    }

    fn create_request(email: &str, class_id: Option<ClassId>) -> CreatePrincipalRequest {
        CreatePrincipalRequest {
            name: "New Person".into(),
            email: email.into(),
            password: "secret-pass".into(),
            role: None,
            class_id: class_id.map(|c| c.to_string()),
            total_fee: Some(500),
            billing_period: Some("2025".into()),
        }
    }

    #[tokio::test]
    async fn student_creation_opens_fee_account_and_audits() {
        let svc = services();
        let t = TenantId::new();
        let staff = member(&svc, Role::Administration, t, "office@school.test", None);
        let class_id = class(&svc, t);

        let created = svc
            .create_member(&ctx(&staff), Role::Student, create_request("kid@school.test", Some(class_id)))
            .await
            .unwrap();

        let account = created.fee_account.unwrap();
        assert_eq!(account.remaining_amount(), Money::from_minor(500));
        assert!(created.principal.must_change_password);

        let entries = svc.audit.sink().entries(Some(t)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "Created student: kid@school.test");
    }

    #[tokio::test]
    async fn student_needs_existing_class_of_same_tenant() {
        let svc = services();
        let t = TenantId::new();
        let staff = member(&svc, Role::Administration, t, "office@school.test", None);

        let err = svc
            .create_member(&ctx(&staff), Role::Student, create_request("kid@school.test", None))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Validation("student must be assigned to a class".into()));

        let foreign = class(&svc, TenantId::new());
        let err = svc
            .create_member(&ctx(&staff), Role::Student, create_request("kid@school.test", Some(foreign)))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::not_found("class"));
    }

    #[tokio::test]
    async fn creation_follows_the_hierarchy() {
        let svc = services();
        let t = TenantId::new();
        let admin = member(&svc, Role::Admin, t, "head@school.test", None);

        assert!(
            svc.create_member(&ctx(&admin), Role::Administration, create_request("a@school.test", None))
                .await
                .is_ok()
        );
        let err = svc
            .create_member(&ctx(&admin), Role::Teacher, create_request("t@school.test", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Authorization(_)));
    }

    #[test]
    fn administration_cannot_delete_admin() {
        let svc = services();
        let t = TenantId::new();
        let admin = member(&svc, Role::Admin, t, "head@school.test", None);
        let staff = member(&svc, Role::Administration, t, "office@school.test", None);

        let err = svc.delete_member(&ctx(&staff), admin.id()).unwrap_err();
        assert!(matches!(err, ApiError::Authorization(_)));
        assert!(svc.directory.get(admin.id()).unwrap().is_some());
    }

    #[test]
    fn members_of_other_tenants_are_not_found() {
        let svc = services();
        let staff = member(&svc, Role::Administration, TenantId::new(), "office@a.test", None);
        let outsider = member(&svc, Role::Teacher, TenantId::new(), "t@b.test", None);

        let err = svc.delete_member(&ctx(&staff), outsider.id()).unwrap_err();
        assert_eq!(err, ApiError::not_found("user"));
    }

    #[tokio::test]
    async fn role_changes_are_refused() {
        let svc = services();
        let t = TenantId::new();
        let staff = member(&svc, Role::Administration, t, "office@school.test", None);
        let teacher = member(&svc, Role::Teacher, t, "t@school.test", None);

        let req = UpdatePrincipalRequest {
            name: None,
            email: None,
            class_id: None,
            password: None,
            role: Some(serde_json::json!("admin")),
        };
        let err = svc.update_member(&ctx(&staff), teacher.id(), req).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(svc.directory.get(teacher.id()).unwrap().unwrap().role(), Role::Teacher);
    }

    #[tokio::test]
    async fn deleting_a_student_closes_fee_accounts() {
        let svc = services();
        let t = TenantId::new();
        let staff = member(&svc, Role::Administration, t, "office@school.test", None);
        let class_id = class(&svc, t);
        let created = svc
            .create_member(&ctx(&staff), Role::Student, create_request("kid@school.test", Some(class_id)))
            .await
            .unwrap();

        svc.delete_member(&ctx(&staff), created.principal.id()).unwrap();
        assert!(svc.ledger.accounts(t).unwrap().is_empty());
        assert_eq!(svc.analytics(t).unwrap().student_count, 0);
    }

    #[tokio::test]
    async fn superadmin_seed_is_idempotent() {
        let svc = services();
        let seed = SuperAdminSeed {
            name: "Root".into(),
            email: "Root@Platform.test".into(),
            password: "root-password".into(),
        };
        let first = svc.seed_superadmin(&seed, Utc::now()).await.unwrap();
        let second = svc.seed_superadmin(&seed, Utc::now()).await.unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(first.email, "root@platform.test");
    }

    #[tokio::test]
    async fn password_checks_run_on_the_blocking_pool() {
        let svc = services();
        let hash = svc.hash_password("correct-horse").await.unwrap();
        assert!(svc.verify_password("correct-horse", &hash).await.unwrap());
        assert!(!svc.verify_password("wrong-horse", &hash).await.unwrap());

        let err = svc.hash_password("abc").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
