//! Platform operator endpoints. Tenants are managed here, never deleted.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::response::Response;
use axum::routing::{patch, post};
use axum::Router;

use scholaris_audit::AuditModule;
use scholaris_auth::{Action, NewPrincipal, Principal, Role, authorize_create};
use scholaris_core::TenantId;
use scholaris_infra::StoreError;
use scholaris_tenancy::{NewTenant, Tenant};

use crate::app::dto::{self, ApiJson, CreateAdminRequest, CreateSchoolRequest, RenewSubscriptionRequest, parse_id};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/schools", post(create_school).get(list_schools))
        .route("/create-admin", post(create_admin))
        .route("/schools/:id/toggle", patch(toggle_school))
        .route("/schools/:id/subscription", patch(renew_subscription))
}

fn school_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound => ApiError::not_found("school"),
        other => other.into(),
    }
}

pub async fn create_school(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<CreateSchoolRequest>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::CreateTenant)?;

    let tenant = Tenant::new(
        NewTenant {
            name: req.name,
            contact_email: req.email,
            address: req.address,
            phone_number: req.phone_number,
        },
        req.subscription_end,
        ctx.now(),
    )?;
    services.registry.create(tenant.clone())?;

    tracing::info!(tenant_id = %tenant.id(), created_by = %ctx.actor(), "school created");
    services.record_audit(
        &ctx,
        "Created School",
        AuditModule::SuperAdmin,
        serde_json::json!({ "schoolId": tenant.id(), "name": tenant.name }),
    );
    Ok(dto::created(tenant))
}

pub async fn list_schools(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ListTenants)?;
    Ok(dto::ok(services.registry.list()?))
}

pub async fn create_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<CreateAdminRequest>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::CreateTenantAdmin)?;
    authorize_create(ctx.role(), Role::Admin)?;

    let school = services
        .registry
        .get(req.school_id)?
        .ok_or_else(|| ApiError::not_found("school"))?;

    let admin = Principal::new_member(
        NewPrincipal {
            role: Role::Admin,
            tenant_id: school.id(),
            name: req.name,
            email: req.email,
            class_id: None,
            password_hash: services.hash_password(&req.password).await?,
        },
        ctx.now(),
    )?;
    services.directory.insert(admin.clone())?;

    tracing::info!(tenant_id = %school.id(), admin_id = %admin.id(), "school admin created");
    services.record_audit(
        &ctx,
        "Created School Admin",
        AuditModule::SuperAdmin,
        serde_json::json!({ "adminId": admin.id(), "email": admin.email }),
    );
    Ok(dto::created(admin))
}

pub async fn toggle_school(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ToggleTenant)?;
    let id: TenantId = parse_id(&id)?;

    let mut now_active = false;
    let school = services
        .registry
        .update(id, &mut |t| {
            now_active = t.toggle_active();
            Ok(())
        })
        .map_err(school_error)?;

    tracing::info!(tenant_id = %id, active = now_active, "school status toggled");
    services.record_audit(
        &ctx,
        format!("Toggled School Status: {now_active}"),
        AuditModule::SuperAdmin,
        serde_json::json!({ "schoolId": id }),
    );
    Ok(dto::ok(school))
}

pub async fn renew_subscription(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RenewSubscriptionRequest>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::RenewSubscription)?;
    let id: TenantId = parse_id(&id)?;
    let now = ctx.now();

    let school = services
        .registry
        .update(id, &mut |t| t.renew(req.days, now))
        .map_err(school_error)?;

    tracing::info!(
        tenant_id = %id,
        days = req.days,
        subscription_end = %school.subscription_end,
        "subscription renewed"
    );
    services.record_audit(
        &ctx,
        "Renewed Subscription",
        AuditModule::SuperAdmin,
        serde_json::json!({ "schoolId": id, "days": req.days }),
    );
    Ok(dto::ok(school))
}
