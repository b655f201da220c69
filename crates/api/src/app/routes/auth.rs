//! Session endpoints. Only identity is required here: a user of an expired
//! school can still see who they are and change their password.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;
use chrono::Utc;

use scholaris_audit::{AuditEntry, AuditModule};
use scholaris_auth::{AuthError, NewPrincipal, Principal, Role, normalize_email};
use scholaris_infra::register_school as provision_school;
use scholaris_tenancy::{NewTenant, Tenant, check_subscription};

use crate::app::dto::{
    self, ApiJson, ChangePasswordRequest, LoginRequest, MeView, MessageView, RegisterSchoolRequest,
    RegistrationView, SchoolRef, SessionView,
};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::middleware::client_ip;

/// Routes reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/register-school", post(register_school))
        .route("/auth/login", post(login))
}

/// Routes needing a session but no tenant gate.
pub fn session_router() -> Router {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/change-password", put(change_password))
}

/// Self-service signup: a school on a trial subscription plus its admin.
pub async fn register_school(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<RegisterSchoolRequest>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let tenant = Tenant::register_trial(
        NewTenant {
            name: req.school_name,
            contact_email: req.email.clone(),
            address: req.address,
            phone_number: req.phone_number,
        },
        now,
    )?;

    let mut admin = Principal::new_member(
        NewPrincipal {
            role: Role::Admin,
            tenant_id: tenant.id(),
            name: req.admin_name,
            email: req.admin_email.unwrap_or(req.email),
            class_id: None,
            password_hash: services.hash_password(&req.admin_password).await?,
        },
        now,
    )?;
    // The registering admin chose this password.
    admin.must_change_password = false;

    let (school, admin) = provision_school(&*services.registry, &*services.directory, tenant, admin)?;
    let token = services.sessions.issue(&admin, now)?;

    tracing::info!(tenant_id = %school.id(), admin_id = %admin.id(), "school registered");
    services.audit.record(
        AuditEntry::new(admin.id(), "Registered School", AuditModule::Auth, Some(school.id()), now)
            .with_details(serde_json::json!({ "schoolName": school.name }))
            .with_ip(client_ip(&headers)),
    );

    Ok(dto::created(RegistrationView { school, admin, token }))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("please provide email and password".into()));
    }
    let now = Utc::now();

    let email = normalize_email(&req.email).map_err(|_| AuthError::InvalidCredentials)?;
    let principal = services
        .directory
        .find_by_email(&email)?
        .ok_or(AuthError::InvalidCredentials)?;
    if !services.verify_password(&req.password, principal.password_hash()).await? {
        tracing::info!(principal_id = %principal.id(), "login rejected: bad password");
        return Err(AuthError::InvalidCredentials.into());
    }

    // Report the school's state rather than a credentials error.
    if let Some(tenant_id) = principal.tenant_id() {
        let tenant = services
            .registry
            .get(tenant_id)?
            .ok_or_else(|| ApiError::not_found("school"))?;
        check_subscription(&principal, &tenant, now)?;
    }

    let token = services.sessions.issue(&principal, now)?;
    services.audit.record(
        AuditEntry::new(principal.id(), "Logged In", AuditModule::Auth, principal.tenant_id(), now)
            .with_ip(client_ip(&headers)),
    );

    Ok(dto::ok(SessionView {
        token,
        must_change_password: principal.must_change_password,
        role: principal.role(),
    }))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    let school = match principal.tenant_id() {
        Some(tenant_id) => services.registry.get(tenant_id)?.map(|t| SchoolRef {
            id: t.id(),
            name: t.name,
        }),
        None => None,
    };
    Ok(dto::ok(MeView { principal, school }))
}

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<Response, ApiError> {
    if !services
        .verify_password(&req.current_password, principal.password_hash())
        .await?
    {
        return Err(ApiError::Authentication("current password is incorrect".into()));
    }
    if req.new_password == req.current_password {
        return Err(ApiError::Validation("new password must differ from the current one".into()));
    }

    let now = Utc::now();
    let hash = services.hash_password(&req.new_password).await?;
    services.directory.update(principal.tenant_id(), principal.id(), &mut |p| {
        p.change_password(hash.clone(), now)
    })?;

    services.audit.record(
        AuditEntry::new(principal.id(), "Changed Password", AuditModule::Auth, principal.tenant_id(), now)
            .with_ip(client_ip(&headers)),
    );
    Ok(dto::ok(MessageView {
        message: "password updated",
    }))
}
