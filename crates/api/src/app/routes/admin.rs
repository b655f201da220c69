//! School administration by the admin (and, for users/classes, the
//! administration office).

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;

use scholaris_academics::{ClassGroup, NewClass};
use scholaris_auth::{Action, Role, listable_roles};
use scholaris_core::PrincipalId;

use crate::app::dto::{
    self, ApiJson, ApiQuery, CreateClassRequest, CreatePrincipalRequest, RoleQuery,
    UpdatePrincipalRequest, parse_id,
};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/users/:id", put(update_user).delete(delete_user))
        .route("/classes", post(create_class).get(list_classes))
        .route("/analytics", get(analytics))
        .route("/schools/:schoolId/analytics", get(analytics))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<CreatePrincipalRequest>,
) -> Result<Response, ApiError> {
    let role: Role = match req.role.as_deref() {
        Some(raw) => parse_id(raw)?,
        None => return Err(ApiError::Validation("role is required".into())),
    };
    let created = services.create_member(&ctx, role, req).await?;
    Ok(dto::created(created))
}

/// `?role=` narrows to one role; otherwise every role the caller may list.
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ApiQuery(query): ApiQuery<RoleQuery>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ListPrincipals)?;
    let roles = match query.role.as_deref() {
        Some(raw) => vec![parse_id::<Role>(raw)?],
        None => listable_roles(ctx.role()).to_vec(),
    };
    Ok(dto::ok(services.list_members(&ctx, &roles)?))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePrincipalRequest>,
) -> Result<Response, ApiError> {
    let id: PrincipalId = parse_id(&id)?;
    Ok(dto::ok(services.update_member(&ctx, id, req).await?))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: PrincipalId = parse_id(&id)?;
    Ok(dto::ok(services.delete_member(&ctx, id)?))
}

pub async fn create_class(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<CreateClassRequest>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::CreateClass)?;
    let tenant_id = ctx.tenant_id()?;

    let homeroom_teacher_id = match req.teacher_id.as_deref() {
        Some(raw) => {
            let id: PrincipalId = parse_id(raw)?;
            Some(services.member_with_role(tenant_id, id, Role::Teacher)?.id())
        }
        None => None,
    };

    let class = ClassGroup::new(
        NewClass {
            tenant_id,
            name: req.name,
            section: req.section,
            homeroom_teacher_id,
        },
        ctx.now(),
    )?;
    services
        .classes
        .insert_unique(tenant_id, class.id, class.clone(), "class", &|a, b| a.same_slot(b))?;

    tracing::info!(tenant_id = %tenant_id, class_id = %class.id, "class created");
    Ok(dto::created(class))
}

pub async fn list_classes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ListClasses)?;
    let mut classes = services.classes.list(ctx.tenant_id()?)?;
    classes.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.section.cmp(&b.section)));
    Ok(dto::ok(classes))
}

/// Counts and fee totals of the caller's school. The `:schoolId` form has
/// already been matched against the caller by the tenant gate.
pub async fn analytics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ViewAnalytics)?;
    Ok(dto::ok(services.analytics(ctx.tenant_id()?)?))
}
