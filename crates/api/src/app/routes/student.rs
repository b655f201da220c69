//! A student's homework, submissions and fees.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;

use scholaris_academics::{Homework, HomeworkSubmission};
use scholaris_auth::Action;
use scholaris_core::{DomainError, HomeworkId};

use crate::app::dto::{self, ApiJson, StudentFeesView, SubmitHomeworkRequest, parse_id};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/homework", get(list_homework))
        .route("/homework/:homeworkId/submit", post(submit_homework))
        .route("/submissions", get(list_submissions))
        .route("/fees", get(my_fees))
}

/// Homework of the caller's class, soonest due first.
pub async fn list_homework(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ListClassHomework)?;
    let class_id = ctx.principal().class_id;
    let mut homework: Vec<Homework> = services
        .homework
        .list(ctx.tenant_id()?)?
        .into_iter()
        .filter(|h| Some(h.class_id) == class_id)
        .collect();
    homework.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    Ok(dto::ok(homework))
}

pub async fn submit_homework(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(homework_id): Path<String>,
    ApiJson(req): ApiJson<SubmitHomeworkRequest>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::SubmitHomework)?;
    let tenant_id = ctx.tenant_id()?;
    let homework_id: HomeworkId = parse_id(&homework_id)?;

    let homework = services
        .homework
        .get(tenant_id, &homework_id)?
        .ok_or_else(|| ApiError::not_found("homework"))?;
    let submission = HomeworkSubmission::submit(
        &homework,
        ctx.actor(),
        ctx.principal().class_id,
        &req.submission_text,
        ctx.now(),
    )
    .map_err(|e| match e {
        DomainError::NotFound => ApiError::not_found("homework"),
        other => other.into(),
    })?;

    services.submissions.insert_unique(
        tenant_id,
        submission.id,
        submission.clone(),
        "submission for this homework",
        &|a, b| a.homework_id == b.homework_id && a.student_id == b.student_id,
    )?;

    tracing::info!(
        tenant_id = %tenant_id,
        homework_id = %homework_id,
        student_id = %ctx.actor(),
        status = ?submission.status,
        "homework submitted"
    );
    Ok(dto::created(submission))
}

pub async fn list_submissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ListOwnSubmissions)?;
    let mut submissions: Vec<_> = services
        .submissions
        .list(ctx.tenant_id()?)?
        .into_iter()
        .filter(|s| s.student_id == ctx.actor())
        .collect();
    submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    Ok(dto::ok(submissions))
}

/// Current fee account and payment history; both empty before enrollment
/// opened an account.
pub async fn my_fees(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ViewOwnFees)?;
    let view = match services.ledger.statement(ctx.tenant_id()?, ctx.actor())? {
        Some(statement) => StudentFeesView {
            fee: Some(statement.account),
            payment_history: statement.payments,
        },
        None => StudentFeesView {
            fee: None,
            payment_history: Vec::new(),
        },
    };
    Ok(dto::ok(view))
}
