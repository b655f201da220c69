//! A teacher's own homework, submissions, tasks and classes.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;

use scholaris_academics::{Homework, NewHomework};
use scholaris_auth::Action;
use scholaris_core::{ClassId, HomeworkId, SubmissionId, TaskId, TenantId};

use crate::app::dto::{
    self, ApiJson, AssignHomeworkRequest, GradeSubmissionRequest, PersonRef, SubmissionRow, parse_id,
};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/homework", post(assign_homework).get(list_homework))
        .route("/homework/:homeworkId/submissions", get(list_submissions))
        .route("/submissions/:submissionId/grade", put(grade_submission))
        .route("/tasks", get(list_tasks))
        .route("/tasks/:id/complete", put(complete_task))
        .route("/classes", get(list_classes))
}

/// Homework of the calling teacher; anyone else's is "not found".
fn own_homework(
    services: &AppServices,
    ctx: &RequestContext,
    tenant_id: TenantId,
    id: HomeworkId,
) -> Result<Homework, ApiError> {
    services
        .homework
        .get(tenant_id, &id)?
        .filter(|h| h.teacher_id == ctx.actor())
        .ok_or_else(|| ApiError::not_found("homework"))
}

pub async fn assign_homework(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<AssignHomeworkRequest>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::AssignHomework)?;
    let tenant_id = ctx.tenant_id()?;
    let class_id: ClassId = parse_id(&req.class_id)?;

    let class = services.class_in_tenant(tenant_id, class_id)?;
    if !class.is_homeroom_of(ctx.actor()) {
        return Err(ApiError::Authorization(
            "only the class teacher can assign homework to this class".into(),
        ));
    }

    let homework = Homework::assign(
        NewHomework {
            tenant_id,
            class_id,
            teacher_id: ctx.actor(),
            title: req.title,
            description: req.description,
            due_date: req.due_date,
        },
        ctx.now(),
    )?;
    services
        .homework
        .insert_unique(tenant_id, homework.id, homework.clone(), "homework", &|_, _| false)?;

    tracing::info!(tenant_id = %tenant_id, homework_id = %homework.id, class_id = %class_id, "homework assigned");
    Ok(dto::created(homework))
}

pub async fn list_homework(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ListOwnHomework)?;
    let mut homework: Vec<Homework> = services
        .homework
        .list(ctx.tenant_id()?)?
        .into_iter()
        .filter(|h| h.teacher_id == ctx.actor())
        .collect();
    homework.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(dto::ok(homework))
}

/// Submissions for one of the caller's homework, newest first.
pub async fn list_submissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(homework_id): Path<String>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ListHomeworkSubmissions)?;
    let tenant_id = ctx.tenant_id()?;
    let homework = own_homework(&services, &ctx, tenant_id, parse_id(&homework_id)?)?;

    let mut submissions: Vec<_> = services
        .submissions
        .list(tenant_id)?
        .into_iter()
        .filter(|s| s.homework_id == homework.id)
        .collect();
    submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

    let mut rows = Vec::with_capacity(submissions.len());
    for submission in submissions {
        let student = services.directory.get_in_tenant(tenant_id, submission.student_id)?;
        rows.push(SubmissionRow {
            student: student.as_ref().map(PersonRef::from),
            submission,
        });
    }
    Ok(dto::ok(rows))
}

pub async fn grade_submission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(submission_id): Path<String>,
    ApiJson(req): ApiJson<GradeSubmissionRequest>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::GradeSubmission)?;
    let tenant_id = ctx.tenant_id()?;
    let submission_id: SubmissionId = parse_id(&submission_id)?;

    let submission = services
        .submissions
        .get(tenant_id, &submission_id)?
        .ok_or_else(|| ApiError::not_found("submission"))?;
    own_homework(&services, &ctx, tenant_id, submission.homework_id)
        .map_err(|_| ApiError::not_found("submission"))?;

    let graded = services.submissions.update(tenant_id, &submission_id, &mut |s| {
        s.grade(&req.grade, req.feedback.clone())
    })?;

    tracing::info!(tenant_id = %tenant_id, submission_id = %submission_id, "submission graded");
    Ok(dto::ok(graded))
}

pub async fn list_tasks(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ListOwnTasks)?;
    let mut tasks: Vec<_> = services
        .tasks
        .list(ctx.tenant_id()?)?
        .into_iter()
        .filter(|t| t.assigned_to == ctx.actor())
        .collect();
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(dto::ok(tasks))
}

pub async fn complete_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::CompleteTask)?;
    let tenant_id = ctx.tenant_id()?;
    let task_id: TaskId = parse_id(&id)?;
    let not_assigned = || ApiError::NotFound("task not found or not assigned to you".into());

    services
        .tasks
        .get(tenant_id, &task_id)?
        .filter(|t| t.assigned_to == ctx.actor())
        .ok_or_else(not_assigned)?;

    let now = ctx.now();
    let task = services
        .tasks
        .update(tenant_id, &task_id, &mut |t| t.complete(ctx.actor(), now))?;
    Ok(dto::ok(task))
}

/// Classes the caller is homeroom teacher of.
pub async fn list_classes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ListOwnClasses)?;
    let mut classes: Vec<_> = services
        .classes
        .list(ctx.tenant_id()?)?
        .into_iter()
        .filter(|c| c.is_homeroom_of(ctx.actor()))
        .collect();
    classes.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.section.cmp(&b.section)));
    Ok(dto::ok(classes))
}
