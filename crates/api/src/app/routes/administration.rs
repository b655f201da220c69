//! The administration office: staff and students, fees, attendance.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;

use scholaris_academics::{
    AttendanceFilter, AttendanceRecord, AttendanceSummary, MarkAttendance, NewTask, Task,
};
use scholaris_audit::AuditModule;
use scholaris_auth::{Action, Role};
use scholaris_core::{Money, PrincipalId};
use scholaris_fees::PaymentMethod;
use scholaris_infra::PaymentRequest;

use crate::app::dto::{
    self, ApiJson, ApiQuery, AssignTaskRequest, AttendanceReport, CreatePrincipalRequest,
    FeeReportRow, MarkAttendanceRequest, PaymentReceipt, PersonRef, RecordPaymentRequest, parse_id,
};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/create-teacher", post(create_teacher))
        .route("/create-student", post(create_student))
        .route("/teachers", get(list_teachers))
        .route("/students", get(list_students))
        .route("/staff", get(list_staff))
        .route("/tasks", post(assign_task))
        .route("/fees/:studentId/pay", post(record_payment))
        .route("/fee-reports", get(fee_reports))
        .route("/attendance", post(mark_attendance))
        .route("/attendance-report", get(attendance_report))
}

pub async fn create_teacher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<CreatePrincipalRequest>,
) -> Result<Response, ApiError> {
    Ok(dto::created(services.create_member(&ctx, Role::Teacher, req).await?))
}

pub async fn create_student(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<CreatePrincipalRequest>,
) -> Result<Response, ApiError> {
    Ok(dto::created(services.create_member(&ctx, Role::Student, req).await?))
}

pub async fn list_teachers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ListStaff)?;
    Ok(dto::ok(services.list_members(&ctx, &[Role::Teacher])?))
}

pub async fn list_students(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ListStaff)?;
    Ok(dto::ok(services.list_members(&ctx, &[Role::Student])?))
}

/// Teachers and administration colleagues.
pub async fn list_staff(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ListStaff)?;
    let staff = services
        .directory
        .list(ctx.tenant_id()?, &[Role::Teacher, Role::Administration])?;
    Ok(dto::ok(staff))
}

pub async fn assign_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<AssignTaskRequest>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::AssignTask)?;
    let tenant_id = ctx.tenant_id()?;
    let teacher_id: PrincipalId = parse_id(&req.teacher_id)?;
    services.member_with_role(tenant_id, teacher_id, Role::Teacher)?;

    let task = Task::assign(
        NewTask {
            tenant_id,
            title: req.title,
            description: req.description,
            assigned_to: teacher_id,
            assigned_by: ctx.actor(),
        },
        ctx.now(),
    )?;
    services
        .tasks
        .insert_unique(tenant_id, task.id, task.clone(), "task", &|_, _| false)?;

    tracing::info!(tenant_id = %tenant_id, task_id = %task.id, teacher_id = %teacher_id, "task assigned");
    Ok(dto::created(task))
}

pub async fn record_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(student_id): Path<String>,
    ApiJson(req): ApiJson<RecordPaymentRequest>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::RecordFeePayment)?;
    let tenant_id = ctx.tenant_id()?;
    let student_id: PrincipalId = parse_id(&student_id)?;
    services.member_with_role(tenant_id, student_id, Role::Student)?;

    let method = req
        .payment_method
        .as_deref()
        .map(str::parse::<PaymentMethod>)
        .transpose()?
        .unwrap_or_default();
    let amount = Money::from_minor(req.amount);

    let (payment, updated_fee) = services.ledger.record_payment(
        PaymentRequest {
            tenant_id,
            student_id,
            amount,
            method,
            note: req.note,
            recorded_by: ctx.actor(),
        },
        ctx.now(),
    )?;

    services.record_audit(
        &ctx,
        "Recorded Fee Payment",
        AuditModule::Fees,
        serde_json::json!({
            "studentId": student_id,
            "paymentId": payment.id,
            "amount": amount.minor(),
        }),
    );
    Ok(dto::created(PaymentReceipt { payment, updated_fee }))
}

/// Every fee account of the school with its student.
pub async fn fee_reports(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ViewFeeReports)?;
    let tenant_id = ctx.tenant_id()?;

    let mut rows = Vec::new();
    for account in services.ledger.accounts(tenant_id)? {
        let student = match account.student_id() {
            Some(id) => services.directory.get_in_tenant(tenant_id, id)?,
            None => None,
        };
        rows.push(FeeReportRow {
            student: student.as_ref().map(PersonRef::from),
            account,
        });
    }
    Ok(dto::ok(rows))
}

pub async fn mark_attendance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<MarkAttendanceRequest>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::RecordAttendance)?;
    let tenant_id = ctx.tenant_id()?;
    let user_id: PrincipalId = parse_id(&req.user_id)?;
    let attendee = services
        .directory
        .get_in_tenant(tenant_id, user_id)?
        .ok_or_else(|| ApiError::not_found("user"))?;

    let record = AttendanceRecord::mark(
        MarkAttendance {
            tenant_id,
            principal_id: user_id,
            principal_role: attendee.role(),
            principal_class: attendee.class_id,
            status: req.status,
            date: req.date.unwrap_or_else(|| ctx.now().date_naive()),
            note: req.note,
            recorded_by: ctx.actor(),
        },
        ctx.now(),
    )?;
    services.attendance.insert_unique(
        tenant_id,
        record.id,
        record.clone(),
        "attendance record for this date",
        &|a, b| a.same_day_as(b),
    )?;

    Ok(dto::created(record))
}

/// Filtered records (newest first) with per-status totals.
pub async fn attendance_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ApiQuery(filter): ApiQuery<AttendanceFilter>,
) -> Result<Response, ApiError> {
    ctx.authorize(Action::ViewAttendanceReport)?;
    filter.validate()?;

    let mut records: Vec<AttendanceRecord> = services
        .attendance
        .list(ctx.tenant_id()?)?
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect();
    records.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.created_at.cmp(&a.created_at)));

    let summary = AttendanceSummary::from_records(&records);
    Ok(dto::ok(AttendanceReport { records, summary }))
}
