//! Request bodies, response views and the JSON envelope.

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use scholaris_academics::{AttendanceRecord, AttendanceSummary, HomeworkSubmission};
use scholaris_auth::Principal;
use scholaris_core::{DomainError, PrincipalId, TenantId};
use scholaris_fees::{FeeAccount, FeeAggregate, FeePayment};
use scholaris_tenancy::Tenant;

use crate::app::errors::ApiError;

// -------------------------
// Envelope
// -------------------------

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(Envelope { success: true, data })).into_response()
}

pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(Envelope { success: true, data })).into_response()
}

/// `axum::Json` with rejections rendered through [`ApiError`].
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// `axum::extract::Query` with rejections rendered through [`ApiError`].
pub struct ApiQuery<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;
        Ok(ApiQuery(value))
    }
}

pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(ApiError::from)
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSchoolRequest {
    pub school_name: String,
    pub address: String,
    pub phone_number: String,
    pub email: String,
    pub admin_name: String,
    /// Defaults to the school's contact email.
    pub admin_email: Option<String>,
    pub admin_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchoolRequest {
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone_number: String,
    pub subscription_end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub school_id: TenantId,
}

#[derive(Debug, Deserialize)]
pub struct RenewSubscriptionRequest {
    pub days: i64,
}

/// Body of every principal-creation route. `role` is ignored where the
/// route fixes it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrincipalRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub class_id: Option<String>,
    /// Opening fee balance for a student, in minor units.
    pub total_fee: Option<i64>,
    #[serde(alias = "feeMonth")]
    pub billing_period: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePrincipalRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub class_id: Option<String>,
    pub password: Option<String>,
    /// Present only to be refused.
    pub role: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleQuery {
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassRequest {
    pub name: String,
    pub section: String,
    pub teacher_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTaskRequest {
    pub title: String,
    pub description: String,
    pub teacher_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    /// Minor units.
    pub amount: i64,
    pub payment_method: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    pub user_id: String,
    #[serde(default)]
    pub status: scholaris_academics::AttendanceStatus,
    /// Defaults to today (UTC).
    pub date: Option<NaiveDate>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignHomeworkRequest {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub class_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitHomeworkRequest {
    pub submission_text: String,
}

#[derive(Debug, Deserialize)]
pub struct GradeSubmissionRequest {
    pub grade: String,
    pub feedback: Option<String>,
}

// -------------------------
// Response views
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub token: String,
    pub must_change_password: bool,
    pub role: scholaris_auth::Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonRef {
    pub id: PrincipalId,
    pub name: String,
    pub email: String,
}

impl From<&Principal> for PersonRef {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.id(),
            name: p.name.clone(),
            email: p.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SchoolRef {
    pub id: TenantId,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct MeView {
    #[serde(flatten)]
    pub principal: Principal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<SchoolRef>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPrincipal {
    #[serde(flatten)]
    pub principal: Principal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_account: Option<FeeAccount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsView {
    pub student_count: usize,
    pub teacher_count: usize,
    pub class_count: usize,
    pub fees: FeeAggregate,
}

#[derive(Debug, Serialize)]
pub struct FeeReportRow {
    #[serde(flatten)]
    pub account: FeeAccount,
    pub student: Option<PersonRef>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub payment: FeePayment,
    pub updated_fee: FeeAccount,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFeesView {
    pub fee: Option<FeeAccount>,
    pub payment_history: Vec<FeePayment>,
}

#[derive(Debug, Serialize)]
pub struct HealthView {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RegistrationView {
    pub school: Tenant,
    pub admin: Principal,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SubmissionRow {
    #[serde(flatten)]
    pub submission: HomeworkSubmission,
    pub student: Option<PersonRef>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceReport {
    pub records: Vec<AttendanceRecord>,
    pub summary: AttendanceSummary,
}
