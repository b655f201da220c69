use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use scholaris_auth::Role;
use scholaris_core::{AttendanceId, ClassId, DomainError, PrincipalId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendeeRole {
    Student,
    Teacher,
}

impl TryFrom<Role> for AttendeeRole {
    type Error = DomainError;

    fn try_from(role: Role) -> Result<Self, Self::Error> {
        match role {
            Role::Student => Ok(AttendeeRole::Student),
            Role::Teacher => Ok(AttendeeRole::Teacher),
            other => Err(DomainError::validation(format!(
                "attendance is only recorded for students and teachers, not {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    Late,
    HalfDay,
}

/// One day's attendance for one principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    #[serde(rename = "schoolId")]
    pub tenant_id: TenantId,
    #[serde(rename = "userId")]
    pub principal_id: PrincipalId,
    pub role: AttendeeRole,
    pub status: AttendanceStatus,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<ClassId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub recorded_by: PrincipalId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MarkAttendance {
    pub tenant_id: TenantId,
    pub principal_id: PrincipalId,
    /// Stored role of the attendee, never client-supplied.
    pub principal_role: Role,
    pub principal_class: Option<ClassId>,
    pub status: AttendanceStatus,
    pub date: NaiveDate,
    pub note: Option<String>,
    pub recorded_by: PrincipalId,
}

impl AttendanceRecord {
    pub fn mark(input: MarkAttendance, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let role = AttendeeRole::try_from(input.principal_role)?;
        if input.date > now.date_naive() {
            return Err(DomainError::validation("attendance cannot be recorded for a future date"));
        }

        Ok(Self {
            id: AttendanceId::new(),
            tenant_id: input.tenant_id,
            principal_id: input.principal_id,
            role,
            status: input.status,
            date: input.date,
            class_id: match role {
                AttendeeRole::Student => input.principal_class,
                AttendeeRole::Teacher => None,
            },
            note: input.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            recorded_by: input.recorded_by,
            created_at: now,
        })
    }

    /// One record per principal per day.
    pub fn same_day_as(&self, other: &AttendanceRecord) -> bool {
        self.principal_id == other.principal_id && self.date == other.date
    }
}

/// Report query. Every field narrows the result; an empty filter matches all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub role: Option<AttendeeRole>,
    pub class_id: Option<ClassId>,
    pub user_id: Option<PrincipalId>,
}

impl AttendanceFilter {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(DomainError::validation("'from' must not be after 'to'"));
            }
        }
        Ok(())
    }

    pub fn matches(&self, r: &AttendanceRecord) -> bool {
        self.from.is_none_or(|d| r.date >= d)
            && self.to.is_none_or(|d| r.date <= d)
            && self.role.is_none_or(|role| r.role == role)
            && self.class_id.is_none_or(|c| r.class_id == Some(c))
            && self.user_id.is_none_or(|u| r.principal_id == u)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub half_day: usize,
}

impl AttendanceSummary {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a AttendanceRecord>,
    {
        records.into_iter().fold(Self::default(), |mut s, r| {
            s.total += 1;
            match r.status {
                AttendanceStatus::Present => s.present += 1,
                AttendanceStatus::Absent => s.absent += 1,
                AttendanceStatus::Late => s.late += 1,
                AttendanceStatus::HalfDay => s.half_day += 1,
            }
            s
        })
    }
}
