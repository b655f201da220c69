use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scholaris_core::{ClassId, DomainError, HomeworkId, PrincipalId, SubmissionId, TenantId};

use crate::required;

/// Homework set by a teacher for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Homework {
    pub id: HomeworkId,
    #[serde(rename = "schoolId")]
    pub tenant_id: TenantId,
    pub class_id: ClassId,
    pub teacher_id: PrincipalId,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHomework {
    pub tenant_id: TenantId,
    pub class_id: ClassId,
    pub teacher_id: PrincipalId,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
}

impl Homework {
    pub fn assign(input: NewHomework, now: DateTime<Utc>) -> Result<Self, DomainError> {
        Ok(Self {
            id: HomeworkId::new(),
            tenant_id: input.tenant_id,
            class_id: input.class_id,
            teacher_id: input.teacher_id,
            title: required(&input.title, "title")?,
            description: required(&input.description, "description")?,
            due_date: input.due_date,
            created_at: now,
        })
    }

    pub fn is_overdue_at(&self, at: DateTime<Utc>) -> bool {
        at > self.due_date
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Submitted,
    Late,
    Graded,
}

/// A student's answer. At most one per `(homework, student)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkSubmission {
    pub id: SubmissionId,
    #[serde(rename = "schoolId")]
    pub tenant_id: TenantId,
    pub homework_id: HomeworkId,
    pub student_id: PrincipalId,
    #[serde(rename = "submissionText")]
    pub text: String,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(rename = "teacherFeedback", default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl HomeworkSubmission {
    /// Submit against `homework`; tagged `late` once the due date has passed.
    ///
    /// `student_class` is the submitting student's class. A student outside
    /// the homework's class sees it as not found.
    pub fn submit(
        homework: &Homework,
        student_id: PrincipalId,
        student_class: Option<ClassId>,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if student_class != Some(homework.class_id) {
            return Err(DomainError::NotFound);
        }
        let status = if homework.is_overdue_at(now) {
            SubmissionStatus::Late
        } else {
            SubmissionStatus::Submitted
        };

        Ok(Self {
            id: SubmissionId::new(),
            tenant_id: homework.tenant_id,
            homework_id: homework.id,
            student_id,
            text: required(text, "submission text")?,
            submitted_at: now,
            status,
            grade: None,
            feedback: None,
        })
    }

    pub fn grade(&mut self, grade: &str, feedback: Option<String>) -> Result<(), DomainError> {
        self.grade = Some(required(grade, "grade")?);
        self.feedback = feedback.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
        self.status = SubmissionStatus::Graded;
        Ok(())
    }
}
