use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scholaris_core::{DomainError, PrincipalId, TaskId, TenantId};

use crate::required;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

/// Work item assigned by administration staff to a teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "schoolId")]
    pub tenant_id: TenantId,
    pub title: String,
    pub description: String,
    pub assigned_to: PrincipalId,
    pub assigned_by: PrincipalId,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub tenant_id: TenantId,
    pub title: String,
    pub description: String,
    pub assigned_to: PrincipalId,
    pub assigned_by: PrincipalId,
}

impl Task {
    pub fn assign(input: NewTask, now: DateTime<Utc>) -> Result<Self, DomainError> {
        Ok(Self {
            id: TaskId::new(),
            tenant_id: input.tenant_id,
            title: required(&input.title, "title")?,
            description: required(&input.description, "description")?,
            assigned_to: input.assigned_to,
            assigned_by: input.assigned_by,
            status: TaskStatus::Pending,
            created_at: now,
            completed_at: None,
        })
    }

    /// Only the assignee may complete; anyone else gets `NotFound`.
    /// Completing twice keeps the first completion time.
    pub fn complete(&mut self, by: PrincipalId, now: DateTime<Utc>) -> Result<(), DomainError> {
        if by != self.assigned_to {
            return Err(DomainError::NotFound);
        }
        if self.status == TaskStatus::Pending {
            self.status = TaskStatus::Completed;
            self.completed_at = Some(now);
        }
        Ok(())
    }
}
