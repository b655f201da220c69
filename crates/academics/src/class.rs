use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scholaris_core::{ClassId, DomainError, PrincipalId, TenantId};

use crate::required;

/// A class/section within one school. `(name, section)` is unique per tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassGroup {
    pub id: ClassId,
    #[serde(rename = "schoolId")]
    pub tenant_id: TenantId,
    pub name: String,
    pub section: String,
    #[serde(rename = "teacherId", default, skip_serializing_if = "Option::is_none")]
    pub homeroom_teacher_id: Option<PrincipalId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewClass {
    pub tenant_id: TenantId,
    pub name: String,
    pub section: String,
    pub homeroom_teacher_id: Option<PrincipalId>,
}

impl ClassGroup {
    pub fn new(input: NewClass, now: DateTime<Utc>) -> Result<Self, DomainError> {
        Ok(Self {
            id: ClassId::new(),
            tenant_id: input.tenant_id,
            name: required(&input.name, "class name")?,
            section: required(&input.section, "section")?,
            homeroom_teacher_id: input.homeroom_teacher_id,
            created_at: now,
        })
    }

    /// Same `(name, section)` slot, ignoring case.
    pub fn same_slot(&self, other: &ClassGroup) -> bool {
        self.name.to_lowercase() == other.name.to_lowercase()
            && self.section.to_lowercase() == other.section.to_lowercase()
    }

    pub fn is_homeroom_of(&self, teacher: PrincipalId) -> bool {
        self.homeroom_teacher_id == Some(teacher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, section: &str) -> ClassGroup {
        ClassGroup::new(
            NewClass {
                tenant_id: TenantId::new(),
                name: name.into(),
                section: section.into(),
                homeroom_teacher_id: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn slot_comparison_ignores_case_and_padding() {
        assert!(class("Grade 5", "A").same_slot(&class(" grade 5 ", "a")));
        assert!(!class("Grade 5", "A").same_slot(&class("Grade 5", "B")));
    }

    #[test]
    fn blank_name_or_section_is_rejected() {
        let err = ClassGroup::new(
            NewClass {
                tenant_id: TenantId::new(),
                name: "Grade 5".into(),
                section: " ".into(),
                homeroom_teacher_id: None,
            },
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::validation("section cannot be empty"));
    }

    #[test]
    fn homeroom_teacher_serializes_as_teacher_id() {
        let teacher = PrincipalId::new();
        let mut c = class("Grade 5", "A");
        c.homeroom_teacher_id = Some(teacher);
        assert!(c.is_homeroom_of(teacher));

        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["teacherId"], serde_json::json!(teacher));
        assert!(json.get("schoolId").is_some());
    }
}
