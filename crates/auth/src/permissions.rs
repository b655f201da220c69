//! Role-gated action surface.
//!
//! Each action names one privileged operation; `permitted_roles` is the single
//! place deciding which roles may attempt it. Finer checks (creation hierarchy,
//! mutation targets) live in [`crate::policy`].

use serde::{Deserialize, Serialize};

use crate::Role;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    // superadmin
    CreateTenant,
    ListTenants,
    ToggleTenant,
    RenewSubscription,
    CreateTenantAdmin,

    // principal management
    CreatePrincipal,
    ListPrincipals,
    UpdatePrincipal,
    DeletePrincipal,
    ListStaff,

    // classes & analytics
    CreateClass,
    ListClasses,
    ViewAnalytics,

    // administration
    AssignTask,
    RecordFeePayment,
    ViewFeeReports,
    RecordAttendance,
    ViewAttendanceReport,

    // teacher
    AssignHomework,
    ListOwnHomework,
    ListHomeworkSubmissions,
    GradeSubmission,
    ListOwnTasks,
    CompleteTask,
    ListOwnClasses,

    // student
    ListClassHomework,
    SubmitHomework,
    ListOwnSubmissions,
    ViewOwnFees,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateTenant => "tenant.create",
            Action::ListTenants => "tenant.list",
            Action::ToggleTenant => "tenant.toggle",
            Action::RenewSubscription => "tenant.renew",
            Action::CreateTenantAdmin => "tenant.create_admin",
            Action::CreatePrincipal => "principal.create",
            Action::ListPrincipals => "principal.list",
            Action::UpdatePrincipal => "principal.update",
            Action::DeletePrincipal => "principal.delete",
            Action::ListStaff => "principal.list_staff",
            Action::CreateClass => "class.create",
            Action::ListClasses => "class.list",
            Action::ViewAnalytics => "analytics.view",
            Action::AssignTask => "task.assign",
            Action::RecordFeePayment => "fees.record_payment",
            Action::ViewFeeReports => "fees.report",
            Action::RecordAttendance => "attendance.record",
            Action::ViewAttendanceReport => "attendance.report",
            Action::AssignHomework => "homework.assign",
            Action::ListOwnHomework => "homework.list_own",
            Action::ListHomeworkSubmissions => "homework.list_submissions",
            Action::GradeSubmission => "homework.grade",
            Action::ListOwnTasks => "task.list_own",
            Action::CompleteTask => "task.complete",
            Action::ListOwnClasses => "class.list_own",
            Action::ListClassHomework => "homework.list_class",
            Action::SubmitHomework => "homework.submit",
            Action::ListOwnSubmissions => "homework.list_own_submissions",
            Action::ViewOwnFees => "fees.view_own",
        }
    }

    /// Roles allowed to attempt this action at all.
    pub fn permitted_roles(&self) -> &'static [Role] {
        use Role::*;
        match self {
            Action::CreateTenant
            | Action::ListTenants
            | Action::ToggleTenant
            | Action::RenewSubscription
            | Action::CreateTenantAdmin => &[SuperAdmin],

            Action::CreatePrincipal
            | Action::ListPrincipals
            | Action::UpdatePrincipal
            | Action::DeletePrincipal
            | Action::CreateClass => &[Admin, Administration],

            Action::ListClasses => &[Admin, Administration, Teacher],
            Action::ViewAnalytics => &[Admin],
            Action::ViewFeeReports => &[Administration, Admin],

            Action::ListStaff
            | Action::AssignTask
            | Action::RecordFeePayment
            | Action::RecordAttendance
            | Action::ViewAttendanceReport => &[Administration],

            Action::AssignHomework
            | Action::ListOwnHomework
            | Action::ListHomeworkSubmissions
            | Action::GradeSubmission
            | Action::ListOwnTasks
            | Action::CompleteTask
            | Action::ListOwnClasses => &[Teacher],

            Action::ListClassHomework
            | Action::SubmitHomework
            | Action::ListOwnSubmissions
            | Action::ViewOwnFees => &[Student],
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.permitted_roles().contains(&role)
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_payment_is_administration_only() {
        for role in Role::ALL {
            assert_eq!(
                Action::RecordFeePayment.permits(role),
                role == Role::Administration,
                "{role}"
            );
        }
    }

    #[test]
    fn fee_reports_open_to_admin_and_administration() {
        assert!(Action::ViewFeeReports.permits(Role::Admin));
        assert!(Action::ViewFeeReports.permits(Role::Administration));
        assert!(!Action::ViewFeeReports.permits(Role::Teacher));
    }

    #[test]
    fn superadmin_holds_no_tenant_scoped_actions() {
        assert!(!Action::RecordFeePayment.permits(Role::SuperAdmin));
        assert!(!Action::CreatePrincipal.permits(Role::SuperAdmin));
        assert!(Action::ToggleTenant.permits(Role::SuperAdmin));
    }
}
