//! `scholaris-academics`: classes, homework, staff tasks and attendance.
//!
//! Every record is tenant-owned; constructors take the tenant from the
//! caller's resolved context, never from client input.

pub mod attendance;
pub mod class;
pub mod homework;
pub mod task;

pub use attendance::{
    AttendanceFilter, AttendanceRecord, AttendanceStatus, AttendanceSummary, AttendeeRole,
    MarkAttendance,
};
pub use class::{ClassGroup, NewClass};
pub use homework::{Homework, HomeworkSubmission, NewHomework, SubmissionStatus};
pub use task::{NewTask, Task, TaskStatus};

use scholaris_core::DomainError;

pub(crate) fn required(value: &str, field: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}
