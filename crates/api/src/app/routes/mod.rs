use axum::Router;

pub mod admin;
pub mod administration;
pub mod auth;
pub mod student;
pub mod superadmin;
pub mod system;
pub mod teacher;

/// Router for every tenant-gated endpoint (identity, isolation, subscription).
pub fn gated_router() -> Router {
    Router::new()
        .nest("/superadmin", superadmin::router())
        .nest("/admin", admin::router())
        .nest("/administration", administration::router())
        .nest("/teacher", teacher::router())
        .nest("/student", student::router())
}
