use axum::response::Response;

use crate::app::dto::{self, HealthView};

pub async fn health() -> Response {
    dto::ok(HealthView { status: "ok" })
}
