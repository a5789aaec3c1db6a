use axum::response::{IntoResponse, Response};
use axum::Json;

use common::prelude::build_info;

/// Build metadata baked in by `common`'s build script.
pub async fn handler() -> Response {
    Json(build_info()).into_response()
}
