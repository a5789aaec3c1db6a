use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;

use common::prelude::build_info;

#[derive(Serialize)]
pub struct IndexResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub create: &'static str,
    pub upload: &'static str,
}

#[tracing::instrument]
pub async fn handler() -> Response {
    let body = IndexResponse {
        message: "smokeshow: ephemeral static sites",
        version: build_info().version,
        create: "POST /create/ with a proof-of-work token in the Authorisation header",
        upload: "POST /{public_key}/{path} with the site's secret key in the Authorisation header",
    };
    (StatusCode::OK, Json(body)).into_response()
}
