use axum::response::{IntoResponse, Response};
use http::header::{ALLOW, WWW_AUTHENTICATE};
use http::{HeaderMap, StatusCode};

use common::prelude::SiteError;

pub mod create;
pub mod site;

/// Request header carrying creation tokens and site secrets
pub const AUTHORISATION: &str = "authorisation";

pub(crate) fn authorisation(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORISATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub(crate) fn missing_authorisation() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, "Basic")],
        "Authorisation header required",
    )
        .into_response()
}

pub(crate) fn method_not_allowed(allow: &'static str) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(ALLOW, allow)],
        format!("405: Method Not Allowed (allowed: {})", allow),
    )
        .into_response()
}

/// Map an engine failure onto a status and a plain-text body. Storage
///  details are logged, never returned.
pub(crate) fn site_error_response(err: SiteError) -> Response {
    match err {
        SiteError::Forbidden(msg) => {
            tracing::warn!("forbidden: {}", msg);
            (StatusCode::FORBIDDEN, msg).into_response()
        }
        e @ (SiteError::SiteNotFound { .. } | SiteError::FileNotFound { .. }) => {
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
        SiteError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
        SiteError::LimitExceeded(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg).into_response(),
        e @ (SiteError::Storage(_) | SiteError::Corrupt(_)) => {
            tracing::error!("site operation failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
