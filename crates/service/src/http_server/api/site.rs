use std::sync::LazyLock;

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST, REFERER};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use regex::Regex;
use url::Url;

use common::prelude::{NewFile, Resolved, SiteError};

use super::{authorisation, method_not_allowed, missing_authorisation, site_error_response};
use crate::http_server::handlers::not_found_handler;
use crate::ServiceState;

/// Upload headers with this prefix are stored and replayed without it
pub const RESPONSE_HEADER_PREFIX: &str = "response-header-";

/// Message framing belongs to the connection, never to a stored file
const FRAMING_HEADERS: &[&str] = &[
    "content-length",
    "transfer-encoding",
    "connection",
    "keep-alive",
    "upgrade",
    "te",
    "trailer",
];

/// Whether a stored `response-header-*` may be sent back on a response.
pub fn is_replayable(name: &str) -> bool {
    !FRAMING_HEADERS
        .iter()
        .any(|framing| framing.eq_ignore_ascii_case(name))
}

static SITE_PATH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([a-z0-9]{20})(/.*)$").unwrap());

/// Split a raw request path into `(public_key, site_path)`.
pub fn match_site_path(path: &str) -> Option<(&str, &str)> {
    let captures = SITE_PATH_REGEX.captures(path)?;
    Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

/// Fallback for everything not otherwise routed: site reads and
///  writes, referrer redirects, and the generic 404.
pub async fn handler(
    State(state): State<ServiceState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // the raw, still percent-encoded path is the lookup key
    let path = uri.path();
    let Some((public_key, site_path)) = match_site_path(path) else {
        if method == Method::GET {
            if let Some(location) = referrer_redirect(&headers, &uri) {
                tracing::debug!(%location, "redirecting root-relative request into its site");
                return Redirect::temporary(&location).into_response();
            }
        }
        return not_found_handler(headers).await;
    };

    let result = match method {
        Method::GET | Method::HEAD => serve(&state, public_key, site_path).await,
        Method::POST => upload(&state, public_key, site_path, &headers, body).await,
        _ => return method_not_allowed("GET,POST"),
    };
    result.unwrap_or_else(IntoResponse::into_response)
}

async fn serve(state: &ServiceState, public_key: &str, path: &str) -> Result<Response, SiteRequestError> {
    let resolved = state.engine().resolve(public_key, path).await?;
    Ok(resolved_response(resolved))
}

async fn upload(
    state: &ServiceState,
    public_key: &str,
    path: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, SiteRequestError> {
    let secret_key = authorisation(headers).ok_or(SiteRequestError::MissingAuthorisation)?;
    let mut file = NewFile::new(path, body);
    if let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        file = file.with_content_type(content_type);
    }
    for (name, value) in headers {
        let Some(replayed) = name.as_str().strip_prefix(RESPONSE_HEADER_PREFIX) else {
            continue;
        };
        if !is_replayable(replayed) {
            tracing::debug!(header = %replayed, "ignoring framing header on upload");
            continue;
        }
        if let Ok(value) = value.to_str() {
            file = file.with_header(replayed, value);
        }
    }

    let result = state.engine().upload(public_key, secret_key, file).await?;
    Ok((StatusCode::OK, Json(result)).into_response())
}

fn resolved_response(resolved: Resolved) -> Response {
    let status = StatusCode::from_u16(resolved.status).unwrap_or(StatusCode::OK);
    let content_type = HeaderValue::from_str(&resolved.content_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));

    let mut response = (status, resolved.body).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(CONTENT_TYPE, content_type);
    for (name, value) in resolved.headers {
        if !is_replayable(&name) {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                response_headers.insert(name, value);
            }
            _ => tracing::warn!(%name, "skipping unrepresentable stored header"),
        }
    }
    response
}

/// Sites that link with root-relative urls (`/style.css`) send the browser
///  outside their prefix. When the same-origin referrer is a site page,
///  point the request back inside that site.
fn referrer_redirect(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let host = headers.get(HOST)?.to_str().ok()?;
    let referrer = Url::parse(headers.get(REFERER)?.to_str().ok()?).ok()?;

    let referrer_host = match referrer.port() {
        Some(port) => format!("{}:{}", referrer.host_str()?, port),
        None => referrer.host_str()?.to_string(),
    };
    if referrer_host != host {
        return None;
    }

    let (public_key, _) = match_site_path(referrer.path())?;
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    Some(format!("/{}{}", public_key, target))
}

#[derive(Debug, thiserror::Error)]
pub enum SiteRequestError {
    #[error("Authorisation header required")]
    MissingAuthorisation,
    #[error(transparent)]
    Site(#[from] SiteError),
}

impl IntoResponse for SiteRequestError {
    fn into_response(self) -> Response {
        match self {
            SiteRequestError::MissingAuthorisation => missing_authorisation(),
            SiteRequestError::Site(e) => site_error_response(e),
        }
    }
}
