use axum::extract::{Extension, Json, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use common::credential::decode_token;
use common::prelude::SiteError;
use common::site::timestamp;

use super::{authorisation, method_not_allowed, missing_authorisation, site_error_response};
use crate::http_server::Config;
use crate::ServiceState;

const CREATED_MESSAGE: &str = "New site created successfully";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponse {
    pub message: String,
    pub secret_key: String,
    pub sites_created_24h: u64,
    pub url: String,
    #[serde(with = "timestamp")]
    pub site_creation: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub site_expiration: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub upload_expiration: DateTime<Utc>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Extension(config): Extension<Config>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, CreateError> {
    let raw = authorisation(&headers).ok_or(CreateError::MissingAuthorisation)?;
    let token = decode_token(raw).map_err(|_| CreateError::InvalidAuthorisation)?;
    let base_url = config.base_url(&headers).ok_or(CreateError::MissingHost)?;

    let created = state.engine().create_site(&token, &base_url).await?;
    let site = created.site;

    Ok((
        StatusCode::OK,
        Json(CreateResponse {
            message: CREATED_MESSAGE.to_string(),
            secret_key: site.secret_key,
            sites_created_24h: created.sites_created_24h,
            url: site.url,
            site_creation: site.created_at,
            site_expiration: site.expires_at,
            upload_expiration: site.upload_expires_at,
        }),
    ))
}

pub async fn method_not_allowed_handler() -> Response {
    method_not_allowed("POST")
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("Authorisation header required")]
    MissingAuthorisation,
    #[error("Invalid Authorisation header")]
    InvalidAuthorisation,
    #[error("No \"Host\" header found")]
    MissingHost,
    #[error(transparent)]
    Site(#[from] SiteError),
}

impl IntoResponse for CreateError {
    fn into_response(self) -> Response {
        match self {
            CreateError::MissingAuthorisation => missing_authorisation(),
            CreateError::InvalidAuthorisation => {
                tracing::warn!("rejected site creation with undecodable token");
                (StatusCode::FORBIDDEN, self.to_string()).into_response()
            }
            CreateError::MissingHost => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            CreateError::Site(e) => site_error_response(e),
        }
    }
}
