use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tokio::time::timeout;

use super::data_source::{DataSource, StateDataSource};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// 200 once the site store answers a write and read-back in time.
#[tracing::instrument]
pub async fn handler(data_src: StateDataSource) -> Response {
    let message = match timeout(PROBE_TIMEOUT, data_src.is_ready()).await {
        Ok(Ok(())) => return (StatusCode::OK, Json(json!({"status": "ok"}))).into_response(),
        Ok(Err(_)) => "the site store isn't available",
        Err(_) => "site store probe timed out",
    };
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"status": "failure", "message": message})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;

    use super::*;
    use crate::http_server::health::data_source::tests::MockReadiness;

    #[tokio::test]
    async fn test_ready_and_unavailable() {
        let response = handler(StateDataSource::new(Arc::new(MockReadiness::Ready))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = handler(StateDataSource::new(Arc::new(
            MockReadiness::DependencyFailure,
        )))
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "the site store isn't available");
    }
}
