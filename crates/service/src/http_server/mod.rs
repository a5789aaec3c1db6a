use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Extension, Router};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderName, Method};
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

pub mod api;
mod config;
mod handlers;
mod health;

pub use config::Config;

use crate::ServiceState;

const STATUS_PREFIX: &str = "/_status";

/// Build the full application router.
///
/// Site paths (`/{public_key}/...`) are not routes of their own: the
///  fallback matches them, so they never shadow `/create/` or `/_status`.
pub fn router(config: Config, state: ServiceState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::POST])
        .allow_headers(vec![
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("authorisation"),
        ])
        .allow_origin(Any)
        .allow_credentials(false);

    Router::new()
        .route("/", get(handlers::index_handler))
        .route(
            "/create/",
            post(api::create::handler).fallback(api::create::method_not_allowed_handler),
        )
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .fallback(api::site::handler)
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(cors)
        .layer(Extension(config))
        .with_state(state)
}

/// Run the HTTP server until `shutdown_rx` fires.
pub async fn run(
    config: Config,
    state: ServiceState,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let listen_addr = config.listen_addr;
    let log_level = config.log_level;
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    let router = router(config, state).layer(trace_layer);

    tracing::info!(addr = ?listen_addr, "HTTP server listening");
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}
