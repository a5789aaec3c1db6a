use std::net::SocketAddr;

use http::header::HOST;
use http::HeaderMap;
use url::Url;

const FORWARDED_PROTO: &str = "x-forwarded-proto";

#[derive(Debug, Clone)]
pub struct Config {
    // Listen address
    pub listen_addr: SocketAddr,
    // External origin used for site urls, taken from
    //  the request Host header when unset
    pub public_url: Option<Url>,
    // log level for http tracing
    pub log_level: tracing::Level,
    // Largest request body accepted
    pub max_body_size: usize,
}

impl Config {
    pub fn new(listen_addr: SocketAddr, public_url: Option<Url>, max_body_size: usize) -> Self {
        tracing::info!(
            "Creating HTTP server Config: listen_addr={}, public_url={:?}",
            listen_addr,
            public_url.as_ref().map(Url::as_str)
        );
        Self {
            listen_addr,
            public_url,
            log_level: tracing::Level::INFO,
            max_body_size,
        }
    }

    /// Origin new sites are published under for this request.
    pub fn base_url(&self, headers: &HeaderMap) -> Option<Url> {
        if let Some(url) = &self.public_url {
            return Some(url.clone());
        }
        let host = headers.get(HOST)?.to_str().ok()?;
        let scheme = headers
            .get(FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");
        Url::parse(&format!("{}://{}", scheme, host)).ok()
    }
}
