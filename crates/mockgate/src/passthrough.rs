//! What happens to a request that no rule matched.
//!
//! [`NotFound`] answers with a JSON 404. [`ProxyPassthrough`] relays requests
//! under a path prefix to an upstream target and answers everything else like
//! [`NotFound`].

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::request::MockRequest;
use crate::response::{error_response, X_MOCKGATE_PROXIED};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Response, StatusCode};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};

/// Fallback for unmatched requests.
#[async_trait]
pub trait Passthrough: Send + Sync {
    async fn forward(&self, request: &MockRequest) -> Result<Response<Full<Bytes>>>;
}

pub type SharedPassthrough = Arc<dyn Passthrough>;

/// Answers every request with a JSON 404.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

#[async_trait]
impl Passthrough for NotFound {
    async fn forward(&self, request: &MockRequest) -> Result<Response<Full<Bytes>>> {
        Ok(error_response(
            StatusCode::NOT_FOUND,
            &format!(
                "No mock rule matched {} {}",
                request.method(),
                request.path()
            ),
        ))
    }
}

/// Headers that describe a single connection and must not be relayed.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

fn get_http_client() -> &'static reqwest::Client {
    HTTP_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build configured HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            })
    })
}

/// Relays requests under `prefix` to `target`.
///
/// The forwarded URL is `target` + original path + original query; the
/// prefix is not stripped. Method, raw body and headers are copied, minus
/// hop-by-hop headers, `host` and `content-length`.
#[derive(Debug, Clone)]
pub struct ProxyPassthrough {
    prefix: String,
    target: String,
}

impl ProxyPassthrough {
    pub fn new(prefix: impl Into<String>, target: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let target = target.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            target: target.trim_end_matches('/').to_string(),
        }
    }

    /// A [`ProxyPassthrough`] when a target is configured, [`NotFound`] otherwise.
    pub fn from_config(config: &ServerConfig) -> SharedPassthrough {
        match &config.proxy_target {
            Some(target) => Arc::new(Self::new(config.proxy_prefix.as_str(), target.as_str())),
            None => Arc::new(NotFound),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether `path` lies under the prefix, on a segment boundary.
    pub fn covers(&self, path: &str) -> bool {
        if self.prefix.is_empty() {
            return true;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    fn upstream_url(&self, request: &MockRequest) -> String {
        match request.query() {
            Some(query) if !query.is_empty() => {
                format!("{}{}?{}", self.target, request.path(), query)
            }
            _ => format!("{}{}", self.target, request.path()),
        }
    }

    async fn send(&self, request: &MockRequest) -> Result<Response<Full<Bytes>>> {
        let url = self.upstream_url(request);
        debug!("Proxy request to: {}", url);

        let upstream_err = |e: reqwest::Error| Error::Upstream {
            target: url.clone(),
            reason: e.to_string(),
        };

        let mut builder = get_http_client().request(request.method().clone(), url.as_str());
        for (name, value) in request.headers() {
            if is_hop_by_hop(name)
                || name == hyper::header::HOST
                || name == hyper::header::CONTENT_LENGTH
            {
                continue;
            }
            builder = builder.header(name, value);
        }
        if !request.raw_body().is_empty() {
            builder = builder.body(request.raw_body().clone());
        }

        let upstream = builder.send().await.map_err(upstream_err)?;
        let status = upstream.status();
        let headers = upstream.headers().clone();
        let body = upstream.bytes().await.map_err(upstream_err)?;

        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        for (name, value) in &headers {
            if is_hop_by_hop(name) || name == hyper::header::CONTENT_LENGTH {
                continue;
            }
            response.headers_mut().append(name.clone(), value.clone());
        }
        response
            .headers_mut()
            .insert(X_MOCKGATE_PROXIED.clone(), HeaderValue::from_static("true"));
        Ok(response)
    }
}

#[async_trait]
impl Passthrough for ProxyPassthrough {
    async fn forward(&self, request: &MockRequest) -> Result<Response<Full<Bytes>>> {
        if !self.covers(request.path()) {
            return NotFound.forward(request).await;
        }
        match self.send(request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!("Proxy request failed: {}", e);
                Ok(error_response(StatusCode::BAD_GATEWAY, &e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::Method;
    use serde_json::{json, Value};

    #[test]
    fn test_prefix_coverage_respects_segments() {
        let proxy = ProxyPassthrough::new("/api", "http://upstream");
        assert!(proxy.covers("/api"));
        assert!(proxy.covers("/api/"));
        assert!(proxy.covers("/api/orders/1"));
        assert!(!proxy.covers("/apiary"));
        assert!(!proxy.covers("/other/api"));
    }

    #[test]
    fn test_root_prefix_covers_everything() {
        let proxy = ProxyPassthrough::new("/", "http://upstream");
        assert_eq!(proxy.prefix(), "");
        assert!(proxy.covers("/anything"));
    }

    #[test]
    fn test_upstream_url_keeps_prefix_and_query() {
        let proxy = ProxyPassthrough::new("/api", "https://www.example.com/");
        assert_eq!(proxy.target(), "https://www.example.com");

        let req = MockRequest::new(Method::GET, "/api/orders").with_query("page=2&size=10");
        assert_eq!(
            proxy.upstream_url(&req),
            "https://www.example.com/api/orders?page=2&size=10"
        );
        let req = MockRequest::new(Method::GET, "/api/orders").with_query("");
        assert_eq!(proxy.upstream_url(&req), "https://www.example.com/api/orders");
    }

    #[test]
    fn test_hop_by_hop_detection() {
        assert!(is_hop_by_hop(&hyper::header::CONNECTION));
        assert!(is_hop_by_hop(&hyper::header::TRANSFER_ENCODING));
        assert!(!is_hop_by_hop(&hyper::header::ACCEPT));
    }

    #[tokio::test]
    async fn test_from_config_without_target_is_not_found() {
        let config = ServerConfig::default();
        assert!(config.proxy_target.is_none());
        let response = ProxyPassthrough::from_config(&config)
            .forward(&MockRequest::new(Method::GET, "/api/orders"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let response = NotFound
            .forward(&MockRequest::new(Method::DELETE, "/api/orders/1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            serde_json::from_slice::<Value>(&bytes).unwrap(),
            json!({"error": {"status": 404, "message": "No mock rule matched DELETE /api/orders/1"}})
        );
    }

    #[tokio::test]
    async fn test_outside_prefix_is_not_found() {
        let proxy = ProxyPassthrough::new("/api", "http://127.0.0.1:9");
        let response = proxy
            .forward(&MockRequest::new(Method::GET, "/static/app.js"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        // Port 9 (discard) is not expected to accept connections locally.
        let proxy = ProxyPassthrough::new("/api", "http://127.0.0.1:9");
        let response = proxy
            .forward(&MockRequest::new(Method::GET, "/api/orders"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
