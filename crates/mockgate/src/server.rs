//! HTTP/1.1 listener that feeds requests through a [`Dispatcher`].

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::passthrough::{ProxyPassthrough, SharedPassthrough};
use crate::request::MockRequest;
use crate::response::{error_response, json_response, X_MOCKGATE_DEBUG};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

struct ServerState {
    dispatcher: Dispatcher,
    passthrough: SharedPassthrough,
    body_limit: usize,
}

/// A configured, not yet running server.
pub struct MockServer {
    config: ServerConfig,
    dispatcher: Dispatcher,
    passthrough: SharedPassthrough,
}

impl MockServer {
    /// The passthrough is derived from the config; see [`ProxyPassthrough::from_config`].
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        let passthrough = ProxyPassthrough::from_config(&config);
        Self {
            config,
            dispatcher,
            passthrough,
        }
    }

    pub fn with_passthrough(mut self, passthrough: SharedPassthrough) -> Self {
        self.passthrough = passthrough;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the listener and start accepting connections in the background.
    pub async fn start(self) -> Result<ServerHandle> {
        let addr = self.config.bind_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Bind(addr, e))?;
        let local_addr = listener.local_addr().map_err(|e| Error::Bind(addr, e))?;

        info!(
            "Mock server listening on {} with {} rule(s)",
            local_addr,
            self.dispatcher.len()
        );

        let state = Arc::new(ServerState {
            dispatcher: self.dispatcher,
            passthrough: self.passthrough,
            body_limit: self.config.body_limit,
        });

        let (shutdown_tx, _) = broadcast::channel(1);
        let mut shutdown_rx = shutdown_tx.subscribe();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer)) => {
                                let state = Arc::clone(&state);
                                tokio::spawn(async move {
                                    let io = TokioIo::new(stream);
                                    let service = service_fn(move |req| {
                                        let state = Arc::clone(&state);
                                        async move { handle_request(req, state).await }
                                    });
                                    if let Err(e) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection error from {}: {}", peer, e);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Accept error on {}: {}", local_addr, e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Mock server on {} shutting down", local_addr);
                        break;
                    }
                }
            }
        });

        Ok(ServerHandle {
            local_addr,
            shutdown_tx,
            task,
        })
    }
}

/// A running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `http://<addr>`
    pub fn url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    ///
    /// Connections already being served run to completion.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            warn!("Accept loop on {} ended abnormally: {}", self.local_addr, e);
        }
    }
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ServerState>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!("{} {}", method, req.uri());

    let request = match read_request(req, state.body_limit).await {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected {} {}: {}", method, path, e);
            return Ok(error_response(status_for(&e), &e.to_string()));
        }
    };

    let result = if is_debug_request(request.headers()) {
        state
            .dispatcher
            .evaluate_all(&request)
            .await
            .map(|results| json_response(StatusCode::OK, &results))
    } else {
        state
            .dispatcher
            .handle(&request, state.passthrough.as_ref())
            .await
    };

    Ok(result.unwrap_or_else(|e| {
        if e.is_rule_fault() {
            error!("Rule failed on {} {}: {}", method, path, e);
        } else {
            warn!("Request {} {} failed: {}", method, path, e);
        }
        error_response(status_for(&e), &e.to_string())
    }))
}

/// Collect and parse the body, producing the view matchers see.
async fn read_request(req: Request<Incoming>, limit: usize) -> Result<MockRequest> {
    let (parts, body) = req.into_parts();

    let declared = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(Error::BodyTooLarge(limit));
    }

    let raw = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                Error::BodyTooLarge(limit)
            } else {
                Error::Body(e.to_string())
            }
        })?
        .to_bytes();

    let body = parse_body(&parts.headers, &raw)?;

    let mut request = MockRequest::new(parts.method, parts.uri.path())
        .with_headers(parts.headers)
        .with_body(body, raw);
    if let Some(query) = parts.uri.query() {
        request = request.with_query(query);
    }
    Ok(request)
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let mime = v.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// JSON bodies are parsed; anything else, and an empty body, is `{}`.
fn parse_body(headers: &HeaderMap, raw: &Bytes) -> Result<Value> {
    if raw.is_empty() || !is_json_content_type(headers) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(raw).map_err(|e| Error::Body(format!("malformed JSON: {e}")))
}

fn is_debug_request(headers: &HeaderMap) -> bool {
    headers
        .get(&X_MOCKGATE_DEBUG)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        Error::Body(_) => StatusCode::BAD_REQUEST,
        Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                hyper::header::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json_content_type(&headers(&[(
            "content-type",
            "application/json; charset=utf-8"
        )])));
        assert!(is_json_content_type(&headers(&[(
            "content-type",
            "application/vnd.api+json"
        )])));
        assert!(!is_json_content_type(&headers(&[("content-type", "text/plain")])));
        assert!(!is_json_content_type(&HeaderMap::new()));
    }

    #[test]
    fn test_parse_body() {
        let json = headers(&[("content-type", "application/json")]);
        assert_eq!(
            parse_body(&json, &Bytes::from_static(br#"{"status":"open"}"#)).unwrap(),
            serde_json::json!({"status": "open"})
        );
        assert_eq!(parse_body(&json, &Bytes::new()).unwrap(), serde_json::json!({}));
        assert!(matches!(
            parse_body(&json, &Bytes::from_static(b"{not json")),
            Err(Error::Body(_))
        ));

        let text = headers(&[("content-type", "text/plain")]);
        assert_eq!(
            parse_body(&text, &Bytes::from_static(b"{not json")).unwrap(),
            serde_json::json!({})
        );
    }

    #[test]
    fn test_debug_header_values() {
        assert!(is_debug_request(&headers(&[("x-mockgate-debug", "true")])));
        assert!(is_debug_request(&headers(&[("x-mockgate-debug", "TRUE")])));
        assert!(is_debug_request(&headers(&[("x-mockgate-debug", "1")])));
        assert!(!is_debug_request(&headers(&[("x-mockgate-debug", "yes")])));
        assert!(!is_debug_request(&HeaderMap::new()));
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            status_for(&Error::BodyTooLarge(1)),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_for(&Error::Body("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::Respond(anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_start_on_ephemeral_port_and_stop() {
        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        let handle = MockServer::new(config, Dispatcher::default())
            .start()
            .await
            .unwrap();
        let addr = handle.local_addr();
        assert_ne!(addr.port(), 0);
        assert_eq!(handle.url(), format!("http://{addr}"));

        handle.stop().await;
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            port: occupied.local_addr().unwrap().port(),
            ..Default::default()
        };
        let err = MockServer::new(config, Dispatcher::default())
            .start()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Bind(..)));
    }
}
