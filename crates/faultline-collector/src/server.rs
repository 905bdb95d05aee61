//! HTTP server of the collector
//!
//! Routes:
//!
//! | Method | Path | Effect |
//! |--------|------|--------|
//! | `GET` | `/api/errors` | whole error document |
//! | `POST` | `/api/errors` | append one record |
//! | `POST` | `/api/errors/batch` | append `{"errors": [...]}` |
//! | `DELETE` | `/api/errors` | clear the store |
//! | `POST` | `/api/logs` | append one delivered `LogPayload` |
//! | `GET` | `/metrics` | Prometheus exposition (when enabled) |
//! | `OPTIONS` | any | CORS preflight |
//!
//! Every response allows any origin.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use faultline_core::config::ServerConfig;
use faultline_core::LogPayload;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::metrics::CollectorMetrics;
use crate::store::ErrorFileStore;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const ALLOWED_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

/// A resolved route; its label is used in metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ListErrors,
    SaveError,
    SaveBatch,
    ClearErrors,
    ReceiveLog,
    Metrics,
    Preflight,
    NotFound,
}

impl Route {
    pub fn resolve(method: &Method, path: &str) -> Self {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        if *method == Method::OPTIONS {
            return Route::Preflight;
        }

        match (method, path) {
            (&Method::GET, "/api/errors") => Route::ListErrors,
            (&Method::POST, "/api/errors") => Route::SaveError,
            (&Method::POST, "/api/errors/batch") => Route::SaveBatch,
            (&Method::DELETE, "/api/errors") => Route::ClearErrors,
            (&Method::POST, "/api/logs") => Route::ReceiveLog,
            (&Method::GET, "/metrics") => Route::Metrics,
            _ => Route::NotFound,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Route::ListErrors => "list_errors",
            Route::SaveError => "save_error",
            Route::SaveBatch => "save_batch",
            Route::ClearErrors => "clear_errors",
            Route::ReceiveLog => "receive_log",
            Route::Metrics => "metrics",
            Route::Preflight => "preflight",
            Route::NotFound => "not_found",
        }
    }
}

struct AppState {
    store: ErrorFileStore,
    metrics: CollectorMetrics,
    metrics_enabled: bool,
}

/// Collector HTTP server, bound and ready to accept connections.
pub struct CollectorServer {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl CollectorServer {
    /// Binds `config.listen`. Port `0` picks a free port.
    pub async fn bind(config: &ServerConfig) -> anyhow::Result<Self> {
        let addr: SocketAddr = config
            .listen
            .parse()
            .with_context(|| format!("Invalid listen address '{}'", config.listen))?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        let store = ErrorFileStore::new(config.errors_file.clone(), config.max_errors);
        let metrics = CollectorMetrics::new()?;
        metrics.set_errors_stored(store.read().await.total_errors);

        Ok(Self {
            listener,
            state: Arc::new(AppState {
                store,
                metrics,
                metrics_enabled: config.metrics_enabled,
            }),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let addr = self.local_addr()?;
        info!(
            addr = %addr,
            errors_file = %self.state.store.path().display(),
            "Collector listening"
        );

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    let (stream, peer) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);
                    let state = Arc::clone(&self.state);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { handle_request(req, &state).await }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            error!(peer = %peer, error = %e, "Collector HTTP connection error");
                        }
                    });
                }
                _ = shutdown.cancelled() => {
                    info!("Collector shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// Request handling
// ============================================================================

async fn handle_request(
    req: Request<Incoming>,
    state: &AppState,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let route = Route::resolve(req.method(), req.uri().path());
    debug!(method = %req.method(), path = %req.uri().path(), route = route.label(), "Request");

    let mut response = match route {
        Route::Preflight => preflight(&req),
        Route::ListErrors => list_errors(state).await,
        Route::SaveError => match read_json(req).await {
            Ok(body) => save_error(state, body).await,
            Err(response) => response,
        },
        Route::SaveBatch => match read_json(req).await {
            Ok(body) => save_batch(state, body).await,
            Err(response) => response,
        },
        Route::ClearErrors => clear_errors(state).await,
        Route::ReceiveLog => match read_json(req).await {
            Ok(body) => receive_log(state, body).await,
            Err(response) => response,
        },
        Route::Metrics if state.metrics_enabled => metrics(state),
        Route::Metrics | Route::NotFound => {
            json_response(StatusCode::NOT_FOUND, &json!({ "error": "Not found" }))
        }
    };

    state
        .metrics
        .record_request(route.label(), response.status().as_u16());
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    Ok(response)
}

/// Reads and parses a JSON body. An empty body reads as `null`.
async fn read_json(req: Request<Incoming>) -> Result<Value, Response<Full<Bytes>>> {
    let bytes = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            return Err(json_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                &json!({ "error": "Request body too large or unreadable" }),
            ));
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&bytes).map_err(|e| {
        debug!(error = %e, "Rejecting malformed JSON body");
        json_response(StatusCode::BAD_REQUEST, &json!({ "error": "Malformed JSON body" }))
    })
}

async fn list_errors(state: &AppState) -> Response<Full<Bytes>> {
    let document = state.store.read().await;
    match serde_json::to_value(&document) {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => {
            error!(error = %e, "Failed to encode error document");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": "Failed to read errors" }),
            )
        }
    }
}

async fn save_error(state: &AppState, body: Value) -> Response<Full<Bytes>> {
    if body.is_null() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &json!({ "error": "No error data provided" }),
        );
    }

    match state.store.append(vec![body]).await {
        Ok(document) => {
            state.metrics.set_errors_stored(document.total_errors);
            json_response(
                StatusCode::OK,
                &json!({ "success": true, "message": "Error saved" }),
            )
        }
        Err(e) => {
            error!(error = %e, "Failed to save error");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": "Failed to save error" }),
            )
        }
    }
}

async fn save_batch(state: &AppState, body: Value) -> Response<Full<Bytes>> {
    let errors = match body {
        Value::Object(mut map) => match map.remove("errors") {
            Some(Value::Array(errors)) => errors,
            _ => return invalid_batch(),
        },
        _ => return invalid_batch(),
    };

    let count = errors.len();
    match state.store.append(errors).await {
        Ok(document) => {
            state.metrics.set_errors_stored(document.total_errors);
            json_response(
                StatusCode::OK,
                &json!({ "success": true, "message": format!("{} errors saved", count) }),
            )
        }
        Err(e) => {
            error!(error = %e, count, "Failed to save errors");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": "Failed to save errors" }),
            )
        }
    }
}

fn invalid_batch() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::BAD_REQUEST,
        &json!({ "error": "Invalid errors data" }),
    )
}

async fn clear_errors(state: &AppState) -> Response<Full<Bytes>> {
    match state.store.clear().await {
        Ok(_) => {
            state.metrics.set_errors_stored(0);
            json_response(
                StatusCode::OK,
                &json!({ "success": true, "message": "All errors cleared" }),
            )
        }
        Err(e) => {
            error!(error = %e, "Failed to clear errors");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": "Failed to clear errors" }),
            )
        }
    }
}

/// Accepts one payload from the telemetry pipeline.
///
/// The payload must have the `LogPayload` shape; it is stored as received.
async fn receive_log(state: &AppState, body: Value) -> Response<Full<Bytes>> {
    let payload: LogPayload = match serde_json::from_value(body.clone()) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(error = %e, "Rejecting malformed log payload");
            return json_response(
                StatusCode::BAD_REQUEST,
                &json!({ "error": "Invalid log payload" }),
            );
        }
    };

    state.metrics.record_payload(payload.source.as_str());

    match state.store.append(vec![body]).await {
        Ok(document) => {
            state.metrics.set_errors_stored(document.total_errors);
            info!(
                source = %payload.source,
                message = %payload.message,
                "Log payload received"
            );
            json_response(StatusCode::OK, &json!({ "success": true }))
        }
        Err(e) => {
            error!(error = %e, "Failed to store log payload");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": "Failed to save log" }),
            )
        }
    }
}

fn metrics(state: &AppState) -> Response<Full<Bytes>> {
    match state.metrics.encode() {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
            );
            response
        }
        Err(e) => {
            let mut response =
                Response::new(Full::new(Bytes::from(format!("Failed to encode metrics: {e}"))));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

fn preflight(req: &Request<Incoming>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    let requested = req
        .headers()
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("Content-Type"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested);
    headers.insert(header::VARY, HeaderValue::from_static("Access-Control-Request-Headers"));
    response
}

fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}
