//! HTTP API for the shipment service
//!
//! Routes:
//! - `GET  /api/shipment/view` - all shipments
//! - `GET  /api/shipment/{trackingId}` - one shipment
//! - `POST /api/shipment/create` - new shipment
//! - `PUT  /api/shipment/{trackingId}/status` - advance the lifecycle
//! - `GET  /health`, `GET /metrics`
//!
//! Errors are returned as `{"statusCode": n, "message": "..."}`.
//! Uses hyper for the HTTP server.

use crate::domain::error::ShipmentError;
use crate::infra::metrics::Metrics;
use crate::io::prometheus::format_prometheus_metrics;
use crate::io::validation::{CreateShipmentRequest, UpdateStatusRequest, ValidationError};
use crate::services::shipment_service::ShipmentService;
use anyhow::Context;
use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Full, Limited};
use hyper::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Request bodies larger than this are rejected
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared state for request handlers
pub struct ApiState {
    pub service: ShipmentService,
    pub metrics: Arc<Metrics>,
    pub site_id: String,
}

impl ApiState {
    pub fn new(service: ShipmentService, metrics: Arc<Metrics>, site_id: &str) -> Self {
        Self { service, metrics, site_id: site_id.to_string() }
    }
}

/// HTTP status for a service failure
pub fn status_for(err: &ShipmentError) -> StatusCode {
    match err {
        ShipmentError::NotFound(_) => StatusCode::NOT_FOUND,
        ShipmentError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
        ShipmentError::DuplicateKey(_) | ShipmentError::ExhaustedAttempts { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    status_code: u16,
    message: &'a str,
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(bytes) => Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(bytes)))
            .expect("static response should not fail"),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = ErrorBody { status_code: status.as_u16(), message };
    let bytes = serde_json::to_vec(&body).unwrap_or_default();
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(bytes)))
        .expect("static response should not fail")
}

fn service_error(err: &ShipmentError) -> Response<Full<Bytes>> {
    error_response(status_for(err), &err.to_string())
}

fn validation_error(err: &ValidationError) -> Response<Full<Bytes>> {
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

fn parse_body<'a, T: serde::Deserialize<'a>>(body: &'a [u8]) -> Result<T, Response<Full<Bytes>>> {
    serde_json::from_slice(body).map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, &format!("Invalid request body: {e}"))
    })
}

/// Dispatch one request. Pure with respect to I/O so it can be tested without sockets.
pub fn route(state: &ApiState, method: &Method, path: &str, body: &[u8]) -> Response<Full<Bytes>> {
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').skip(1).collect();

    match (method, segments.as_slice()) {
        (&Method::GET, ["health"]) => Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .expect("static response should not fail"),

        (&Method::GET, ["metrics"]) => {
            let body = format_prometheus_metrics(&state.metrics, &state.site_id);
            Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail")
        }

        (&Method::GET, ["api", "shipment", "view"]) => {
            json_response(StatusCode::OK, &state.service.list_all())
        }

        (&Method::POST, ["api", "shipment", "create"]) => {
            let request: CreateShipmentRequest = match parse_body(body) {
                Ok(request) => request,
                Err(response) => return response,
            };
            let new = match request.validate(Utc::now()) {
                Ok(new) => new,
                Err(e) => return validation_error(&e),
            };
            match state.service.create(&new.origin, &new.destination, new.estimated_delivery_date)
            {
                Ok(shipment) => {
                    let mut response = json_response(StatusCode::CREATED, &shipment);
                    if let Ok(location) =
                        format!("/api/shipment/{}", shipment.tracking_id()).parse::<HeaderValue>()
                    {
                        response.headers_mut().insert(LOCATION, location);
                    }
                    response
                }
                Err(e) => service_error(&e),
            }
        }

        (&Method::GET, ["api", "shipment", tracking_id]) => {
            match state.service.get_by_tracking_id(tracking_id) {
                Ok(shipment) => json_response(StatusCode::OK, &shipment),
                Err(e) => service_error(&e),
            }
        }

        (&Method::PUT, ["api", "shipment", tracking_id, "status"]) => {
            let request: UpdateStatusRequest = match parse_body(body) {
                Ok(request) => request,
                Err(response) => return response,
            };
            let change = match request.validate() {
                Ok(change) => change,
                Err(e) => return validation_error(&e),
            };
            match state.service.update_status(tracking_id, change.status, &change.location) {
                Ok(shipment) => json_response(StatusCode::OK, &shipment),
                Err(e) => service_error(&e),
            }
        }

        (_, ["health"] | ["metrics"] | ["api", "shipment", _] | ["api", "shipment", _, "status"]) => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }

        _ => error_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

/// Handle HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<ApiState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => route(&state, &method, &path, &collected.to_bytes()),
        Err(e) => {
            warn!(method = %method, path = %path, error = %e, "http_body_rejected");
            error_response(StatusCode::BAD_REQUEST, "Request body too large or unreadable")
        }
    };

    let status = response.status().as_u16();
    let latency_us = start.elapsed().as_micros() as u64;
    state.metrics.record_request(status, latency_us);

    if response.status().is_server_error() {
        error!(method = %method, path = %path, status = %status, latency_us = %latency_us, "http_request");
    } else {
        debug!(method = %method, path = %path, status = %status, latency_us = %latency_us, "http_request");
    }

    Ok(response)
}

/// Start the shipment API HTTP server
pub async fn start_api_server(
    addr: SocketAddr,
    state: Arc<ApiState>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener =
        TcpListener::bind(addr).await.with_context(|| format!("Failed to bind API server to {addr}"))?;

    info!(addr = %addr, site = %state.site_id, "api_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "api_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "api_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("api_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::ShipmentStore;
    use chrono::Duration;
    use serde_json::Value;

    fn state() -> ApiState {
        let metrics = Arc::new(Metrics::new());
        let service = ShipmentService::with_metrics(Arc::new(ShipmentStore::new()), metrics.clone());
        ApiState::new(service, metrics, "test")
    }

    fn body_json(response: Response<Full<Bytes>>) -> Value {
        let bytes = body_bytes(response);
        serde_json::from_slice(&bytes).unwrap()
    }

    fn body_bytes(response: Response<Full<Bytes>>) -> Bytes {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async { response.into_body().collect().await.unwrap().to_bytes() })
    }

    fn create_body(origin: &str, destination: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "origin": origin,
            "destination": destination,
            "estimatedDeliveryDate": (Utc::now() + Duration::days(7)).to_rfc3339(),
        }))
        .unwrap()
    }

    fn create(state: &ApiState) -> String {
        let response = route(state, &Method::POST, "/api/shipment/create", &create_body("Tokyo", "Singapore"));
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response)["trackingId"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_create_returns_201_with_location() {
        let state = state();
        let response =
            route(&state, &Method::POST, "/api/shipment/create", &create_body("Tokyo", "Singapore"));

        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response.headers().get(LOCATION).unwrap().to_str().unwrap().to_string();
        let json = body_json(response);
        let id = json["trackingId"].as_str().unwrap();
        assert_eq!(location, format!("/api/shipment/{id}"));
        assert_eq!(json["currentStatus"], "Created");
        assert_eq!(json["milestones"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_create_validation_failure() {
        let state = state();
        let response = route(&state, &Method::POST, "/api/shipment/create", &create_body("T", "Singapore"));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response);
        assert_eq!(json["statusCode"], 400);
        assert_eq!(json["message"], "Origin must be between 2 and 100 characters");
        assert!(state.service.list_all().is_empty());
    }

    #[test]
    fn test_create_accepts_eta_without_offset() {
        let state = state();
        let body = br#"{"origin":"Oslo","destination":"Bergen","estimatedDeliveryDate":"2099-01-01T00:00:00"}"#;

        let response = route(&state, &Method::POST, "/api/shipment/create", body);

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response)["estimatedDeliveryDate"], "2099-01-01T00:00:00Z");
    }

    #[test]
    fn test_malformed_json() {
        let state = state();
        let response = route(&state, &Method::POST, "/api/shipment/create", b"{not json");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response)["message"].as_str().unwrap().starts_with("Invalid request body"));
    }

    #[test]
    fn test_get_by_tracking_id() {
        let state = state();
        let id = create(&state);

        let response = route(&state, &Method::GET, &format!("/api/shipment/{id}"), b"");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response)["origin"], "Tokyo");

        let response = route(&state, &Method::GET, "/api/shipment/UNKNOWN000000", b"");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response)["statusCode"], 404);
    }

    #[test]
    fn test_update_status_flow() {
        let state = state();
        let id = create(&state);
        let path = format!("/api/shipment/{id}/status");

        let response =
            route(&state, &Method::PUT, &path, br#"{"status":"PickedUp","location":"Tokyo Airport"}"#);
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response);
        assert_eq!(json["currentStatus"], "PickedUp");
        assert_eq!(json["milestones"].as_array().unwrap().len(), 2);

        // Skipping InTransit
        let response =
            route(&state, &Method::PUT, &path, br#"{"status":"Delivered","location":"Singapore"}"#);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = body_json(response)["message"].as_str().unwrap().to_string();
        assert!(message.contains("PickedUp"));
        assert!(message.contains("Delivered"));
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let state = state();
        let body = br#"{"status":"InTransit","location":"Hub"}"#;

        for path in ["/api/shipment/UNKNOWN000000/status", "/api/shipment/DHL000000/status"] {
            let response = route(&state, &Method::PUT, path, body);
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
            let json = body_json(response);
            assert_eq!(json["statusCode"], 404);
            assert_eq!(json["message"], "Shipment not found");
        }
    }

    #[test]
    fn test_view_lists_in_creation_order() {
        let state = state();
        let first = create(&state);
        let second = create(&state);

        let response = route(&state, &Method::GET, "/api/shipment/view", b"");
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response);
        let ids: Vec<&str> =
            json.as_array().unwrap().iter().map(|s| s["trackingId"].as_str().unwrap()).collect();
        assert_eq!(ids, [first.as_str(), second.as_str()]);
    }

    #[test]
    fn test_health_metrics_and_fallbacks() {
        let state = state();
        assert_eq!(route(&state, &Method::GET, "/health", b"").status(), StatusCode::OK);

        let metrics = body_bytes(route(&state, &Method::GET, "/metrics", b""));
        assert!(String::from_utf8_lossy(&metrics).contains("shipments_created_total{site=\"test\"}"));

        assert_eq!(
            route(&state, &Method::DELETE, "/api/shipment/DHL123456", b"").status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(route(&state, &Method::GET, "/nope", b"").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_status_mapping() {
        use crate::domain::types::{ShipmentStatus, TrackingId};
        use crate::domain::error::TransitionError;

        assert_eq!(status_for(&ShipmentError::NotFound(TrackingId::new("x"))), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&TransitionError::TerminalState {
                from: ShipmentStatus::Delivered,
                to: ShipmentStatus::InTransit
            }
            .into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ShipmentError::ExhaustedAttempts { attempts: 16 }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
