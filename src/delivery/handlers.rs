use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::core::error::{DeliveryError, IngestError};
use crate::core::types::{MediaId, UploadCategory};
use crate::observability::metrics as obs;
use crate::storage::MediaStore;

use super::responder::{self, MediaResponse};
use super::router::AppState;

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    status: u16,
}

fn error_json(status: StatusCode, error: &str, message: &str) -> Response {
    let body = ErrorResponse {
        error: error.to_string(),
        message: message.to_string(),
        status: status.as_u16(),
    };
    (status, Json(body)).into_response()
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// `GET|HEAD /video/{id}`
pub async fn serve_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    let start = std::time::Instant::now();
    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    match responder::serve(state.store.as_ref(), &id, range_header).await {
        Ok(media) => {
            let kind = if media.is_partial() { "partial" } else { "full" };
            obs::inc_delivery_request(media.status_code(), kind);
            if method != Method::HEAD {
                obs::add_delivery_bytes_sent(media.body.len() as u64);
            }
            obs::record_delivery_request_duration(kind, start.elapsed().as_secs_f64());
            debug!(
                %id,
                status = media.status_code(),
                bytes = media.body.len(),
                "serving media object"
            );
            build_media_response(media, &state.config.delivery.cache_control, &method)
        }
        Err(e) => {
            obs::inc_delivery_request(e.status_code(), "error");
            obs::record_delivery_request_duration("error", start.elapsed().as_secs_f64());
            delivery_error_response(&id, &e)
        }
    }
}

/// Build a 200/206 response.
///
/// Headers:
/// - Content-Type (stored MIME type)
/// - Content-Length (window length)
/// - Content-Range (206 only)
/// - Accept-Ranges: bytes
/// - Cache-Control
/// - ETag
fn build_media_response(media: MediaResponse, cache_control: &str, method: &Method) -> Response {
    let status = status_from(media.status_code());
    let content_range = media.content_range();
    let etag = media.etag();
    let body = if *method == Method::HEAD {
        Body::empty()
    } else {
        Body::from(media.body.clone())
    };

    let mut response = (
        status,
        [
            (header::CONTENT_TYPE, media.mime_type.clone()),
            (header::CONTENT_LENGTH, media.body.len().to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CACHE_CONTROL, cache_control.to_string()),
            (header::ETAG, etag),
        ],
        body,
    )
        .into_response();

    if let Some(value) = content_range.and_then(|v| HeaderValue::from_str(&v).ok()) {
        response.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    response
}

fn delivery_error_response(id: &str, err: &DeliveryError) -> Response {
    let status = status_from(err.status_code());
    match err {
        DeliveryError::ObjectNotFound { .. } | DeliveryError::PayloadMissing { .. } => {
            let reason = err.not_found_reason().unwrap_or("object_missing");
            obs::inc_delivery_not_found(reason);
            info!(%id, reason, "media object not found");
        }
        DeliveryError::RangeNotSatisfiable { .. } => {}
        DeliveryError::IntegrityFault { .. } | DeliveryError::Storage(_) => {
            error!(%id, error = %err, "failed to serve media object");
        }
    }

    let mut response = error_json(status, err.error_code(), &err.public_message());
    if let DeliveryError::RangeNotSatisfiable { total_bytes } = err {
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", total_bytes)) {
            headers.insert(header::CONTENT_RANGE, value);
        }
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }
    response
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// `POST /upload/{category}`. Mounted once per enabled category.
pub async fn upload_media(
    state: AppState,
    category: UploadCategory,
    headers: HeaderMap,
    body: Body,
) -> Response {
    match state.uploads.handle(category, &headers, body).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => ingest_error_response(&e),
    }
}

fn ingest_error_response(err: &IngestError) -> Response {
    let status = status_from(err.status_code());
    let message = match err {
        IngestError::Storage(_) => {
            error!(error = %err, "upload failed in storage");
            "Failed to store upload.".to_string()
        }
        _ => err.to_string(),
    };
    error_json(status, err.error_code(), &message)
}

// ---------------------------------------------------------------------------
// Health endpoints
// ---------------------------------------------------------------------------

/// `GET /metrics` in Prometheus text exposition format.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    let metrics = state.metrics_handle.render();
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
        .into_response()
}

/// `GET /healthz`: liveness probe.
pub async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    let uptime = state.start_time.elapsed().as_secs();
    Json(serde_json::json!({
        "status": "healthy",
        "uptime_secs": uptime,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /readyz`: readiness probe.
///
/// Looks up a fresh random id; any answer other than an error means the
/// store is reachable.
pub async fn readyz(State(state): State<AppState>) -> Response {
    let mut checks = serde_json::Map::new();

    let all_ok = match state.store.get_by_id(MediaId::new()).await {
        Ok(_) => {
            checks.insert(
                "storage".to_string(),
                serde_json::json!({"status": "ok", "backend": state.store.name()}),
            );
            true
        }
        Err(e) => {
            warn!(error = %e, "readiness storage probe failed");
            checks.insert(
                "storage".to_string(),
                serde_json::json!({"status": "error", "error": e.to_string()}),
            );
            false
        }
    };

    let (http_status, status) = if all_ok {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        http_status,
        Json(serde_json::json!({
            "status": status,
            "checks": checks,
        })),
    )
        .into_response()
}
