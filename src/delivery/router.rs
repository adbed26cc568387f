use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use http::{header, HeaderMap, HeaderValue, Method};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::core::config::{AppConfig, DeliveryConfig};
use crate::ingest::http_upload::HttpUploadHandler;
use crate::ingest::Ingestor;
use crate::storage::StoreBackend;

use super::handlers;
use super::middleware::RequestIdLayer;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<StoreBackend>,
    pub uploads: Arc<HttpUploadHandler<Arc<StoreBackend>>>,
    pub config: AppConfig,
    pub start_time: Instant,
    /// Prometheus metrics handle for rendering /metrics endpoint.
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(store: Arc<StoreBackend>, config: AppConfig, metrics_handle: PrometheusHandle) -> Self {
        let ingestor = Ingestor::new(store.clone(), &config.ingest);
        Self {
            store,
            uploads: Arc::new(HttpUploadHandler::new(ingestor)),
            config,
            start_time: Instant::now(),
            metrics_handle,
        }
    }
}

/// Build the full Axum router.
///
/// Route table:
/// - `GET|HEAD /video/{id}`     range-aware playback
/// - `POST /upload/{category}`  one route per enabled category
/// - `GET /healthz`             liveness
/// - `GET /readyz`              readiness (storage probe)
/// - `GET /metrics`             Prometheus metrics
///
/// Category names were validated when the configuration was loaded; an
/// unparsable entry here is skipped with a warning.
pub fn build_router(state: AppState) -> Router {
    let delivery = &state.config.delivery;
    info!(
        cache_control = %delivery.cache_control,
        cors_origins = ?delivery.cors_allowed_origins,
        "delivery configuration loaded"
    );
    let cors = cors_layer(delivery);

    let mut router = Router::new()
        .route("/video/{id}", get(handlers::serve_video))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics_handler));

    let categories = match state.config.ingest.enabled_categories() {
        Ok(categories) => categories,
        Err(e) => {
            warn!(error = %e, "invalid upload categories, no upload routes mounted");
            Vec::new()
        }
    };
    for category in categories {
        let path = format!("/upload/{}", category);
        info!(%category, %path, "upload route enabled");
        router = router.route(
            &path,
            post(
                move |State(state): State<AppState>, headers: HeaderMap, body: Body| {
                    handlers::upload_media(state, category, headers, body)
                },
            ),
        );
    }

    router
        .layer(cors)
        .layer(RequestIdLayer)
        .with_state(state)
}

fn cors_layer(config: &DeliveryConfig) -> CorsLayer {
    let origins = &config.cors_allowed_origins;
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS, Method::POST])
        .allow_headers([header::RANGE, header::CONTENT_TYPE])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
        ])
        .max_age(std::time::Duration::from_secs(86400))
}
