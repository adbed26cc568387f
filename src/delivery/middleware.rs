use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::http::{header::HeaderName, HeaderValue, Request, Response};
use tower::{Layer, Service};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// X-Request-Id middleware
// ---------------------------------------------------------------------------

/// Header name for request ID propagation.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Longest client-supplied request ID that is reused as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Layer that tags every request with an `X-Request-Id`.
///
/// - A usable incoming `X-Request-Id` is reused, otherwise a UUIDv4 is
///   generated.
/// - The handler runs inside a `request` span carrying the id, method and
///   path, and one completion line is logged with status and latency.
/// - The id is echoed on the response.
#[derive(Clone)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdMiddleware { inner }
    }
}

#[derive(Clone)]
pub struct RequestIdMiddleware<S> {
    inner: S,
}

fn incoming_request_id<B>(req: &Request<B>) -> Option<String> {
    let value = req.headers().get(&X_REQUEST_ID)?.to_str().ok()?.trim();
    if value.is_empty() || value.len() > MAX_REQUEST_ID_LEN {
        return None;
    }
    Some(value.to_string())
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestIdMiddleware<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let request_id =
            incoming_request_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
        let header_value = HeaderValue::from_str(&request_id).ok();

        if let Some(val) = &header_value {
            req.headers_mut().insert(X_REQUEST_ID.clone(), val.clone());
        }

        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        // Take the service that was driven to readiness, leave a clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let start = Instant::now();

        Box::pin(
            async move {
                let mut response = inner.call(req).await?;
                info!(
                    status = response.status().as_u16(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "request completed"
                );
                if let Some(val) = header_value {
                    response.headers_mut().insert(X_REQUEST_ID.clone(), val);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}
