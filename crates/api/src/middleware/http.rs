//! tower-http layers that wrap the gate chains.
//!
//! The request id is minted as a UUIDv7 [`RequestId`], echoed back in
//! `x-request-id`, and carried by the request span.

use axum::http::{HeaderValue, Method, Request, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{self, MakeRequestId};
use tower_http::trace::MakeSpan;

use gatehouse_core::RequestId;
use gatehouse_observability::request_span;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// CORS for one route: the configured origin only, credentials allowed,
/// the route's own method plus preflight.
pub fn cors_layer(allowed_origin: &HeaderValue, method: &Method) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([allowed_origin.clone()]))
        .allow_credentials(true)
        .allow_headers([header::CONTENT_TYPE])
        .allow_methods([method.clone(), Method::OPTIONS])
}

/// Mints time-ordered request ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestV7;

impl MakeRequestId for MakeRequestV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<request_id::RequestId> {
        HeaderValue::from_str(&RequestId::new().to_string())
            .ok()
            .map(request_id::RequestId::new)
    }
}

/// `TraceLayer` span maker built on [`request_span`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        request_span(request_id, request.method().as_str(), request.uri().path())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    #[test]
    fn request_ids_are_v7_uuids() {
        let req = Request::builder().body(Body::empty()).unwrap();
        let id = MakeRequestV7.make_request_id(&req).unwrap();
        let raw = id.header_value().to_str().unwrap();
        assert_eq!(raw.len(), 36);
        assert_eq!(&raw[14..15], "7");
    }
}
