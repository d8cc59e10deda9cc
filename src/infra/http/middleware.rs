use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use tracing::{Instrument, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Correlates one request across its log lines and its response.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Run the request inside a `request` span that carries its id, echo the id
/// back in `x-request-id` and log failed responses with their error report.
pub async fn trace_requests(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let query = request.uri().query().unwrap_or("").to_string();
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let start = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;

    let status = response.status();
    counter!("postgrid_http_responses_total", "class" => status_class(status)).increment(1);
    if status.is_client_error() || status.is_server_error() {
        let report = response.extensions_mut().remove::<ErrorReport>();
        span.in_scope(|| log_failure(status, &query, start.elapsed(), report));
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn log_failure(status: StatusCode, query: &str, elapsed: Duration, report: Option<ErrorReport>) {
    let (source, messages) = match report {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages
        .first()
        .map(String::as_str)
        .unwrap_or("no diagnostic available");
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    if status.is_server_error() {
        error!(
            target: "postgrid::http",
            status = status.as_u16(),
            query,
            elapsed_ms,
            source,
            detail,
            chain = ?messages,
            "request failed",
        );
    } else {
        warn!(
            target: "postgrid::http",
            status = status.as_u16(),
            query,
            elapsed_ms,
            source,
            detail,
            chain = ?messages,
            "client request error",
        );
    }
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}
