use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// Request ID middleware: propagate incoming X-Request-Id or generate a new UUID v4.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    let req_id_value = req
        .headers()
        .get(&header_name)
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(generate_request_id);

    // Downstream layers (the trace span) read it from the extensions
    req.extensions_mut().insert(req_id_value.clone());

    let mut res = next.run(req).await;
    res.headers_mut().insert(header_name, req_id_value);
    res
}

fn generate_request_id() -> HeaderValue {
    let id = Uuid::new_v4().to_string();
    // A hyphenated UUID is always a valid header value
    HeaderValue::from_str(&id).unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}
