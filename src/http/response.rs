//! Response handling and transformation.
//!
//! # Responsibilities
//! - Hand backend responses back to the client (status, headers, body)
//! - Produce the plain-text error replies of the load balancer

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use hyper::body::Incoming;

use crate::http::request::strip_hop_by_hop;

pub const TOO_MANY_REQUESTS: &str = "Too Many Requests";
pub const SERVICE_UNAVAILABLE: &str = "Service Unavailable";
pub const LIMITER_UNAVAILABLE: &str = "Rate Limiter Unavailable";
pub const BAD_GATEWAY: &str = "Bad Gateway";

/// Stream a backend response through, minus hop-by-hop headers.
pub fn from_upstream(response: Response<Incoming>) -> axum::response::Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

/// A short `text/plain` reply generated by the proxy itself.
pub fn plain(status: StatusCode, message: &'static str) -> axum::response::Response {
    let mut response = (status, message).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
