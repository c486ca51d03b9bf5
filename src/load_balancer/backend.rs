//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Track liveness as reported by the health check loop
//! - Count routed requests (reserved for weighted selection)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use axum::http::uri::Authority;
use url::Url;

/// Parse a configured backend address into a base URL.
///
/// Accepts `http://host:port` or bare `host:port`. Only plain HTTP is
/// supported; TLS towards backends is not terminated here. Requests are
/// forwarded with their original path, so a base path, query or fragment
/// on the backend address is rejected rather than silently dropped.
pub fn parse_backend_url(raw: &str) -> Result<Url, String> {
    let raw = raw.trim();
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    let url = Url::parse(&candidate).map_err(|e| format!("'{}': {}", raw, e))?;
    if url.scheme() != "http" {
        return Err(format!("'{}': unsupported scheme '{}'", raw, url.scheme()));
    }
    if url.host_str().is_none() {
        return Err(format!("'{}': missing host", raw));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(format!(
            "'{}': backend address must not carry a path or query",
            raw
        ));
    }
    Ok(url)
}

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// The address as configured; identifies the backend in logs.
    pub addr: String,
    /// Pre-calculated base URL.
    pub base_url: Url,
    /// `host:port` used when rewriting forwarded request URIs.
    pub authority: Authority,
    /// Liveness flag. Written by the health check loop, read by routing.
    alive: RwLock<bool>,
    /// Number of requests routed to this backend.
    request_count: AtomicU64,
}

impl Backend {
    /// Create a new backend from its configured address. Backends start alive.
    pub fn new(addr: &str) -> Result<Self, String> {
        let base_url = parse_backend_url(addr)?;
        let host = base_url
            .host_str()
            .ok_or_else(|| format!("'{}': missing host", addr))?;
        let port = base_url.port_or_known_default().unwrap_or(80);
        let authority = format!("{}:{}", host, port)
            .parse::<Authority>()
            .map_err(|e| format!("'{}': {}", addr, e))?;

        Ok(Self {
            addr: addr.trim().to_string(),
            base_url,
            authority,
            alive: RwLock::new(true),
            request_count: AtomicU64::new(0),
        })
    }

    /// Return true if the last health check found the backend alive.
    pub fn is_alive(&self) -> bool {
        *self.alive.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set liveness. Returns the previous value so callers can log transitions.
    pub fn set_alive(&self, alive: bool) -> bool {
        let mut guard = self.alive.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, alive)
    }

    /// Record one routed request.
    pub fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests routed so far.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Full URL for `path` on this backend.
    pub fn url_for(&self, path: &str) -> String {
        format!("http://{}{}", self.authority, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_prefixed_addresses() {
        let a = Backend::new("127.0.0.1:8081").unwrap();
        assert_eq!(a.authority.as_str(), "127.0.0.1:8081");

        let b = Backend::new("http://localhost:8082").unwrap();
        assert_eq!(b.authority.as_str(), "localhost:8082");
        assert_eq!(b.addr, "http://localhost:8082");

        let c = Backend::new("http://backend.internal").unwrap();
        assert_eq!(c.authority.as_str(), "backend.internal:80");
    }

    #[test]
    fn rejects_https() {
        assert!(parse_backend_url("https://localhost:8443").is_err());
    }

    #[test]
    fn rejects_base_path_and_query() {
        assert!(parse_backend_url("http://127.0.0.1:8081/api").is_err());
        assert!(parse_backend_url("127.0.0.1:8081/api/v1").is_err());
        assert!(parse_backend_url("http://127.0.0.1:8081/?x=1").is_err());
        assert!(parse_backend_url("http://127.0.0.1:8081/").is_ok());
    }

    #[test]
    fn liveness_transitions() {
        let b = Backend::new("127.0.0.1:8081").unwrap();
        assert!(b.is_alive());
        assert!(b.set_alive(false));
        assert!(!b.is_alive());
        assert!(!b.set_alive(true));
        assert!(b.is_alive());
    }

    #[test]
    fn url_for_joins_path() {
        let b = Backend::new("127.0.0.1:8081").unwrap();
        assert_eq!(b.url_for("/health"), "http://127.0.0.1:8081/health");
    }
}
