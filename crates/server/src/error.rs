//! Structured errors for the waypost server.
//!
//! Strategies answer every intercepted page or API request themselves; these
//! errors only surface for malformed requests, blocked or failed
//! pass-through requests, and uncached static assets with the origin down.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The incoming request could not be turned into an upstream request.
    #[error("INVALID_REQUEST: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Upstream(#[from] waypost_core::Error),
}

impl ProxyError {
    /// Stable code logged with every failed request.
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::InvalidRequest(_) => "INVALID_REQUEST",
            ProxyError::Upstream(e) => e.code(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(waypost_core::Error::TargetBlocked(_)) => StatusCode::FORBIDDEN,
            ProxyError::Upstream(e) if e.is_network_failure() => StatusCode::BAD_GATEWAY,
            ProxyError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(status = status.as_u16(), code = self.code(), error = %self, "request failed");
        (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], self.to_string()).into_response()
    }
}
