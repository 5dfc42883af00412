//! Error types for SitePulse.
//!
//! A single `thiserror` enum covers every failure the dashboard can hit:
//! startup configuration, upstream transport, upstream status codes, JSON
//! decoding and template rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

/// Custom error type for SitePulse operations.
///
/// `#[from]` conversions let the `?` operator lift library errors into
/// this type at every call site.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// A required environment variable is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error parsing JSON data.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Error making HTTP requests (connection refused, timeout, bad body).
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The API key cannot be used as a header value.
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// The upstream controller answered with a non-2xx status.
    #[error("API request failed: {reason}")]
    UpstreamStatus { status: u16, reason: String },

    /// The site list could not be fetched, so the whole cycle failed.
    #[error("Failed to fetch sites: {0}")]
    SiteListFetch(#[source] Box<DashboardError>),

    /// Error rendering an HTML template.
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
}

impl DashboardError {
    /// HTTP status a proxy route should answer with for this error.
    ///
    /// Upstream status codes pass through unchanged; everything else is a
    /// server-side failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UpstreamStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::SiteListFetch(inner) => inner.status_code(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_passes_through() {
        let err = DashboardError::UpstreamStatus {
            status: 404,
            reason: "Not Found".into(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "API request failed: Not Found");
    }

    #[test]
    fn test_invalid_upstream_status_maps_to_bad_gateway() {
        let err = DashboardError::UpstreamStatus {
            status: 1000,
            reason: String::new(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_site_list_failure_keeps_inner_status() {
        let err = DashboardError::SiteListFetch(Box::new(DashboardError::UpstreamStatus {
            status: 401,
            reason: "Unauthorized".into(),
        }));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            err.to_string(),
            "Failed to fetch sites: API request failed: Unauthorized"
        );
    }

    #[test]
    fn test_config_error_is_internal() {
        let err = DashboardError::Config("UNIFI_API_KEY is required".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
