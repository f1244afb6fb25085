//! Error taxonomy shared by the model gateway, the store adapter, and the
//! HTTP server.
//!
//! Each variant maps to one HTTP status via [`AppError::status`] and one
//! machine-readable code via [`AppError::code`]. Upstream failures keep the
//! response headers and a truncated body so callers can inspect rate-limit
//! hints.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use thiserror::Error;

/// Longest raw upstream/model text kept for diagnostics.
pub const MAX_DIAGNOSTIC_CHARS: usize = 2000;

/// Truncate text for inclusion in an error payload.
pub fn truncate_for_diagnostics(raw: &str) -> String {
    if raw.chars().count() > MAX_DIAGNOSTIC_CHARS {
        let head: String = raw.chars().take(MAX_DIAGNOSTIC_CHARS).collect();
        format!("{head}\n...[truncated]")
    } else {
        raw.to_string()
    }
}

/// Details captured from a non-success upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Response body, already truncated.
    pub raw: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(
        "Total uploaded file size is too large ({} KB). Limit is {} KB. \
         Try uploading fewer or smaller files.",
        kilobytes(.measured_bytes),
        kilobytes(.limit_bytes)
    )]
    PayloadTooLarge { measured_bytes: u64, limit_bytes: u64 },

    #[error("Upstream API request failed after retries: {}", .0.status)]
    TransientUpstream(UpstreamResponse),

    #[error("Rate limit exceeded: API request failed: {}", .0.status)]
    RateLimited(UpstreamResponse),

    #[error("Upstream API request failed: {}", .0.status)]
    Upstream(UpstreamResponse),

    #[error("transport error talking to the model API: {0}")]
    Transport(String),

    #[error("model returned output that is not valid JSON")]
    MalformedModelOutput { raw: String },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

fn kilobytes(bytes: &u64) -> u64 {
    (*bytes as f64 / 1024.0).round() as u64
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) | AppError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::TransientUpstream(_)
            | AppError::Upstream(_)
            | AppError::Transport(_)
            | AppError::MalformedModelOutput { .. } => StatusCode::BAD_GATEWAY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "configuration",
            AppError::PayloadTooLarge { .. } => "payload_too_large",
            AppError::TransientUpstream(_) => "upstream_unavailable",
            AppError::RateLimited(_) => "rate_limited",
            AppError::Upstream(_) => "upstream_error",
            AppError::Transport(_) => "transport",
            AppError::MalformedModelOutput { .. } => "malformed_model_output",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::Persistence(_) => "persistence",
        }
    }

    /// Upstream response details, when the error carries them.
    pub fn upstream(&self) -> Option<&UpstreamResponse> {
        match self {
            AppError::TransientUpstream(r) | AppError::RateLimited(r) | AppError::Upstream(r) => {
                Some(r)
            }
            _ => None,
        }
    }

    /// Raw text kept for diagnostics (upstream body or model output).
    pub fn raw(&self) -> Option<&str> {
        match self {
            AppError::MalformedModelOutput { raw } => Some(raw),
            other => other.upstream().map(|r| r.raw.as_str()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}
