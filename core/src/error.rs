//! Error types for the fetch pipeline.
//!
//! # Design
//! Inside the pipeline, failures are kept apart by stage in [`FetchError`]:
//! bad options, transport rejection, missing origin proof, and non-success
//! status. None of these reach the caller directly. The client boundary folds
//! every one of them into a single [`XhrError`] that names the target origin
//! (never the full URL, which may carry tokens in its query) and keeps the
//! underlying message. An `HttpError` response survives the fold so callers can
//! still inspect status and body.

use thiserror::Error;

use crate::http::Response;

/// Category tag attached to every caller-facing error.
pub const XHR_ERROR_CATEGORY: &str = "XHR";

/// A transport-level rejection: network, DNS, or a response that could not be
/// read. Not retried and not classified.
#[derive(Debug, Error)]
#[error("{transport} transport failed: {message}")]
pub struct TransportError {
    pub transport: &'static str,
    pub message: String,
}

impl TransportError {
    pub fn new(transport: &'static str, message: impl Into<String>) -> Self {
        Self {
            transport,
            message: message.into(),
        }
    }
}

/// Stage-specific failures produced between normalization and verification.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Contradictory or malformed request options. Detected before dispatch;
    /// never reaches a transport.
    #[error("invalid request configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    TransportFailure(#[from] TransportError),

    /// The response did not carry the expected source-origin proof.
    #[error(
        "response from {target_origin} must carry an allow-source-origin header matching the current origin"
    )]
    CorsVerificationFailed { target_origin: String },

    /// Non-2xx status while failures were not allowed. Keeps the response.
    #[error("HTTP error {status}")]
    HttpError { status: u16, response: Box<Response> },
}

impl FetchError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        FetchError::InvalidConfiguration(message.into())
    }
}

/// Errors raised while turning a `ClientConfig` into an `Environment`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid location {location:?}: {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("malformed client configuration: {0}")]
    Malformed(String),

    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The one error type callers of `XhrClient` ever see.
#[derive(Debug, Error)]
#[error("{category}: Failed fetching ({target_origin}/...): {message}")]
pub struct XhrError {
    category: &'static str,
    target_origin: String,
    message: String,
    response: Option<Box<Response>>,
}

impl XhrError {
    /// Wrap a pipeline failure for `target_origin`.
    pub fn wrap(target_origin: impl Into<String>, error: FetchError) -> Self {
        let message = error.to_string();
        let response = match error {
            FetchError::HttpError { response, .. } => Some(response),
            _ => None,
        };
        Self {
            category: XHR_ERROR_CATEGORY,
            target_origin: target_origin.into(),
            message,
            response,
        }
    }

    pub fn category(&self) -> &'static str {
        self.category
    }

    pub fn target_origin(&self) -> &str {
        &self.target_origin
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The failed response, present only for non-success statuses.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    pub fn into_response(self) -> Option<Response> {
        self.response.map(|r| *r)
    }
}
