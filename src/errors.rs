// ABOUTME: OAuth 2.0 error taxonomy with stable machine names and HTTP status mapping
// ABOUTME: Defines the error kinds sent in token responses and authorize redirects per RFC 6749
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Machine-readable OAuth 2.0 error kinds (RFC 6749 §5.2, §4.1.2.1; RFC 6750 §3.1)
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing, malformed, or duplicated request parameter
    InvalidRequest,
    /// Unknown client or failed client authentication
    InvalidClient,
    /// Authorization code or refresh token is invalid, expired, or mismatched
    InvalidGrant,
    /// Requested scope is unknown or exceeds what was granted
    InvalidScope,
    /// Bearer token is invalid or expired (resource side)
    InvalidToken,
    /// Client is not permitted to use the requested grant
    UnauthorizedClient,
    /// No credentials presented on a protected resource
    UnauthorizedRequest,
    /// Unknown `grant_type`
    UnsupportedGrantType,
    /// Unknown `response_type`
    UnsupportedResponseType,
    /// Resource owner denied consent
    AccessDenied,
    /// Token lacks the scope required by the resource
    InsufficientScope,
    /// Unexpected internal failure
    ServerError,
    /// Programmer error in host configuration
    InvalidArgument,
}

impl ErrorKind {
    /// Stable machine name sent in response bodies and redirect parameters
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidScope => "invalid_scope",
            Self::InvalidToken => "invalid_token",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnauthorizedRequest => "unauthorized_request",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::AccessDenied => "access_denied",
            Self::InsufficientScope => "insufficient_scope",
            Self::ServerError => "server_error",
            Self::InvalidArgument => "invalid_argument",
        }
    }

    /// Default HTTP status code for this kind
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidRequest
            | Self::InvalidGrant
            | Self::InvalidScope
            | Self::UnauthorizedClient
            | Self::UnsupportedGrantType
            | Self::UnsupportedResponseType
            | Self::AccessDenied
            | Self::InvalidClient => 400,
            Self::InvalidToken | Self::UnauthorizedRequest => 401,
            Self::InsufficientScope => 403,
            Self::InvalidArgument => 500,
            Self::ServerError => 503,
        }
    }
}

/// Protocol error carrying a taxonomy kind, a description, and an HTTP status
///
/// The status usually follows the kind; `invalid_client` is upgraded to 401
/// when the client authenticated through the `Authorization` header.
#[derive(Debug, Clone, Error)]
#[error("{}: {message}", .kind.as_str())]
pub struct OAuthError {
    kind: ErrorKind,
    message: String,
    status: u16,
}

impl OAuthError {
    /// Create an error of the given kind with its default status
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: kind.http_status(),
        }
    }

    /// Override the HTTP status (e.g. 401 for header-authenticated clients)
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Create an `invalid_request` error
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Create an `invalid_client` error
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidClient, message)
    }

    /// Create an `invalid_grant` error
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidGrant, message)
    }

    /// Create an `invalid_scope` error
    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidScope, message)
    }

    /// Create an `invalid_token` error
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidToken, message)
    }

    /// Create an `unauthorized_client` error
    #[must_use]
    pub fn unauthorized_client(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnauthorizedClient, message)
    }

    /// Create an `unauthorized_request` error
    #[must_use]
    pub fn unauthorized_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnauthorizedRequest, message)
    }

    /// Create an `unsupported_grant_type` error
    #[must_use]
    pub fn unsupported_grant_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedGrantType, message)
    }

    /// Create an `unsupported_response_type` error
    #[must_use]
    pub fn unsupported_response_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedResponseType, message)
    }

    /// Create an `access_denied` error
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied, message)
    }

    /// Create an `insufficient_scope` error
    #[must_use]
    pub fn insufficient_scope(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientScope, message)
    }

    /// Create a `server_error`
    #[must_use]
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerError, message)
    }

    /// Create an `invalid_argument` error for host configuration mistakes
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Wrap a model adapter failure as `server_error`, logging the cause
    #[must_use]
    pub fn server_error_from(err: &anyhow::Error) -> Self {
        error!("model operation failed: {err:#}");
        Self::server_error(format!("{err}"))
    }

    /// Taxonomy kind of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Machine name sent on the wire
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.message
    }

    /// HTTP status code for this error
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// JSON body for error responses
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.name(),
            error_description: Some(self.message.clone()),
        }
    }
}

/// Serialized error response body (RFC 6749 §5.2)
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error name
    pub error: &'static str,
    /// Human-readable error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_names_are_stable() {
        assert_eq!(ErrorKind::InvalidRequest.as_str(), "invalid_request");
        assert_eq!(ErrorKind::UnsupportedGrantType.as_str(), "unsupported_grant_type");
        assert_eq!(ErrorKind::InsufficientScope.as_str(), "insufficient_scope");
        assert_eq!(ErrorKind::ServerError.as_str(), "server_error");
    }

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(OAuthError::invalid_request("x").status(), 400);
        assert_eq!(OAuthError::invalid_token("x").status(), 401);
        assert_eq!(OAuthError::insufficient_scope("x").status(), 403);
        assert_eq!(OAuthError::invalid_argument("x").status(), 500);
        assert_eq!(OAuthError::server_error("x").status(), 503);
    }

    #[test]
    fn invalid_client_upgrades_to_401() {
        let err = OAuthError::invalid_client("bad credentials").with_status(401);
        assert_eq!(err.kind(), ErrorKind::InvalidClient);
        assert_eq!(err.status(), 401);
    }

    #[test]
    fn body_serializes_name_and_description() {
        let body = OAuthError::invalid_grant("authorization code has expired").to_body();
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"error\":\"invalid_grant\""));
        assert!(json.contains("\"error_description\":\"authorization code has expired\""));
    }
}
