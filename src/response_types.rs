// ABOUTME: Authorization endpoint response type encoders building redirect URIs
// ABOUTME: Only the `code` response type is built in; `token` is reserved
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use url::Url;

use crate::errors::OAuthError;

/// Encodes an authorization result onto the client's redirect URI
pub trait ResponseType: Send + Sync {
    /// Append this response's parameters to `redirect_uri`, preserving any
    /// query parameters already present
    fn build_redirect_uri(&self, redirect_uri: &str) -> Result<Url, OAuthError>;
}

/// The `code` response type (RFC 6749 §4.1.2)
pub struct CodeResponseType {
    code: String,
}

impl CodeResponseType {
    /// Wrap an issued authorization code
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl ResponseType for CodeResponseType {
    fn build_redirect_uri(&self, redirect_uri: &str) -> Result<Url, OAuthError> {
        let mut url = Url::parse(redirect_uri).map_err(|_| {
            OAuthError::server_error("redirect URI is not parseable")
        })?;
        url.query_pairs_mut().append_pair("code", &self.code);
        Ok(url)
    }
}
