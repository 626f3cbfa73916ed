// ABOUTME: Bearer token serialization for token endpoint success responses
// ABOUTME: Builds the RFC 6750 JSON body with expires_in derived from the expiry instant
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::OAuthError;
use crate::models::Token;

/// Attribute names owned by the token response itself; extended attributes
/// may not shadow them
const RESERVED_ATTRIBUTES: &[&str] = &[
    "access_token",
    "token_type",
    "expires_in",
    "refresh_token",
    "scope",
    "client",
    "user",
    "access_token_expires_at",
    "refresh_token_expires_at",
    "authorization_code",
];

/// RFC 6750 Bearer token response body
#[derive(Debug, Serialize)]
pub struct BearerToken {
    /// The issued access token
    pub access_token: String,
    /// Always `"Bearer"`
    pub token_type: &'static str,
    /// Seconds until the access token expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Paired refresh token, when issued
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Granted scope, when narrower than or different from the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Extended attributes, present only when the handler allows them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BearerToken {
    /// Build the response body from an issued token
    ///
    /// Extended attributes are carried only when `allow_extended_attributes`
    /// is set, and never under a reserved name.
    #[must_use]
    pub fn from_token(token: &Token, allow_extended_attributes: bool) -> Self {
        let extra = if allow_extended_attributes {
            token
                .extra
                .iter()
                .filter(|(key, _)| !RESERVED_ATTRIBUTES.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        } else {
            Map::new()
        };

        Self {
            access_token: token.access_token.clone(),
            token_type: "Bearer",
            expires_in: token.access_token_lifetime(Utc::now()),
            refresh_token: token.refresh_token.clone(),
            scope: token.scope.clone(),
            extra,
        }
    }

    /// Serialize into the JSON response body
    ///
    /// # Errors
    /// Returns `server_error` if an extended attribute fails to serialize
    pub fn into_body(self) -> Result<Value, OAuthError> {
        serde_json::to_value(self)
            .map_err(|e| OAuthError::server_error(format!("token serialization failed: {e}")))
    }
}
