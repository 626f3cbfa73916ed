// ABOUTME: Entity value objects exchanged between the handlers and the persistence model
// ABOUTME: Clients, users, tokens, and authorization codes live for one request only
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A registered OAuth 2.0 client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Client identifier
    pub id: String,
    /// Grant names this client may use; must be non-empty
    pub grants: Vec<String>,
    /// Registered absolute redirect URIs; required for `authorization_code`
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    /// Per-client access token lifetime in seconds, overriding server config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_lifetime: Option<i64>,
    /// Per-client refresh token lifetime in seconds, overriding server config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_lifetime: Option<i64>,
}

/// The resource owner as supplied by the model; opaque beyond its identity key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Identity key
    pub id: String,
    /// Any further attributes the model attaches; passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// User with an identity key and no extra attributes
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: Map::new(),
        }
    }
}

/// A single-use authorization code bound to a client, user, and redirect URI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The opaque code value
    pub authorization_code: String,
    /// Absolute expiry instant
    pub expires_at: DateTime<Utc>,
    /// Redirect URI the code was issued against, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    /// Scope delegated with the code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Client the code was issued to
    pub client: Client,
    /// Resource owner who delegated authorization
    pub user: User,
}

/// Authorization code fields handed to the model for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuthorizationCode {
    /// The opaque code value
    pub authorization_code: String,
    /// Absolute expiry instant
    pub expires_at: DateTime<Utc>,
    /// Redirect URI the code is bound to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    /// Scope delegated with the code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// An issued access token, optionally paired with a refresh token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The opaque access token value
    pub access_token: String,
    /// Access token expiry; required for bearer validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at: Option<DateTime<Utc>>,
    /// Paired refresh token, if issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Refresh token expiry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    /// Granted scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Client the token was issued to
    pub client: Client,
    /// Resource owner the token acts for
    pub user: User,
    /// Extended attributes the model attached on save
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Token {
    /// Seconds until the access token expires, floored, if an expiry is set
    #[must_use]
    pub fn access_token_lifetime(&self, now: DateTime<Utc>) -> Option<i64> {
        self.access_token_expires_at
            .map(|expires_at| (expires_at - now).num_seconds())
    }
}

/// Token fields handed to the model for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewToken {
    /// The opaque access token value
    pub access_token: String,
    /// Access token expiry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at: Option<DateTime<Utc>>,
    /// Paired refresh token, if issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Refresh token expiry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    /// Granted scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Authorization code the token was exchanged for, kept for audit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<String>,
}

/// A refresh token resolved back to its (client, user, scope) triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// The opaque refresh token value
    pub refresh_token: String,
    /// Expiry instant, if the token expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    /// Scope originally granted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Client the token was issued to
    pub client: Client,
    /// Resource owner the token acts for
    pub user: User,
}
