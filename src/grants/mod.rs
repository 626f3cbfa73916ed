// ABOUTME: Common grant type shape shared by the four built-in grants and extensions
// ABOUTME: GrantContext carries the model and lifetimes plus the token issuance helpers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::errors::OAuthError;
use crate::model::{
    AuthorizationCodeStore, ClientUserResolver, Model, PasswordVerifier, RefreshTokenStore,
    TokenStore,
};
use crate::models::{Client, NewToken, Token, User};
use crate::request::Request;
use crate::tokens::generate_random_token;
use crate::validators::is_nqschar;

/// Authorization code exchange (RFC 6749 §4.1)
pub mod authorization_code;
/// Client credentials grant (RFC 6749 §4.4)
pub mod client_credentials;
/// Resource owner password credentials grant (RFC 6749 §4.3)
pub mod password;
/// Refresh token grant (RFC 6749 §6)
pub mod refresh_token;

pub use authorization_code::AuthorizationCodeGrant;
pub use client_credentials::ClientCredentialsGrant;
pub use password::PasswordGrant;
pub use refresh_token::RefreshTokenGrant;

/// A token endpoint grant; built-ins and extension grants share this shape
///
/// The token handler authenticates the client and dispatches on `grant_type`;
/// the grant turns the request into an issued [`Token`] through the context's
/// helpers.
#[async_trait]
pub trait GrantType: Send + Sync {
    /// Exchange the request for a token on behalf of the authenticated client
    async fn handle(
        &self,
        request: &Request,
        client: &Client,
        ctx: &GrantContext,
    ) -> Result<Token, OAuthError>;
}

/// Parameters for token issuance and persistence
#[derive(Debug, Clone, Default)]
pub struct TokenIssuance {
    /// Requested scope (or the original scope on refresh)
    pub scope: Option<String>,
    /// Authorization code the token is exchanged for, kept for audit
    pub authorization_code: Option<String>,
    /// Whether a refresh token is issued alongside the access token
    pub include_refresh_token: bool,
    /// Whether the scope runs through the model's validation policy
    pub validate_scope: bool,
}

/// Shared state and helpers handed to every grant invocation
pub struct GrantContext {
    model: Arc<dyn Model>,
    access_token_lifetime: i64,
    refresh_token_lifetime: i64,
    always_issue_new_refresh_token: bool,
}

impl GrantContext {
    /// Create a context from handler configuration
    #[must_use]
    pub fn new(
        model: Arc<dyn Model>,
        access_token_lifetime: i64,
        refresh_token_lifetime: i64,
        always_issue_new_refresh_token: bool,
    ) -> Self {
        Self {
            model,
            access_token_lifetime,
            refresh_token_lifetime,
            always_issue_new_refresh_token,
        }
    }

    /// The persistence model
    #[must_use]
    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    /// Whether the `refresh_token` grant rotates refresh tokens
    #[must_use]
    pub const fn always_issue_new_refresh_token(&self) -> bool {
        self.always_issue_new_refresh_token
    }

    /// Token persistence capability, or `invalid_argument` when the model lacks it
    pub fn require_token_store(&self) -> Result<&dyn TokenStore, OAuthError> {
        self.model
            .token_store()
            .ok_or_else(|| OAuthError::invalid_argument("model does not implement saveToken"))
    }

    /// Authorization code capability, or `invalid_argument`
    pub fn require_authorization_code_store(
        &self,
    ) -> Result<&dyn AuthorizationCodeStore, OAuthError> {
        self.model.authorization_code_store().ok_or_else(|| {
            OAuthError::invalid_argument("model does not implement getAuthorizationCode")
        })
    }

    /// Refresh token capability, or `invalid_argument`
    pub fn require_refresh_token_store(&self) -> Result<&dyn RefreshTokenStore, OAuthError> {
        self.model
            .refresh_token_store()
            .ok_or_else(|| OAuthError::invalid_argument("model does not implement getRefreshToken"))
    }

    /// Password verification capability, or `invalid_argument`
    pub fn require_password_verifier(&self) -> Result<&dyn PasswordVerifier, OAuthError> {
        self.model
            .password_verifier()
            .ok_or_else(|| OAuthError::invalid_argument("model does not implement getUser"))
    }

    /// Client-as-user capability, or `invalid_argument`
    pub fn require_client_user_resolver(&self) -> Result<&dyn ClientUserResolver, OAuthError> {
        self.model.client_user_resolver().ok_or_else(|| {
            OAuthError::invalid_argument("model does not implement getUserFromClient")
        })
    }

    /// Requested scope from the body or query, NQSCHAR-validated
    pub fn request_scope(request: &Request) -> Result<Option<String>, OAuthError> {
        match request.param("scope") {
            None => Ok(None),
            Some(scope) if is_nqschar(scope) => Ok(Some(scope.to_owned())),
            Some(_) => Err(OAuthError::invalid_scope("Invalid parameter: `scope`")),
        }
    }

    /// Validate the requested scope through the model's policy, if any
    ///
    /// Without a policy the requested scope passes through unchanged; a
    /// policy rejecting the scope yields `invalid_scope`.
    pub async fn validate_scope(
        &self,
        user: &User,
        client: &Client,
        scope: Option<&str>,
    ) -> Result<Option<String>, OAuthError> {
        let Some(policy) = self.model.scope_policy() else {
            return Ok(scope.map(ToOwned::to_owned));
        };

        policy
            .validate_scope(user, client, scope)
            .await
            .map_err(|e| OAuthError::server_error_from(&e))?
            .map_or_else(
                || Err(OAuthError::invalid_scope("Invalid scope: requested scope is invalid")),
                |validated| Ok(Some(validated)),
            )
    }

    /// Access token value: model-generated when the capability yields one,
    /// random opaque otherwise
    pub async fn generate_access_token(
        &self,
        client: &Client,
        user: &User,
        scope: Option<&str>,
    ) -> Result<String, OAuthError> {
        if let Some(generator) = self.model.token_generator() {
            if let Some(token) = generator
                .generate_access_token(client, user, scope)
                .await
                .map_err(|e| OAuthError::server_error_from(&e))?
            {
                return Ok(token);
            }
        }
        generate_random_token()
    }

    /// Refresh token value, same fallback rule as access tokens
    pub async fn generate_refresh_token(
        &self,
        client: &Client,
        user: &User,
        scope: Option<&str>,
    ) -> Result<String, OAuthError> {
        if let Some(generator) = self.model.token_generator() {
            if let Some(token) = generator
                .generate_refresh_token(client, user, scope)
                .await
                .map_err(|e| OAuthError::server_error_from(&e))?
            {
                return Ok(token);
            }
        }
        generate_random_token()
    }

    /// Access token expiry, honoring the client's per-client lifetime
    #[must_use]
    pub fn access_token_expires_at(&self, client: &Client) -> DateTime<Utc> {
        let lifetime = client
            .access_token_lifetime
            .unwrap_or(self.access_token_lifetime);
        Utc::now() + Duration::seconds(lifetime)
    }

    /// Refresh token expiry, honoring the client's per-client lifetime
    #[must_use]
    pub fn refresh_token_expires_at(&self, client: &Client) -> DateTime<Utc> {
        let lifetime = client
            .refresh_token_lifetime
            .unwrap_or(self.refresh_token_lifetime);
        Utc::now() + Duration::seconds(lifetime)
    }

    /// Validate scope, generate token values concurrently, and persist
    ///
    /// Scope validation, access token generation, and refresh token
    /// generation are dispatched concurrently; the first failure cancels the
    /// rest. The `refresh_token` grant reuses the original scope and sets
    /// `validate_scope: false`.
    pub async fn issue_token(
        &self,
        client: &Client,
        user: &User,
        issuance: TokenIssuance,
    ) -> Result<Token, OAuthError> {
        let token_store = self.require_token_store()?;
        let TokenIssuance {
            scope,
            authorization_code,
            include_refresh_token,
            validate_scope,
        } = issuance;

        let (validated_scope, access_token, refresh_token) = tokio::try_join!(
            async {
                if validate_scope {
                    self.validate_scope(user, client, scope.as_deref()).await
                } else {
                    Ok(scope.clone())
                }
            },
            self.generate_access_token(client, user, scope.as_deref()),
            async {
                if include_refresh_token {
                    self.generate_refresh_token(client, user, scope.as_deref())
                        .await
                        .map(Some)
                } else {
                    Ok(None)
                }
            },
        )?;

        let token = NewToken {
            access_token,
            access_token_expires_at: Some(self.access_token_expires_at(client)),
            refresh_token_expires_at: refresh_token
                .as_ref()
                .map(|_| self.refresh_token_expires_at(client)),
            refresh_token,
            scope: validated_scope,
            authorization_code,
        };

        debug!(client_id = %client.id, user_id = %user.id, "persisting issued token");

        token_store
            .save_token(token, client, user)
            .await
            .map_err(|e| OAuthError::server_error_from(&e))
    }
}
