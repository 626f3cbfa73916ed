// ABOUTME: Persistence and policy capability traits implemented by the host application
// ABOUTME: The umbrella Model trait exposes optional capabilities checked at handler construction
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! The model is the single most important interface of the crate: every
//! persisted fact and every policy decision flows through it. A model is
//! polymorphic over its capability set — one trait per capability, with the
//! umbrella [`Model`] trait exposing the optional ones as accessor methods.
//! Handlers assert the capabilities they need at construction and fail fast
//! with `invalid_argument` when one is missing.
//!
//! All methods are async and may block on I/O; the library awaits them and
//! propagates cancellation. Adapter failures are reported as
//! `anyhow::Result` errors and surface as `server_error` at the handler
//! boundary.
//!
//! Model obligation: implementations MUST compare client secrets and token
//! values in constant time (e.g. `subtle::ConstantTimeEq`) to avoid timing
//! side channels; the library passes secrets through verbatim and never
//! compares them itself.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    AuthorizationCode, Client, NewAuthorizationCode, NewToken, RefreshToken, Token, User,
};

/// Client lookup; required by every handler
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Resolve a client by id, verifying `client_secret` when given
    ///
    /// Secret hashing and comparison are the model's job; the library passes
    /// the secret through as presented.
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> Result<Option<Client>>;
}

/// Access token persistence; required by the token and authenticate pipelines
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist an issued token atomically and return the stored form
    async fn save_token(&self, token: NewToken, client: &Client, user: &User) -> Result<Token>;

    /// Resolve a bearer token back to its stored form
    async fn get_access_token(&self, access_token: &str) -> Result<Option<Token>>;
}

/// Scope check for protected resources; required when authenticate is given a scope
#[async_trait]
pub trait ScopeVerifier: Send + Sync {
    /// Whether `token` satisfies the required `scope`
    async fn verify_scope(&self, token: &Token, scope: &str) -> Result<bool>;
}

/// Authorization code persistence; required by authorize and the `authorization_code` grant
#[async_trait]
pub trait AuthorizationCodeStore: Send + Sync {
    /// Resolve a code value to its stored form
    async fn get_authorization_code(&self, code: &str) -> Result<Option<AuthorizationCode>>;

    /// Persist a freshly issued code bound to `client` and `user`
    async fn save_authorization_code(
        &self,
        code: NewAuthorizationCode,
        client: &Client,
        user: &User,
    ) -> Result<AuthorizationCode>;

    /// Irreversibly revoke a code on first use; `false` means the code was
    /// not revocable (already used or unknown)
    async fn revoke_authorization_code(&self, code: &AuthorizationCode) -> Result<bool>;
}

/// Refresh token persistence; required by the `refresh_token` grant
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Resolve a refresh token value to its (client, user, scope) triple
    async fn get_refresh_token(&self, refresh_token: &str) -> Result<Option<RefreshToken>>;

    /// Revoke a refresh token; `false` means it was not revocable
    async fn revoke_token(&self, token: &RefreshToken) -> Result<bool>;
}

/// Resource owner credential check; required by the `password` grant
#[async_trait]
pub trait PasswordVerifier: Send + Sync {
    /// Authenticate a resource owner; `None` means bad credentials
    async fn get_user(&self, username: &str, password: &str) -> Result<Option<User>>;
}

/// Client-as-user identity; required by the `client_credentials` grant
#[async_trait]
pub trait ClientUserResolver: Send + Sync {
    /// The user identity a confidential client acts as
    async fn get_user_from_client(&self, client: &Client) -> Result<Option<User>>;
}

/// Optional scope policy override
#[async_trait]
pub trait ScopePolicy: Send + Sync {
    /// Validate (and possibly narrow) the requested scope; `None` rejects it
    async fn validate_scope(
        &self,
        user: &User,
        client: &Client,
        scope: Option<&str>,
    ) -> Result<Option<String>>;
}

/// Optional token value generation override (e.g. a JWT-signing model)
///
/// Returning `Ok(None)` from any method falls back to the crate's random
/// opaque token generator.
#[async_trait]
pub trait TokenGenerator: Send + Sync {
    /// Generate an access token value
    async fn generate_access_token(
        &self,
        client: &Client,
        user: &User,
        scope: Option<&str>,
    ) -> Result<Option<String>> {
        let _ = (client, user, scope);
        Ok(None)
    }

    /// Generate a refresh token value
    async fn generate_refresh_token(
        &self,
        client: &Client,
        user: &User,
        scope: Option<&str>,
    ) -> Result<Option<String>> {
        let _ = (client, user, scope);
        Ok(None)
    }

    /// Generate an authorization code value
    async fn generate_authorization_code(
        &self,
        client: &Client,
        user: &User,
        scope: Option<&str>,
    ) -> Result<Option<String>> {
        let _ = (client, user, scope);
        Ok(None)
    }
}

/// Optional redirect URI validation override
///
/// When absent, validation is exact string membership in
/// `client.redirect_uris`.
#[async_trait]
pub trait RedirectUriValidator: Send + Sync {
    /// Whether `redirect_uri` is acceptable for `client`
    async fn validate_redirect_uri(&self, redirect_uri: &str, client: &Client) -> Result<bool>;
}

/// The host-supplied persistence + policy adapter
///
/// [`ClientStore`] is the one unconditionally required capability; everything
/// else is surfaced through accessors returning `None` by default. Handlers
/// check the accessors they depend on at construction time.
pub trait Model: ClientStore {
    /// Token persistence (token issuance and bearer validation)
    fn token_store(&self) -> Option<&dyn TokenStore> {
        None
    }

    /// Scope verification for protected resources
    fn scope_verifier(&self) -> Option<&dyn ScopeVerifier> {
        None
    }

    /// Authorization code persistence
    fn authorization_code_store(&self) -> Option<&dyn AuthorizationCodeStore> {
        None
    }

    /// Refresh token persistence
    fn refresh_token_store(&self) -> Option<&dyn RefreshTokenStore> {
        None
    }

    /// Resource owner password verification
    fn password_verifier(&self) -> Option<&dyn PasswordVerifier> {
        None
    }

    /// Client-as-user resolution
    fn client_user_resolver(&self) -> Option<&dyn ClientUserResolver> {
        None
    }

    /// Scope validation policy override
    fn scope_policy(&self) -> Option<&dyn ScopePolicy> {
        None
    }

    /// Token value generation override
    fn token_generator(&self) -> Option<&dyn TokenGenerator> {
        None
    }

    /// Redirect URI validation override
    fn redirect_uri_validator(&self) -> Option<&dyn RedirectUriValidator> {
        None
    }
}
