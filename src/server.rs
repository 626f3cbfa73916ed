// ABOUTME: Server façade binding the model and options to per-request handler instances
// ABOUTME: One entry point per pipeline: authenticate, authorize, and token
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use crate::errors::OAuthError;
use crate::handlers::{AuthenticateHandler, AuthorizeHandler, TokenHandler};
use crate::models::{AuthorizationCode, Token};
use crate::options::{AuthenticateOptions, AuthorizeOptions, ServerOptions, TokenOptions};
use crate::request::Request;
use crate::response::Response;

/// The authorization server: a thin dispatcher over the three pipelines
///
/// Stateless and reentrant; the host may call any entry point concurrently.
/// Per-call options take precedence over the server-level defaults.
pub struct OAuth2Server {
    options: ServerOptions,
}

impl OAuth2Server {
    /// Create a server over the given options
    #[must_use]
    pub const fn new(options: ServerOptions) -> Self {
        Self { options }
    }

    /// Validate the bearer token on a protected-resource request
    ///
    /// # Errors
    /// `invalid_argument` when the model lacks a required capability; any
    /// taxonomy error from the pipeline otherwise
    pub async fn authenticate(
        &self,
        request: &Request,
        response: &mut Response,
        options: Option<AuthenticateOptions>,
    ) -> Result<Token, OAuthError> {
        let options = options.unwrap_or_else(|| self.options.authenticate.clone());
        let handler = AuthenticateHandler::new(Arc::clone(&self.options.model), options)?;
        handler.handle(request, response).await
    }

    /// Issue an authorization code and build the redirect
    ///
    /// # Errors
    /// `invalid_argument` when the model lacks a required capability; any
    /// taxonomy error from the pipeline otherwise
    pub async fn authorize(
        &self,
        request: &Request,
        response: &mut Response,
        options: Option<AuthorizeOptions>,
    ) -> Result<AuthorizationCode, OAuthError> {
        let options = options.unwrap_or_else(|| self.options.authorize.clone());
        let handler = AuthorizeHandler::new(Arc::clone(&self.options.model), options)?;
        handler.handle(request, response).await
    }

    /// Exchange a grant for an access token
    ///
    /// # Errors
    /// `invalid_argument` when the model lacks a required capability; any
    /// taxonomy error from the pipeline otherwise
    pub async fn token(
        &self,
        request: &Request,
        response: &mut Response,
        options: Option<TokenOptions>,
    ) -> Result<Token, OAuthError> {
        let options = options.unwrap_or_else(|| self.options.token.clone());
        let handler = TokenHandler::new(Arc::clone(&self.options.model), options)?;
        handler.handle(request, response).await
    }
}
