// ABOUTME: Bearer token extraction, validation, and scope enforcement for protected resources
// ABOUTME: Decorates responses with WWW-Authenticate and scope headers per RFC 6750
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::errors::{ErrorKind, OAuthError};
use crate::model::Model;
use crate::models::Token;
use crate::options::AuthenticateOptions;
use crate::request::Request;
use crate::response::Response;

/// Resource-server-side bearer token validation (RFC 6750)
pub struct AuthenticateHandler {
    model: Arc<dyn Model>,
    scope: Option<String>,
    add_accepted_scopes_header: bool,
    add_authorized_scopes_header: bool,
    allow_bearer_tokens_in_query_string: bool,
}

impl AuthenticateHandler {
    /// Build the handler, asserting the model capabilities it depends on
    ///
    /// # Errors
    /// Returns `invalid_argument` when the model lacks `getAccessToken`, or
    /// lacks `verifyScope` while a scope is required
    pub fn new(model: Arc<dyn Model>, options: AuthenticateOptions) -> Result<Self, OAuthError> {
        if model.token_store().is_none() {
            return Err(OAuthError::invalid_argument(
                "model does not implement getAccessToken",
            ));
        }
        if options.scope.is_some() && model.scope_verifier().is_none() {
            return Err(OAuthError::invalid_argument(
                "model does not implement verifyScope",
            ));
        }

        Ok(Self {
            model,
            scope: options.scope,
            add_accepted_scopes_header: options.add_accepted_scopes_header,
            add_authorized_scopes_header: options.add_authorized_scopes_header,
            allow_bearer_tokens_in_query_string: options.allow_bearer_tokens_in_query_string,
        })
    }

    /// Validate the request's bearer token and decorate the response
    ///
    /// # Errors
    /// `unauthorized_request` without credentials, `invalid_token` for bad or
    /// expired tokens, `insufficient_scope` when the scope check fails
    pub async fn handle(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> Result<Token, OAuthError> {
        match self.handle_inner(request).await {
            Ok(token) => {
                if self.add_accepted_scopes_header {
                    if let Some(scope) = &self.scope {
                        response.set_header("x-accepted-oauth-scopes", scope.clone());
                    }
                }
                if self.add_authorized_scopes_header {
                    response.set_header(
                        "x-oauth-scopes",
                        token.scope.clone().unwrap_or_default(),
                    );
                }
                debug!(client_id = %token.client.id, "bearer token accepted");
                Ok(token)
            }
            Err(error) => {
                Self::update_error_response(response, &error);
                Err(error)
            }
        }
    }

    async fn handle_inner(&self, request: &Request) -> Result<Token, OAuthError> {
        let token_value = self.get_token_from_request(request)?;
        let token = self.get_access_token(&token_value).await?;
        Self::validate_access_token(&token)?;
        if let Some(scope) = &self.scope {
            self.verify_scope(&token, scope).await?;
        }
        Ok(token)
    }

    /// Extract the bearer token from exactly one of header, query, or body
    fn get_token_from_request(&self, request: &Request) -> Result<String, OAuthError> {
        let header = request.header("authorization");
        let query = request.query_param("access_token");
        let body = request.body_param("access_token");

        let sources =
            usize::from(header.is_some()) + usize::from(query.is_some()) + usize::from(body.is_some());
        if sources > 1 {
            return Err(OAuthError::invalid_request(
                "Invalid request: only one authentication method is allowed",
            ));
        }

        if let Some(header) = header {
            return Self::get_token_from_header(header);
        }
        if let Some(token) = query {
            return self.get_token_from_query(token);
        }
        if let Some(token) = body {
            return Self::get_token_from_body(request, token);
        }

        Err(OAuthError::unauthorized_request(
            "Unauthorized request: no authentication given",
        ))
    }

    fn get_token_from_header(header: &str) -> Result<String, OAuthError> {
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty() && !token.contains(' '))
            .map(ToOwned::to_owned)
            .ok_or_else(|| {
                OAuthError::invalid_request(
                    "Invalid request: malformed authorization header",
                )
            })
    }

    fn get_token_from_query(&self, token: &str) -> Result<String, OAuthError> {
        if self.allow_bearer_tokens_in_query_string {
            Ok(token.to_owned())
        } else {
            Err(OAuthError::invalid_request(
                "Invalid request: do not send bearer tokens in query URLs",
            ))
        }
    }

    fn get_token_from_body(request: &Request, token: &str) -> Result<String, OAuthError> {
        if !request.is_post() {
            return Err(OAuthError::invalid_request(
                "Invalid request: token may only be passed in the body on POST requests",
            ));
        }
        if !request.is_form_urlencoded() {
            return Err(OAuthError::invalid_request(
                "Invalid request: content must be application/x-www-form-urlencoded",
            ));
        }
        Ok(token.to_owned())
    }

    async fn get_access_token(&self, token_value: &str) -> Result<Token, OAuthError> {
        // capability asserted at construction
        let token_store = self
            .model
            .token_store()
            .ok_or_else(|| OAuthError::invalid_argument("model does not implement getAccessToken"))?;

        token_store
            .get_access_token(token_value)
            .await
            .map_err(|e| OAuthError::server_error_from(&e))?
            .ok_or_else(|| {
                warn!("bearer token not found");
                OAuthError::invalid_token("Invalid token: access token is invalid")
            })
    }

    fn validate_access_token(token: &Token) -> Result<(), OAuthError> {
        let Some(expires_at) = token.access_token_expires_at else {
            return Err(OAuthError::server_error(
                "server error: `accessTokenExpiresAt` must be set",
            ));
        };
        if expires_at <= Utc::now() {
            return Err(OAuthError::invalid_token(
                "Invalid token: access token has expired",
            ));
        }
        Ok(())
    }

    async fn verify_scope(&self, token: &Token, scope: &str) -> Result<(), OAuthError> {
        let verifier = self
            .model
            .scope_verifier()
            .ok_or_else(|| OAuthError::invalid_argument("model does not implement verifyScope"))?;

        let sufficient = verifier
            .verify_scope(token, scope)
            .await
            .map_err(|e| OAuthError::server_error_from(&e))?;

        if sufficient {
            Ok(())
        } else {
            Err(OAuthError::insufficient_scope(
                "Insufficient scope: authorized scope is insufficient",
            ))
        }
    }

    /// RFC 6750 §3: challenge without an error code when no credentials were
    /// presented at all, with one otherwise
    fn update_error_response(response: &mut Response, error: &OAuthError) {
        match error.kind() {
            ErrorKind::UnauthorizedRequest => {
                response.set_header("www-authenticate", "Bearer realm=\"Service\"");
            }
            ErrorKind::InvalidRequest | ErrorKind::InvalidToken | ErrorKind::InsufficientScope => {
                response.set_header(
                    "www-authenticate",
                    format!("Bearer realm=\"Service\", error=\"{}\"", error.name()),
                );
            }
            _ => {}
        }

        if let Ok(body) = serde_json::to_value(error.to_body()) {
            response.set_body(body);
        }
        response.set_status(error.status());
    }
}
