// ABOUTME: Token endpoint pipeline: client authentication, grant dispatch, token issuance
// ABOUTME: Serializes Bearer responses and maps the error taxonomy onto status and headers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use tracing::{debug, warn};

use crate::errors::{ErrorKind, OAuthError};
use crate::grants::{
    AuthorizationCodeGrant, ClientCredentialsGrant, GrantContext, GrantType, PasswordGrant,
    RefreshTokenGrant,
};
use crate::model::Model;
use crate::models::{Client, Token};
use crate::options::TokenOptions;
use crate::request::Request;
use crate::response::Response;
use crate::token_types::BearerToken;
use crate::validators::{is_nchar, is_uri, is_vschar};

/// Client credentials as presented on the request
struct ClientCredentials {
    client_id: String,
    client_secret: Option<String>,
    from_authorization_header: bool,
}

/// The `POST /token` pipeline (RFC 6749 §3.2)
pub struct TokenHandler {
    model: Arc<dyn Model>,
    options: TokenOptions,
}

impl TokenHandler {
    /// Build the handler, asserting the model capabilities it depends on
    ///
    /// # Errors
    /// Returns `invalid_argument` when the model lacks `saveToken`
    pub fn new(model: Arc<dyn Model>, options: TokenOptions) -> Result<Self, OAuthError> {
        if model.token_store().is_none() {
            return Err(OAuthError::invalid_argument(
                "model does not implement saveToken",
            ));
        }
        Ok(Self { model, options })
    }

    /// Run the token pipeline and fill in the response
    ///
    /// On success the response carries the Bearer body, `Cache-Control:
    /// no-store`, and `Pragma: no-cache`. On failure it carries the error
    /// body and status; a client that failed `Authorization`-header
    /// authentication additionally gets a Basic challenge.
    ///
    /// # Errors
    /// Any taxonomy error from the pipeline; non-taxonomy failures surface as
    /// `server_error`
    pub async fn handle(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> Result<Token, OAuthError> {
        let result = match self.handle_inner(request).await {
            Ok(token) => {
                BearerToken::from_token(&token, self.options.allow_extended_token_attributes)
                    .into_body()
                    .map(|body| (token, body))
            }
            Err(error) => Err(error),
        };

        match result {
            Ok((token, body)) => {
                response.set_body(body);
                response.set_header("cache-control", "no-store");
                response.set_header("pragma", "no-cache");
                response.set_status(200);
                debug!(client_id = %token.client.id, "access token issued");
                Ok(token)
            }
            Err(error) => {
                if error.kind() == ErrorKind::InvalidClient && error.status() == 401 {
                    response.set_header("www-authenticate", "Basic realm=\"Service\"");
                }
                if let Ok(body) = serde_json::to_value(error.to_body()) {
                    response.set_body(body);
                }
                response.set_status(error.status());
                Err(error)
            }
        }
    }

    async fn handle_inner(&self, request: &Request) -> Result<Token, OAuthError> {
        if !request.is_post() {
            return Err(OAuthError::invalid_request(
                "Invalid request: method must be POST",
            ));
        }
        if !request.is_form_urlencoded() {
            return Err(OAuthError::invalid_request(
                "Invalid request: content must be application/x-www-form-urlencoded",
            ));
        }

        let client = self.get_client(request).await?;
        self.dispatch_grant(request, &client).await
    }

    /// Resolve, syntactically validate, and look up the client
    async fn get_client(&self, request: &Request) -> Result<Client, OAuthError> {
        let credentials = Self::get_client_credentials(request)?;

        if !is_vschar(&credentials.client_id) {
            return Err(OAuthError::invalid_request("Invalid parameter: `client_id`"));
        }
        match credentials.client_secret.as_deref() {
            Some(secret) if !is_vschar(secret) => {
                return Err(OAuthError::invalid_request(
                    "Invalid parameter: `client_secret`",
                ));
            }
            None if self.is_client_authentication_required(request) => {
                return Err(OAuthError::invalid_request(
                    "Missing parameter: `client_secret`",
                ));
            }
            _ => {}
        }

        let client = self
            .model
            .get_client(&credentials.client_id, credentials.client_secret.as_deref())
            .await
            .map_err(|e| OAuthError::server_error_from(&e))?
            .ok_or_else(|| {
                warn!(client_id = %credentials.client_id, "client authentication failed");
                let error = OAuthError::invalid_client("Invalid client: client is invalid");
                if credentials.from_authorization_header {
                    error.with_status(401)
                } else {
                    error
                }
            })?;

        if client.grants.is_empty() {
            return Err(OAuthError::server_error(
                "server error: missing client `grants`",
            ));
        }

        Ok(client)
    }

    /// Prefer HTTP Basic; fall back to body fields
    ///
    /// A bare `client_id` is handed back as-is; `get_client` decides whether
    /// the missing secret is acceptable for the requested grant.
    fn get_client_credentials(request: &Request) -> Result<ClientCredentials, OAuthError> {
        if let Some(credentials) = Self::credentials_from_basic_header(request) {
            return Ok(credentials);
        }

        if let Some(client_id) = request.body_param("client_id") {
            return Ok(ClientCredentials {
                client_id: client_id.to_owned(),
                client_secret: request.body_param("client_secret").map(ToOwned::to_owned),
                from_authorization_header: false,
            });
        }

        Err(OAuthError::invalid_client(
            "Invalid client: cannot retrieve client credentials",
        ))
    }

    /// Decode `Authorization: Basic base64(client_id:client_secret)`;
    /// a malformed header falls through to the body fields
    fn credentials_from_basic_header(request: &Request) -> Option<ClientCredentials> {
        let header = request.header("authorization")?;
        let encoded = header
            .strip_prefix("Basic ")
            .or_else(|| header.strip_prefix("basic "))?;
        let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (client_id, client_secret) = decoded.split_once(':')?;

        Some(ClientCredentials {
            client_id: client_id.to_owned(),
            client_secret: Some(client_secret.to_owned()),
            from_authorization_header: true,
        })
    }

    fn is_client_authentication_required(&self, request: &Request) -> bool {
        let Some(grant_type) = request.body_param("grant_type") else {
            return true;
        };
        self.options
            .require_client_authentication
            .get(grant_type)
            .copied()
            .unwrap_or(true)
    }

    /// Validate `grant_type`, resolve it from the registry, check the
    /// client's grant list, and invoke the grant
    async fn dispatch_grant(&self, request: &Request, client: &Client) -> Result<Token, OAuthError> {
        let grant_type = request
            .body_param("grant_type")
            .ok_or_else(|| OAuthError::invalid_request("Missing parameter: `grant_type`"))?;

        if !is_nchar(grant_type) && !is_uri(grant_type) {
            return Err(OAuthError::invalid_request("Invalid parameter: `grant_type`"));
        }

        let grant = self.resolve_grant(grant_type).ok_or_else(|| {
            OAuthError::unsupported_grant_type("Unsupported grant type: `grant_type` is invalid")
        })?;

        if !client.grants.iter().any(|name| name == grant_type) {
            warn!(client_id = %client.id, grant_type, "grant not allowed for client");
            return Err(OAuthError::unauthorized_client(
                "Unauthorized client: `grant_type` is invalid",
            ));
        }

        debug!(client_id = %client.id, grant_type, "dispatching grant");

        let ctx = GrantContext::new(
            Arc::clone(&self.model),
            self.options.access_token_lifetime,
            self.options.refresh_token_lifetime,
            self.options.always_issue_new_refresh_token,
        );
        grant.handle(request, client, &ctx).await
    }

    /// Built-in grants shadow extension grants of the same name
    fn resolve_grant(&self, grant_type: &str) -> Option<&dyn GrantType> {
        match grant_type {
            "authorization_code" => Some(&AuthorizationCodeGrant as &dyn GrantType),
            "client_credentials" => Some(&ClientCredentialsGrant as &dyn GrantType),
            "password" => Some(&PasswordGrant as &dyn GrantType),
            "refresh_token" => Some(&RefreshTokenGrant as &dyn GrantType),
            _ => self
                .options
                .extended_grant_types
                .get(grant_type)
                .map(|grant| grant.as_ref()),
        }
    }
}
