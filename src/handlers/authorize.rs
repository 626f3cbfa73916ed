// ABOUTME: Authorization endpoint pipeline: user delegation, code issuance, redirect building
// ABOUTME: Errors redirect once the redirect URI is resolved; programmer errors never do
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};
use url::Url;

use super::authenticate::AuthenticateHandler;
use super::UserAuthenticator;
use crate::errors::OAuthError;
use crate::grants::GrantContext;
use crate::model::Model;
use crate::models::{AuthorizationCode, Client, NewAuthorizationCode, User};
use crate::options::AuthorizeOptions;
use crate::request::Request;
use crate::response::Response;
use crate::response_types::{CodeResponseType, ResponseType};
use crate::tokens::generate_random_token;
use crate::validators::{is_uri, is_vschar};

/// How the end-user identity is resolved
enum Authenticator {
    /// The crate's own bearer-token validation; the token's user is lifted
    Bearer(AuthenticateHandler),
    /// Host-supplied delegate (e.g. session login)
    Custom(Arc<dyn UserAuthenticator>),
}

/// The `GET|POST /authorize` pipeline (RFC 6749 §3.1)
pub struct AuthorizeHandler {
    model: Arc<dyn Model>,
    allow_empty_state: bool,
    authorization_code_lifetime: i64,
    authenticator: Authenticator,
}

impl AuthorizeHandler {
    /// Build the handler, asserting the model capabilities it depends on
    ///
    /// # Errors
    /// Returns `invalid_argument` when the model lacks
    /// `saveAuthorizationCode`, or when the default bearer authentication is
    /// used over a model lacking `getAccessToken`
    pub fn new(model: Arc<dyn Model>, options: AuthorizeOptions) -> Result<Self, OAuthError> {
        if model.authorization_code_store().is_none() {
            return Err(OAuthError::invalid_argument(
                "model does not implement saveAuthorizationCode",
            ));
        }

        let authenticator = match options.authenticate_handler {
            Some(handler) => Authenticator::Custom(handler),
            None => Authenticator::Bearer(AuthenticateHandler::new(
                Arc::clone(&model),
                options.authenticate,
            )?),
        };

        Ok(Self {
            model,
            allow_empty_state: options.allow_empty_state,
            authorization_code_lifetime: options.authorization_code_lifetime,
            authenticator,
        })
    }

    /// Run the authorization pipeline and fill in the response
    ///
    /// Success and post-resolution failures emit an HTTP 302 to the client's
    /// redirect URI; failures before the redirect URI is resolved (or with a
    /// programmer-class status) emit the error body directly.
    ///
    /// # Errors
    /// Any taxonomy error from the pipeline; the error is returned even when
    /// it was also encoded onto the redirect
    pub async fn handle(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> Result<AuthorizationCode, OAuthError> {
        let expires_at = Utc::now() + Duration::seconds(self.authorization_code_lifetime);

        // client lookup and user delegation are independent
        let resolved = tokio::try_join!(self.get_client(request), self.get_user(request, response));
        let (client, user) = match resolved {
            Ok(pair) => pair,
            Err(error) => {
                Self::update_error_response(response, &error);
                return Err(error);
            }
        };

        let redirect_uri = match Self::get_redirect_uri(request, &client) {
            Ok(uri) => uri,
            Err(error) => {
                Self::update_error_response(response, &error);
                return Err(error);
            }
        };

        // the redirect URI is validated from here on; protocol errors travel on it
        let mut state = None;
        match self
            .issue_code(request, &client, &user, expires_at, &redirect_uri, &mut state)
            .await
        {
            Ok((code, location)) => {
                response.redirect(location.to_string());
                Ok(code)
            }
            Err(error) => {
                if error.status() < 500 {
                    match Self::build_error_redirect(&redirect_uri, &error, state.as_deref()) {
                        Ok(location) => response.redirect(location.to_string()),
                        Err(_) => Self::update_error_response(response, &error),
                    }
                } else {
                    Self::update_error_response(response, &error);
                }
                Err(error)
            }
        }
    }

    async fn issue_code(
        &self,
        request: &Request,
        client: &Client,
        user: &User,
        expires_at: DateTime<Utc>,
        redirect_uri: &str,
        state_out: &mut Option<String>,
    ) -> Result<(AuthorizationCode, Url), OAuthError> {
        let scope = GrantContext::request_scope(request)?;
        let state = self.get_state(request)?;
        state_out.clone_from(&state);

        if Self::user_denied_access(request) {
            return Err(OAuthError::access_denied(
                "Access denied: user denied access to application",
            ));
        }

        let authorization_code = self
            .generate_authorization_code(client, user, scope.as_deref())
            .await?;
        Self::validate_response_type(request)?;

        let code = self
            .model
            .authorization_code_store()
            .ok_or_else(|| {
                OAuthError::invalid_argument("model does not implement saveAuthorizationCode")
            })?
            .save_authorization_code(
                NewAuthorizationCode {
                    authorization_code,
                    expires_at,
                    redirect_uri: Some(redirect_uri.to_owned()),
                    scope,
                },
                client,
                user,
            )
            .await
            .map_err(|e| OAuthError::server_error_from(&e))?;

        let mut location =
            CodeResponseType::new(&code.authorization_code).build_redirect_uri(redirect_uri)?;
        if let Some(state) = &state {
            location.query_pairs_mut().append_pair("state", state);
        }

        debug!(client_id = %client.id, "authorization code issued");
        Ok((code, location))
    }

    /// Resolve and validate the requesting client
    async fn get_client(&self, request: &Request) -> Result<Client, OAuthError> {
        let client_id = request
            .param("client_id")
            .ok_or_else(|| OAuthError::invalid_request("Missing parameter: `client_id`"))?;
        if !is_vschar(client_id) {
            return Err(OAuthError::invalid_request("Invalid parameter: `client_id`"));
        }

        let requested_redirect_uri = request.param("redirect_uri");
        if let Some(uri) = requested_redirect_uri {
            if !is_uri(uri) {
                return Err(OAuthError::invalid_request(
                    "Invalid request: `redirect_uri` is not a valid URI",
                ));
            }
        }

        let client = self
            .model
            .get_client(client_id, None)
            .await
            .map_err(|e| OAuthError::server_error_from(&e))?
            .ok_or_else(|| {
                warn!(client_id, "unknown client on authorization request");
                OAuthError::invalid_client("Invalid client: client credentials are invalid")
            })?;

        if !client.grants.iter().any(|name| name == "authorization_code") {
            return Err(OAuthError::unauthorized_client(
                "Unauthorized client: `grant_type` is invalid",
            ));
        }
        if client.redirect_uris.is_empty() {
            return Err(OAuthError::invalid_client(
                "Invalid client: missing client `redirectUri`",
            ));
        }

        if let Some(uri) = requested_redirect_uri {
            let valid = match self.model.redirect_uri_validator() {
                Some(validator) => validator
                    .validate_redirect_uri(uri, &client)
                    .await
                    .map_err(|e| OAuthError::server_error_from(&e))?,
                None => client.redirect_uris.iter().any(|registered| registered == uri),
            };
            if !valid {
                return Err(OAuthError::invalid_client(
                    "Invalid client: `redirect_uri` does not match client value",
                ));
            }
        }

        Ok(client)
    }

    /// Delegate end-user authentication
    async fn get_user(&self, request: &Request, response: &mut Response) -> Result<User, OAuthError> {
        match &self.authenticator {
            Authenticator::Bearer(handler) => {
                Ok(handler.handle(request, response).await?.user)
            }
            Authenticator::Custom(authenticator) => authenticator
                .authenticate(request, response)
                .await
                .map_err(|e| OAuthError::server_error_from(&e))?
                .ok_or_else(|| {
                    OAuthError::server_error(
                        "server error: `authenticate()` did not return a user",
                    )
                }),
        }
    }

    /// `body.redirect_uri` ▸ `query.redirect_uri` ▸ first registered URI
    fn get_redirect_uri(request: &Request, client: &Client) -> Result<String, OAuthError> {
        if let Some(uri) = request.param("redirect_uri") {
            return Ok(uri.to_owned());
        }
        client.redirect_uris.first().cloned().ok_or_else(|| {
            OAuthError::invalid_client("Invalid client: missing client `redirectUri`")
        })
    }

    /// `state` is required unless empty state is explicitly allowed
    fn get_state(&self, request: &Request) -> Result<Option<String>, OAuthError> {
        let state = request.param("state").filter(|value| !value.is_empty());
        match state {
            Some(value) if is_vschar(value) => Ok(Some(value.to_owned())),
            Some(_) => Err(OAuthError::invalid_request("Invalid parameter: `state`")),
            None if self.allow_empty_state => Ok(None),
            None => Err(OAuthError::invalid_request("Missing parameter: `state`")),
        }
    }

    fn user_denied_access(request: &Request) -> bool {
        request.query_param("allowed") == Some("false")
            || request.body_param("allowed") == Some("false")
    }

    /// Only `code` is built in; `token` is reserved for the implicit flow
    fn validate_response_type(request: &Request) -> Result<(), OAuthError> {
        let response_type = request
            .param("response_type")
            .ok_or_else(|| OAuthError::invalid_request("Missing parameter: `response_type`"))?;
        if response_type == "code" {
            Ok(())
        } else {
            Err(OAuthError::unsupported_response_type(
                "Unsupported response type: `response_type` is not supported",
            ))
        }
    }

    /// Model-generated code when the capability yields one, random otherwise
    async fn generate_authorization_code(
        &self,
        client: &Client,
        user: &User,
        scope: Option<&str>,
    ) -> Result<String, OAuthError> {
        if let Some(generator) = self.model.token_generator() {
            if let Some(code) = generator
                .generate_authorization_code(client, user, scope)
                .await
                .map_err(|e| OAuthError::server_error_from(&e))?
            {
                return Ok(code);
            }
        }
        generate_random_token()
    }

    fn build_error_redirect(
        redirect_uri: &str,
        error: &OAuthError,
        state: Option<&str>,
    ) -> Result<Url, OAuthError> {
        let mut url = Url::parse(redirect_uri)
            .map_err(|_| OAuthError::server_error("redirect URI is not parseable"))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("error", error.name());
            pairs.append_pair("error_description", error.description());
            if let Some(state) = state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url)
    }

    fn update_error_response(response: &mut Response, error: &OAuthError) {
        if let Ok(body) = serde_json::to_value(error.to_body()) {
            response.set_body(body);
        }
        response.set_status(error.status());
    }
}
