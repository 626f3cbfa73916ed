// ABOUTME: Typed configuration for the server façade and the three handlers
// ABOUTME: Defaults follow RFC recommendations; options are frozen once a handler is built
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::grants::GrantType;
use crate::handlers::UserAuthenticator;
use crate::model::Model;

/// Default access token lifetime: one hour
pub const DEFAULT_ACCESS_TOKEN_LIFETIME: i64 = 3600;

/// Default refresh token lifetime: two weeks
pub const DEFAULT_REFRESH_TOKEN_LIFETIME: i64 = 1_209_600;

/// Default authorization code lifetime: five minutes
pub const DEFAULT_AUTHORIZATION_CODE_LIFETIME: i64 = 300;

/// Server-wide configuration: the model plus per-handler defaults
///
/// Per-call options passed to [`crate::OAuth2Server`] methods take precedence
/// over the handler options stored here.
#[derive(Clone)]
pub struct ServerOptions {
    /// The persistence + policy adapter; the only mandatory option
    pub model: Arc<dyn Model>,
    /// Defaults for the authenticate pipeline
    pub authenticate: AuthenticateOptions,
    /// Defaults for the authorize pipeline
    pub authorize: AuthorizeOptions,
    /// Defaults for the token pipeline
    pub token: TokenOptions,
}

impl ServerOptions {
    /// Server options over the given model with default handler settings
    #[must_use]
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model,
            authenticate: AuthenticateOptions::default(),
            authorize: AuthorizeOptions::default(),
            token: TokenOptions::default(),
        }
    }

    /// Replace the authenticate defaults
    #[must_use]
    pub fn with_authenticate(mut self, options: AuthenticateOptions) -> Self {
        self.authenticate = options;
        self
    }

    /// Replace the authorize defaults
    #[must_use]
    pub fn with_authorize(mut self, options: AuthorizeOptions) -> Self {
        self.authorize = options;
        self
    }

    /// Replace the token defaults
    #[must_use]
    pub fn with_token(mut self, options: TokenOptions) -> Self {
        self.token = options;
        self
    }
}

/// Configuration for bearer-token validation on protected resources
#[derive(Debug, Clone)]
pub struct AuthenticateOptions {
    /// Scope the resource requires, if any
    pub scope: Option<String>,
    /// Emit `X-Accepted-OAuth-Scopes` with the required scope on success
    pub add_accepted_scopes_header: bool,
    /// Emit `X-OAuth-Scopes` with the token's granted scope on success
    pub add_authorized_scopes_header: bool,
    /// Accept `access_token` from the query string (discouraged by RFC 6750)
    pub allow_bearer_tokens_in_query_string: bool,
}

impl AuthenticateOptions {
    /// Shorthand for "authenticate with this required scope"
    #[must_use]
    pub fn with_scope(scope: impl Into<String>) -> Self {
        Self {
            scope: Some(scope.into()),
            ..Self::default()
        }
    }
}

impl Default for AuthenticateOptions {
    fn default() -> Self {
        Self {
            scope: None,
            add_accepted_scopes_header: true,
            add_authorized_scopes_header: true,
            allow_bearer_tokens_in_query_string: false,
        }
    }
}

/// Configuration for the authorization endpoint
#[derive(Clone)]
pub struct AuthorizeOptions {
    /// Accept requests without a `state` parameter (weakens CSRF protection)
    pub allow_empty_state: bool,
    /// Authorization code lifetime in seconds
    pub authorization_code_lifetime: i64,
    /// End-user authentication delegate; defaults to bearer-token validation
    pub authenticate_handler: Option<Arc<dyn UserAuthenticator>>,
    /// Options for the default bearer-token authentication
    pub authenticate: AuthenticateOptions,
}

impl AuthorizeOptions {
    /// Use a custom end-user authentication delegate
    #[must_use]
    pub fn with_authenticate_handler(mut self, handler: Arc<dyn UserAuthenticator>) -> Self {
        self.authenticate_handler = Some(handler);
        self
    }
}

impl Default for AuthorizeOptions {
    fn default() -> Self {
        Self {
            allow_empty_state: false,
            authorization_code_lifetime: DEFAULT_AUTHORIZATION_CODE_LIFETIME,
            authenticate_handler: None,
            authenticate: AuthenticateOptions::default(),
        }
    }
}

/// Configuration for the token endpoint
#[derive(Clone)]
pub struct TokenOptions {
    /// Access token lifetime in seconds (client settings override)
    pub access_token_lifetime: i64,
    /// Refresh token lifetime in seconds (client settings override)
    pub refresh_token_lifetime: i64,
    /// Pass model-attached extended attributes through to the response body
    pub allow_extended_token_attributes: bool,
    /// Per-grant client authentication requirement; an absent entry means
    /// authentication is required
    pub require_client_authentication: HashMap<String, bool>,
    /// Rotate refresh tokens on use; when `false` the original refresh token
    /// stays valid and no new one is issued
    pub always_issue_new_refresh_token: bool,
    /// Extension grants keyed by grant name (`NCHAR` name or URI)
    pub extended_grant_types: BTreeMap<String, Arc<dyn GrantType>>,
}

impl TokenOptions {
    /// Mark a grant as not requiring client authentication
    #[must_use]
    pub fn without_client_authentication(mut self, grant_type: impl Into<String>) -> Self {
        self.require_client_authentication
            .insert(grant_type.into(), false);
        self
    }

    /// Register an extension grant under its name or URI
    #[must_use]
    pub fn with_extension_grant(
        mut self,
        grant_type: impl Into<String>,
        grant: Arc<dyn GrantType>,
    ) -> Self {
        self.extended_grant_types.insert(grant_type.into(), grant);
        self
    }
}

impl Default for TokenOptions {
    fn default() -> Self {
        Self {
            access_token_lifetime: DEFAULT_ACCESS_TOKEN_LIFETIME,
            refresh_token_lifetime: DEFAULT_REFRESH_TOKEN_LIFETIME,
            allow_extended_token_attributes: false,
            require_client_authentication: HashMap::new(),
            always_issue_new_refresh_token: true,
            extended_grant_types: BTreeMap::new(),
        }
    }
}
