// ABOUTME: Resource owner password credentials grant verifying username and password
// ABOUTME: The model is the authority on credentials; the grant only checks syntax
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{GrantContext, GrantType, TokenIssuance};
use crate::errors::OAuthError;
use crate::models::{Client, Token, User};
use crate::request::Request;
use crate::validators::is_unicodecharnocrlf;

/// RFC 6749 §4.3 resource owner password credentials grant
pub struct PasswordGrant;

#[async_trait]
impl GrantType for PasswordGrant {
    async fn handle(
        &self,
        request: &Request,
        client: &Client,
        ctx: &GrantContext,
    ) -> Result<Token, OAuthError> {
        ctx.require_token_store()?;
        ctx.require_password_verifier()?;

        let scope = GrantContext::request_scope(request)?;
        let user = Self::get_user(request, client, ctx).await?;

        let token = ctx
            .issue_token(
                client,
                &user,
                TokenIssuance {
                    scope,
                    authorization_code: None,
                    include_refresh_token: true,
                    validate_scope: true,
                },
            )
            .await?;

        debug!(client_id = %client.id, user_id = %user.id, "password grant token issued");
        Ok(token)
    }
}

impl PasswordGrant {
    /// Check credential syntax and delegate verification to the model
    async fn get_user(
        request: &Request,
        client: &Client,
        ctx: &GrantContext,
    ) -> Result<User, OAuthError> {
        let username = request
            .param("username")
            .ok_or_else(|| OAuthError::invalid_request("Missing parameter: `username`"))?;
        let password = request
            .param("password")
            .ok_or_else(|| OAuthError::invalid_request("Missing parameter: `password`"))?;

        if !is_unicodecharnocrlf(username) {
            return Err(OAuthError::invalid_request("Invalid parameter: `username`"));
        }
        if !is_unicodecharnocrlf(password) {
            return Err(OAuthError::invalid_request("Invalid parameter: `password`"));
        }

        ctx.require_password_verifier()?
            .get_user(username, password)
            .await
            .map_err(|e| OAuthError::server_error_from(&e))?
            .ok_or_else(|| {
                warn!(client_id = %client.id, "resource owner credentials rejected");
                OAuthError::invalid_grant("Invalid grant: user credentials are invalid")
            })
    }
}
