// ABOUTME: Client credentials grant issuing access tokens for the client's own identity
// ABOUTME: No refresh token is issued per RFC 6749 section 4.4.3
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use async_trait::async_trait;
use tracing::debug;

use super::{GrantContext, GrantType, TokenIssuance};
use crate::errors::OAuthError;
use crate::models::{Client, Token};
use crate::request::Request;

/// RFC 6749 §4.4 client credentials grant
pub struct ClientCredentialsGrant;

#[async_trait]
impl GrantType for ClientCredentialsGrant {
    async fn handle(
        &self,
        request: &Request,
        client: &Client,
        ctx: &GrantContext,
    ) -> Result<Token, OAuthError> {
        ctx.require_token_store()?;
        let resolver = ctx.require_client_user_resolver()?;

        let scope = GrantContext::request_scope(request)?;

        let user = resolver
            .get_user_from_client(client)
            .await
            .map_err(|e| OAuthError::server_error_from(&e))?
            .ok_or_else(|| {
                OAuthError::invalid_grant("Invalid grant: user credentials are invalid")
            })?;

        let token = ctx
            .issue_token(
                client,
                &user,
                TokenIssuance {
                    scope,
                    authorization_code: None,
                    include_refresh_token: false,
                    validate_scope: true,
                },
            )
            .await?;

        debug!(client_id = %client.id, "client credentials token issued");
        Ok(token)
    }
}
