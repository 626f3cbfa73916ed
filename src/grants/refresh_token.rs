// ABOUTME: Refresh token grant exchanging a live refresh token for a new access token
// ABOUTME: Rotation is configurable; without rotation the original refresh token stays valid
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::{GrantContext, GrantType, TokenIssuance};
use crate::errors::OAuthError;
use crate::models::{Client, RefreshToken, Token};
use crate::request::Request;
use crate::validators::is_vschar;

/// RFC 6749 §6 refresh token grant
pub struct RefreshTokenGrant;

#[async_trait]
impl GrantType for RefreshTokenGrant {
    async fn handle(
        &self,
        request: &Request,
        client: &Client,
        ctx: &GrantContext,
    ) -> Result<Token, OAuthError> {
        ctx.require_token_store()?;
        ctx.require_refresh_token_store()?;

        let refresh_token = Self::get_refresh_token(request, client, ctx).await?;

        let rotate = ctx.always_issue_new_refresh_token();
        if rotate {
            // Revocation precedes the new save so the old token stays dead
            // even if persistence fails afterwards
            Self::revoke_token(&refresh_token, ctx).await?;
        }

        let token = ctx
            .issue_token(
                client,
                &refresh_token.user,
                TokenIssuance {
                    scope: refresh_token.scope.clone(),
                    authorization_code: None,
                    include_refresh_token: rotate,
                    validate_scope: false,
                },
            )
            .await?;

        debug!(client_id = %client.id, rotated = rotate, "refresh token exchanged");
        Ok(token)
    }
}

impl RefreshTokenGrant {
    /// Look up the presented refresh token and check ownership and expiry
    async fn get_refresh_token(
        request: &Request,
        client: &Client,
        ctx: &GrantContext,
    ) -> Result<RefreshToken, OAuthError> {
        let value = request
            .param("refresh_token")
            .ok_or_else(|| OAuthError::invalid_request("Missing parameter: `refresh_token`"))?;
        if !is_vschar(value) {
            return Err(OAuthError::invalid_request(
                "Invalid parameter: `refresh_token`",
            ));
        }

        let token = ctx
            .require_refresh_token_store()?
            .get_refresh_token(value)
            .await
            .map_err(|e| OAuthError::server_error_from(&e))?
            .ok_or_else(|| {
                warn!(client_id = %client.id, "refresh token not found");
                OAuthError::invalid_grant("Invalid grant: refresh token is invalid")
            })?;

        if token.client.id != client.id {
            warn!(client_id = %client.id, "refresh token issued to another client");
            return Err(OAuthError::invalid_grant(
                "Invalid grant: refresh token is invalid",
            ));
        }

        if token
            .refresh_token_expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now())
        {
            return Err(OAuthError::invalid_grant(
                "Invalid grant: refresh token has expired",
            ));
        }

        Ok(token)
    }

    /// Revoke the consumed refresh token; a model refusing revocation
    /// invalidates the grant
    async fn revoke_token(token: &RefreshToken, ctx: &GrantContext) -> Result<(), OAuthError> {
        let revoked = ctx
            .require_refresh_token_store()?
            .revoke_token(token)
            .await
            .map_err(|e| OAuthError::server_error_from(&e))?;

        if revoked {
            Ok(())
        } else {
            Err(OAuthError::invalid_grant(
                "Invalid grant: refresh token is invalid",
            ))
        }
    }
}
