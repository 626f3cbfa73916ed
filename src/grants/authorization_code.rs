// ABOUTME: Authorization code grant handling the single-use exchange of codes for tokens
// ABOUTME: Revokes the code before persisting the token so a partial failure still consumes it
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::{GrantContext, GrantType, TokenIssuance};
use crate::errors::OAuthError;
use crate::models::{AuthorizationCode, Client, Token};
use crate::request::Request;
use crate::validators::{is_uri, is_vschar};

/// RFC 6749 §4.1.3 authorization code exchange
pub struct AuthorizationCodeGrant;

#[async_trait]
impl GrantType for AuthorizationCodeGrant {
    async fn handle(
        &self,
        request: &Request,
        client: &Client,
        ctx: &GrantContext,
    ) -> Result<Token, OAuthError> {
        ctx.require_token_store()?;
        ctx.require_authorization_code_store()?;

        let code = Self::get_authorization_code(request, client, ctx).await?;
        Self::validate_redirect_uri(request, &code)?;
        Self::revoke_authorization_code(&code, ctx).await?;

        let token = ctx
            .issue_token(
                client,
                &code.user,
                TokenIssuance {
                    scope: code.scope.clone(),
                    authorization_code: Some(code.authorization_code.clone()),
                    include_refresh_token: true,
                    validate_scope: true,
                },
            )
            .await?;

        debug!(client_id = %client.id, "authorization code exchanged");
        Ok(token)
    }
}

impl AuthorizationCodeGrant {
    /// Look up the presented code and check ownership and expiry
    async fn get_authorization_code(
        request: &Request,
        client: &Client,
        ctx: &GrantContext,
    ) -> Result<AuthorizationCode, OAuthError> {
        let value = request
            .param("code")
            .ok_or_else(|| OAuthError::invalid_request("Missing parameter: `code`"))?;
        if !is_vschar(value) {
            return Err(OAuthError::invalid_request("Invalid parameter: `code`"));
        }

        let code = ctx
            .require_authorization_code_store()?
            .get_authorization_code(value)
            .await
            .map_err(|e| OAuthError::server_error_from(&e))?
            .ok_or_else(|| {
                warn!(client_id = %client.id, "authorization code not found");
                OAuthError::invalid_grant("Invalid grant: authorization code is invalid")
            })?;

        if code.client.id != client.id {
            warn!(client_id = %client.id, "authorization code issued to another client");
            return Err(OAuthError::invalid_grant(
                "Invalid grant: authorization code is invalid",
            ));
        }

        if code.expires_at <= Utc::now() {
            return Err(OAuthError::invalid_grant(
                "Invalid grant: authorization code has expired",
            ));
        }

        Ok(code)
    }

    /// When the code was bound to a redirect URI, the request must repeat it exactly
    fn validate_redirect_uri(
        request: &Request,
        code: &AuthorizationCode,
    ) -> Result<(), OAuthError> {
        let Some(bound_uri) = code.redirect_uri.as_deref() else {
            return Ok(());
        };

        let presented = request.param("redirect_uri").ok_or_else(|| {
            OAuthError::invalid_request("Missing parameter: `redirect_uri`")
        })?;
        if !is_uri(presented) {
            return Err(OAuthError::invalid_request(
                "Invalid request: `redirect_uri` is not a valid URI",
            ));
        }
        if presented != bound_uri {
            return Err(OAuthError::invalid_request(
                "Invalid request: `redirect_uri` is invalid",
            ));
        }
        Ok(())
    }

    /// Consume the code; revocation precedes token persistence so the code
    /// stays burned even if the save fails
    async fn revoke_authorization_code(
        code: &AuthorizationCode,
        ctx: &GrantContext,
    ) -> Result<(), OAuthError> {
        let revoked = ctx
            .require_authorization_code_store()?
            .revoke_authorization_code(code)
            .await
            .map_err(|e| OAuthError::server_error_from(&e))?;

        if revoked {
            Ok(())
        } else {
            Err(OAuthError::invalid_grant(
                "Invalid grant: authorization code is invalid",
            ))
        }
    }
}
