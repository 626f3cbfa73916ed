// ABOUTME: Request handlers for the three pipelines: token, authorize, and authenticate
// ABOUTME: Each handler is stateless across requests and holds frozen configuration
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use anyhow::Result;
use async_trait::async_trait;

use crate::models::User;
use crate::request::Request;
use crate::response::Response;

/// Bearer-token validation for protected resources
pub mod authenticate;
/// Authorization code issuance and redirect construction
pub mod authorize;
/// Client authentication, grant dispatch, and token issuance
pub mod token;

pub use authenticate::AuthenticateHandler;
pub use authorize::AuthorizeHandler;
pub use token::TokenHandler;

/// End-user authentication delegate for the authorize pipeline
///
/// The default delegate validates a bearer token and lifts its user; a host
/// with session-based login supplies its own implementation. Returning
/// `Ok(None)` is a contract violation and surfaces as `server_error`.
#[async_trait]
pub trait UserAuthenticator: Send + Sync {
    /// Resolve the authenticated end-user for an authorization request
    async fn authenticate(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> Result<Option<User>>;
}
