// ABOUTME: Main library entry point for the granite-oauth2 authorization server core
// ABOUTME: Exposes the token, authorize, and authenticate pipelines over a pluggable model
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # granite-oauth2
//!
//! An embeddable OAuth 2.0 authorization server core implementing RFC 6749
//! (the OAuth 2.0 framework) and RFC 6750 (Bearer Token usage). The crate
//! turns a decoded HTTP request into one of three outcomes: an issued access
//! token, a delegated authorization code, or a validated bearer token.
//!
//! The crate owns neither the HTTP transport nor persistent storage. The host
//! application translates its framework's request into a [`Request`], hands it
//! to [`OAuth2Server`], and writes the resulting [`Response`] back out. All
//! persistence and policy decisions are delegated to a host-supplied
//! [`model::Model`] adapter.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use granite_oauth2::{OAuth2Server, Request, Response, ServerOptions};
//! # use granite_oauth2::model::Model;
//! # async fn demo(model: Arc<dyn Model>, request: Request) -> anyhow::Result<()> {
//! let server = OAuth2Server::new(ServerOptions::new(model));
//!
//! let mut response = Response::new();
//! let token = server.token(&request, &mut response, None).await?;
//! println!("issued {} (status {})", token.access_token, response.status());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Handlers**: one stateless pipeline per endpoint — token exchange,
//!   authorization-code issuance, and bearer-token validation
//! - **Grant types**: the four RFC 6749 grants plus pluggable extension grants
//! - **Model**: capability traits the host implements over its own storage
//! - **Errors**: the RFC 6749 / RFC 6750 error taxonomy with HTTP mapping

/// RFC 6749 / RFC 6750 error taxonomy with HTTP status mapping
pub mod errors;

/// Grant type implementations for the token endpoint
pub mod grants;

/// Request handlers for the token, authorize, and authenticate pipelines
pub mod handlers;

/// Persistence and policy capability traits implemented by the host
pub mod model;

/// Entity value objects exchanged with the model
pub mod models;

/// Typed configuration for the server façade and handlers
pub mod options;

/// Transport-agnostic HTTP request value object
pub mod request;

/// Transport-agnostic HTTP response value object
pub mod response;

/// Authorization endpoint response type encoders
pub mod response_types;

/// Server façade dispatching to handler instances
pub mod server;

/// Bearer token serialization for token endpoint responses
pub mod token_types;

/// Cryptographically random opaque token generation
pub mod tokens;

/// Syntactic validators for RFC 6749 Appendix A character classes
pub mod validators;

pub use errors::{ErrorKind, OAuthError};
pub use models::{
    AuthorizationCode, Client, NewAuthorizationCode, NewToken, RefreshToken, Token, User,
};
pub use options::{AuthenticateOptions, AuthorizeOptions, ServerOptions, TokenOptions};
pub use request::Request;
pub use response::Response;
pub use server::OAuth2Server;
