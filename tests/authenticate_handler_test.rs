// ABOUTME: Integration tests for bearer token extraction, validation, and scope checks
// ABOUTME: Covers the three token sources, expiry handling, and response decoration
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use common::{test_client, test_token, InMemoryModel};
use granite_oauth2::{
    AuthenticateOptions, OAuth2Server, Request, Response, ServerOptions,
};

fn server_with_model(model: &Arc<InMemoryModel>) -> OAuth2Server {
    let model = Arc::clone(model) as Arc<dyn granite_oauth2::model::Model>;
    OAuth2Server::new(ServerOptions::new(model))
}

fn model_with_token(lifetime: i64) -> Arc<InMemoryModel> {
    let model = Arc::new(InMemoryModel::new());
    let client = test_client("c1", &["password"], &[]);
    model.add_client(client.clone(), Some("s1"));
    model.add_token(test_token("at-1", &client, lifetime));
    model
}

#[tokio::test]
async fn bearer_header_is_accepted() {
    let model = model_with_token(3600);
    let server = server_with_model(&model);

    let request = Request::new("GET").with_header("authorization", "Bearer at-1");
    let mut response = Response::new();
    let token = server.authenticate(&request, &mut response, None).await.unwrap();

    assert_eq!(token.access_token, "at-1");
    assert_eq!(token.user.id, "u1");
    // granted scopes are advertised even without a required scope; the
    // accepted-scopes header needs one to advertise
    assert_eq!(response.header("x-oauth-scopes"), Some(""));
    assert!(response.header("x-accepted-oauth-scopes").is_none());
}

#[tokio::test]
async fn granted_scope_is_advertised_without_a_required_scope() {
    let model = Arc::new(InMemoryModel::new());
    let client = test_client("c1", &["password"], &[]);
    let mut token = test_token("at-1", &client, 3600);
    token.scope = Some("read write".to_owned());
    model.add_client(client, Some("s1"));
    model.add_token(token);
    let server = server_with_model(&model);

    let request = Request::new("GET").with_header("authorization", "Bearer at-1");
    let mut response = Response::new();
    server.authenticate(&request, &mut response, None).await.unwrap();

    assert_eq!(response.header("x-oauth-scopes"), Some("read write"));
    assert!(response.header("x-accepted-oauth-scopes").is_none());
}

#[tokio::test]
async fn missing_credentials_get_a_plain_challenge() {
    let model = model_with_token(3600);
    let server = server_with_model(&model);

    let request = Request::new("GET");
    let mut response = Response::new();
    let error = server
        .authenticate(&request, &mut response, None)
        .await
        .unwrap_err();

    assert_eq!(error.name(), "unauthorized_request");
    assert_eq!(response.status(), 401);
    // RFC 6750 §3.1: no error attribute when no credentials were presented
    assert_eq!(
        response.header("www-authenticate"),
        Some("Bearer realm=\"Service\"")
    );
}

#[tokio::test]
async fn unknown_token_is_invalid() {
    let model = model_with_token(3600);
    let server = server_with_model(&model);

    let request = Request::new("GET").with_header("authorization", "Bearer nope");
    let mut response = Response::new();
    let error = server
        .authenticate(&request, &mut response, None)
        .await
        .unwrap_err();

    assert_eq!(error.name(), "invalid_token");
    assert_eq!(response.status(), 401);
    assert_eq!(
        response.header("www-authenticate"),
        Some("Bearer realm=\"Service\", error=\"invalid_token\"")
    );
}

#[tokio::test]
async fn expired_token_is_invalid() {
    let model = model_with_token(0);
    let server = server_with_model(&model);

    let request = Request::new("GET").with_header("authorization", "Bearer at-1");
    let mut response = Response::new();
    let error = server
        .authenticate(&request, &mut response, None)
        .await
        .unwrap_err();

    assert_eq!(error.name(), "invalid_token");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn malformed_header_is_invalid_request() {
    let model = model_with_token(3600);
    let server = server_with_model(&model);

    let request = Request::new("GET").with_header("authorization", "Bearer");
    let mut response = Response::new();
    let error = server
        .authenticate(&request, &mut response, None)
        .await
        .unwrap_err();

    assert_eq!(error.name(), "invalid_request");
}

#[tokio::test]
async fn multiple_token_sources_are_rejected() {
    let model = model_with_token(3600);
    let server = server_with_model(&model);

    let request = Request::new("GET")
        .with_header("authorization", "Bearer at-1")
        .with_query_param("access_token", "at-1");
    let mut response = Response::new();
    let error = server
        .authenticate(&request, &mut response, None)
        .await
        .unwrap_err();

    assert_eq!(error.name(), "invalid_request");
}

#[tokio::test]
async fn query_tokens_require_opt_in() {
    let model = model_with_token(3600);
    let server = server_with_model(&model);

    let request = Request::new("GET").with_query_param("access_token", "at-1");

    let mut response = Response::new();
    let error = server
        .authenticate(&request, &mut response, None)
        .await
        .unwrap_err();
    assert_eq!(error.name(), "invalid_request");

    let options = AuthenticateOptions {
        allow_bearer_tokens_in_query_string: true,
        ..AuthenticateOptions::default()
    };
    let mut response = Response::new();
    let token = server
        .authenticate(&request, &mut response, Some(options))
        .await
        .unwrap();
    assert_eq!(token.access_token, "at-1");
}

#[tokio::test]
async fn form_body_tokens_need_post_and_form_content() {
    let model = model_with_token(3600);
    let server = server_with_model(&model);

    let post = Request::new("POST")
        .with_header("content-type", "application/x-www-form-urlencoded")
        .with_body_param("access_token", "at-1");
    let mut response = Response::new();
    let token = server.authenticate(&post, &mut response, None).await.unwrap();
    assert_eq!(token.access_token, "at-1");

    let get = Request::new("GET").with_body_param("access_token", "at-1");
    let mut response = Response::new();
    let error = server
        .authenticate(&get, &mut response, None)
        .await
        .unwrap_err();
    assert_eq!(error.name(), "invalid_request");
}

#[tokio::test]
async fn scope_check_passes_and_decorates_headers() {
    let model = Arc::new(InMemoryModel::new());
    let client = test_client("c1", &["password"], &[]);
    let mut token = test_token("at-1", &client, 3600);
    token.scope = Some("read write".to_owned());
    model.add_client(client, Some("s1"));
    model.add_token(token);
    let server = server_with_model(&model);

    let request = Request::new("GET").with_header("authorization", "Bearer at-1");
    let mut response = Response::new();
    server
        .authenticate(
            &request,
            &mut response,
            Some(AuthenticateOptions::with_scope("read")),
        )
        .await
        .unwrap();

    assert_eq!(response.header("x-accepted-oauth-scopes"), Some("read"));
    assert_eq!(response.header("x-oauth-scopes"), Some("read write"));
}

#[tokio::test]
async fn insufficient_scope_is_403() {
    let model = Arc::new(InMemoryModel::new());
    let client = test_client("c1", &["password"], &[]);
    let mut token = test_token("at-1", &client, 3600);
    token.scope = Some("read".to_owned());
    model.add_client(client, Some("s1"));
    model.add_token(token);
    let server = server_with_model(&model);

    let request = Request::new("GET").with_header("authorization", "Bearer at-1");
    let mut response = Response::new();
    let error = server
        .authenticate(
            &request,
            &mut response,
            Some(AuthenticateOptions::with_scope("admin")),
        )
        .await
        .unwrap_err();

    assert_eq!(error.name(), "insufficient_scope");
    assert_eq!(response.status(), 403);
    assert_eq!(
        response.header("www-authenticate"),
        Some("Bearer realm=\"Service\", error=\"insufficient_scope\"")
    );
}

#[tokio::test]
async fn scope_headers_can_be_disabled() {
    let model = Arc::new(InMemoryModel::new());
    let client = test_client("c1", &["password"], &[]);
    let mut token = test_token("at-1", &client, 3600);
    token.scope = Some("read".to_owned());
    model.add_client(client, Some("s1"));
    model.add_token(token);
    let server = server_with_model(&model);

    let request = Request::new("GET").with_header("authorization", "Bearer at-1");
    let options = AuthenticateOptions {
        scope: Some("read".to_owned()),
        add_accepted_scopes_header: false,
        add_authorized_scopes_header: false,
        ..AuthenticateOptions::default()
    };

    let mut response = Response::new();
    server
        .authenticate(&request, &mut response, Some(options))
        .await
        .unwrap();

    assert!(response.header("x-accepted-oauth-scopes").is_none());
    assert!(response.header("x-oauth-scopes").is_none());
}

#[tokio::test]
async fn token_without_expiry_is_a_server_error() {
    let model = Arc::new(InMemoryModel::new());
    let client = test_client("c1", &["password"], &[]);
    let mut token = test_token("at-1", &client, 3600);
    token.access_token_expires_at = None;
    model.add_client(client, Some("s1"));
    model.add_token(token);
    let server = server_with_model(&model);

    let request = Request::new("GET").with_header("authorization", "Bearer at-1");
    let mut response = Response::new();
    let error = server
        .authenticate(&request, &mut response, None)
        .await
        .unwrap_err();

    assert_eq!(error.name(), "server_error");
    assert_eq!(response.status(), 503);
}
