// ABOUTME: Shared test utilities: an in-memory model plus request and entity builders
// ABOUTME: Call counters on the mutating operations let tests assert single-use semantics
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(dead_code, clippy::missing_panics_doc, clippy::must_use_candidate)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use subtle::ConstantTimeEq;

use granite_oauth2::model::{
    AuthorizationCodeStore, ClientStore, ClientUserResolver, Model, PasswordVerifier,
    RefreshTokenStore, ScopeVerifier, TokenStore,
};
use granite_oauth2::{
    AuthorizationCode, Client, NewAuthorizationCode, NewToken, RefreshToken, Request, Token, User,
};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .init();
    });
}

/// In-memory model backing the integration tests
///
/// Secrets and passwords are compared in constant time, matching the
/// obligation documented on the model contract.
#[derive(Default)]
pub struct InMemoryModel {
    clients: Mutex<HashMap<String, (Client, Option<String>)>>,
    tokens: Mutex<HashMap<String, Token>>,
    authorization_codes: Mutex<HashMap<String, AuthorizationCode>>,
    refresh_tokens: Mutex<HashMap<String, RefreshToken>>,
    users: Mutex<HashMap<String, (String, User)>>,
    client_user: Mutex<Option<User>>,
    token_extra: Mutex<serde_json::Map<String, serde_json::Value>>,

    pub save_token_calls: AtomicUsize,
    pub save_authorization_code_calls: AtomicUsize,
    pub revoke_authorization_code_calls: AtomicUsize,
    pub revoke_token_calls: AtomicUsize,
}

impl InMemoryModel {
    pub fn new() -> Self {
        init_test_logging();
        Self::default()
    }

    pub fn add_client(&self, client: Client, secret: Option<&str>) {
        self.clients
            .lock()
            .unwrap()
            .insert(client.id.clone(), (client, secret.map(ToOwned::to_owned)));
    }

    pub fn add_token(&self, token: Token) {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.access_token.clone(), token);
    }

    pub fn add_authorization_code(&self, code: AuthorizationCode) {
        self.authorization_codes
            .lock()
            .unwrap()
            .insert(code.authorization_code.clone(), code);
    }

    pub fn add_refresh_token(&self, token: RefreshToken) {
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(token.refresh_token.clone(), token);
    }

    pub fn add_user(&self, username: &str, password: &str, user: User) {
        self.users
            .lock()
            .unwrap()
            .insert(username.to_owned(), (password.to_owned(), user));
    }

    pub fn set_client_user(&self, user: User) {
        *self.client_user.lock().unwrap() = Some(user);
    }

    /// Attach an extended attribute to every token this model persists
    pub fn set_token_extra(&self, key: &str, value: serde_json::Value) {
        self.token_extra.lock().unwrap().insert(key.to_owned(), value);
    }

    pub fn stored_token(&self, access_token: &str) -> Option<Token> {
        self.tokens.lock().unwrap().get(access_token).cloned()
    }

    pub fn stored_authorization_code(&self, code: &str) -> Option<AuthorizationCode> {
        self.authorization_codes.lock().unwrap().get(code).cloned()
    }

    pub fn stored_refresh_token(&self, refresh_token: &str) -> Option<RefreshToken> {
        self.refresh_tokens
            .lock()
            .unwrap()
            .get(refresh_token)
            .cloned()
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[async_trait]
impl ClientStore for InMemoryModel {
    async fn get_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> Result<Option<Client>> {
        let clients = self.clients.lock().unwrap();
        let Some((client, stored_secret)) = clients.get(client_id) else {
            return Ok(None);
        };

        let authenticated = match (client_secret, stored_secret.as_deref()) {
            (Some(presented), Some(stored)) => constant_time_eq(presented, stored),
            (None, _) => true,
            (Some(_), None) => false,
        };

        Ok(authenticated.then(|| client.clone()))
    }
}

#[async_trait]
impl TokenStore for InMemoryModel {
    async fn save_token(&self, token: NewToken, client: &Client, user: &User) -> Result<Token> {
        self.save_token_calls.fetch_add(1, Ordering::SeqCst);

        let stored = Token {
            access_token: token.access_token,
            access_token_expires_at: token.access_token_expires_at,
            refresh_token: token.refresh_token,
            refresh_token_expires_at: token.refresh_token_expires_at,
            scope: token.scope,
            client: client.clone(),
            user: user.clone(),
            extra: self.token_extra.lock().unwrap().clone(),
        };

        if let Some(refresh_token) = &stored.refresh_token {
            self.add_refresh_token(RefreshToken {
                refresh_token: refresh_token.clone(),
                refresh_token_expires_at: stored.refresh_token_expires_at,
                scope: stored.scope.clone(),
                client: client.clone(),
                user: user.clone(),
            });
        }

        self.add_token(stored.clone());
        Ok(stored)
    }

    async fn get_access_token(&self, access_token: &str) -> Result<Option<Token>> {
        Ok(self.tokens.lock().unwrap().get(access_token).cloned())
    }
}

#[async_trait]
impl ScopeVerifier for InMemoryModel {
    async fn verify_scope(&self, token: &Token, scope: &str) -> Result<bool> {
        let Some(granted) = token.scope.as_deref() else {
            return Ok(false);
        };
        let granted: Vec<&str> = granted.split(' ').collect();
        Ok(scope.split(' ').all(|required| granted.contains(&required)))
    }
}

#[async_trait]
impl AuthorizationCodeStore for InMemoryModel {
    async fn get_authorization_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        Ok(self.authorization_codes.lock().unwrap().get(code).cloned())
    }

    async fn save_authorization_code(
        &self,
        code: NewAuthorizationCode,
        client: &Client,
        user: &User,
    ) -> Result<AuthorizationCode> {
        self.save_authorization_code_calls
            .fetch_add(1, Ordering::SeqCst);

        let stored = AuthorizationCode {
            authorization_code: code.authorization_code,
            expires_at: code.expires_at,
            redirect_uri: code.redirect_uri,
            scope: code.scope,
            client: client.clone(),
            user: user.clone(),
        };
        self.add_authorization_code(stored.clone());
        Ok(stored)
    }

    async fn revoke_authorization_code(&self, code: &AuthorizationCode) -> Result<bool> {
        self.revoke_authorization_code_calls
            .fetch_add(1, Ordering::SeqCst);
        Ok(self
            .authorization_codes
            .lock()
            .unwrap()
            .remove(&code.authorization_code)
            .is_some())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryModel {
    async fn get_refresh_token(&self, refresh_token: &str) -> Result<Option<RefreshToken>> {
        Ok(self
            .refresh_tokens
            .lock()
            .unwrap()
            .get(refresh_token)
            .cloned())
    }

    async fn revoke_token(&self, token: &RefreshToken) -> Result<bool> {
        self.revoke_token_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .refresh_tokens
            .lock()
            .unwrap()
            .remove(&token.refresh_token)
            .is_some())
    }
}

#[async_trait]
impl PasswordVerifier for InMemoryModel {
    async fn get_user(&self, username: &str, password: &str) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.get(username).and_then(|(stored_password, user)| {
            constant_time_eq(password, stored_password).then(|| user.clone())
        }))
    }
}

#[async_trait]
impl ClientUserResolver for InMemoryModel {
    async fn get_user_from_client(&self, _client: &Client) -> Result<Option<User>> {
        Ok(self.client_user.lock().unwrap().clone())
    }
}

impl Model for InMemoryModel {
    fn token_store(&self) -> Option<&dyn TokenStore> {
        Some(self)
    }

    fn scope_verifier(&self) -> Option<&dyn ScopeVerifier> {
        Some(self)
    }

    fn authorization_code_store(&self) -> Option<&dyn AuthorizationCodeStore> {
        Some(self)
    }

    fn refresh_token_store(&self) -> Option<&dyn RefreshTokenStore> {
        Some(self)
    }

    fn password_verifier(&self) -> Option<&dyn PasswordVerifier> {
        Some(self)
    }

    fn client_user_resolver(&self) -> Option<&dyn ClientUserResolver> {
        Some(self)
    }
}

/// A confidential client registered for the given grants
pub fn test_client(id: &str, grants: &[&str], redirect_uris: &[&str]) -> Client {
    Client {
        id: id.to_owned(),
        grants: grants.iter().map(|&g| g.to_owned()).collect(),
        redirect_uris: redirect_uris.iter().map(|&u| u.to_owned()).collect(),
        access_token_lifetime: None,
        refresh_token_lifetime: None,
    }
}

/// An access token expiring `lifetime` seconds from now
pub fn test_token(access_token: &str, client: &Client, lifetime: i64) -> Token {
    Token {
        access_token: access_token.to_owned(),
        access_token_expires_at: Some(Utc::now() + Duration::seconds(lifetime)),
        refresh_token: None,
        refresh_token_expires_at: None,
        scope: None,
        client: client.clone(),
        user: User::with_id("u1"),
        extra: serde_json::Map::new(),
    }
}

/// An authorization code expiring `lifetime` seconds from now
pub fn test_authorization_code(
    code: &str,
    client: &Client,
    redirect_uri: Option<&str>,
    lifetime: i64,
) -> AuthorizationCode {
    AuthorizationCode {
        authorization_code: code.to_owned(),
        expires_at: Utc::now() + Duration::seconds(lifetime),
        redirect_uri: redirect_uri.map(ToOwned::to_owned),
        scope: None,
        client: client.clone(),
        user: User::with_id("u1"),
    }
}

/// A refresh token with the given expiry
pub fn test_refresh_token(
    value: &str,
    client: &Client,
    expires_at: Option<DateTime<Utc>>,
) -> RefreshToken {
    RefreshToken {
        refresh_token: value.to_owned(),
        refresh_token_expires_at: expires_at,
        scope: None,
        client: client.clone(),
        user: User::with_id("u1"),
    }
}

/// A well-formed `POST /token` request skeleton
pub fn token_request() -> Request {
    Request::new("POST").with_header("content-type", "application/x-www-form-urlencoded")
}

/// HTTP Basic credentials header value
pub fn basic_auth(client_id: &str, client_secret: &str) -> String {
    use base64::{engine::general_purpose, Engine as _};
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{client_id}:{client_secret}"))
    )
}
