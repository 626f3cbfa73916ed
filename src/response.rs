// ABOUTME: Mutable HTTP response value object filled in by the handlers
// ABOUTME: Carries status, headers, JSON body, and redirect location back to the host framework
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::HashMap;

use serde_json::Value;

/// A response under construction; the host serializes it onto its framework
///
/// Header names are stored lowercase and matched case-insensitively.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: Option<Value>,
}

impl Response {
    /// Create an empty 200 response
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// HTTP status code
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Set the HTTP status code
    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Header value by case-insensitive name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Set a header (names are stored lowercase)
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    /// All headers set so far
    #[must_use]
    pub const fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// JSON body, if set
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Set the JSON body
    pub fn set_body(&mut self, body: Value) {
        self.body = Some(body);
    }

    /// Turn the response into an HTTP 302 redirect to `location`
    pub fn redirect(&mut self, location: impl Into<String>) {
        self.set_header("location", location);
        self.status = 302;
    }

    /// Location header when the response is a redirect
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
