// ABOUTME: Immutable HTTP request value object decoded by the host framework
// ABOUTME: Exposes method, headers, query parameters, and form body fields to the handlers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::HashMap;

/// Media type required on token endpoint requests (RFC 6749 §4.1.3)
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// A decoded HTTP request handed to the library by the host application
///
/// Header names are matched case-insensitively. The body map holds the decoded
/// `application/x-www-form-urlencoded` fields; the host performs the decoding.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    body: HashMap<String, String>,
}

impl Request {
    /// Create a request with the given HTTP method
    #[must_use]
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            headers: HashMap::new(),
            query: HashMap::new(),
            body: HashMap::new(),
        }
    }

    /// Add a header (names are stored lowercase)
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Add a decoded form body field
    #[must_use]
    pub fn with_body_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.insert(name.into(), value.into());
        self
    }

    /// Uppercased HTTP method
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Whether the method is POST
    #[must_use]
    pub fn is_post(&self) -> bool {
        self.method == "POST"
    }

    /// Header value by case-insensitive name
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Query parameter by name
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Form body field by name
    #[must_use]
    pub fn body_param(&self, name: &str) -> Option<&str> {
        self.body.get(name).map(String::as_str)
    }

    /// Parameter looked up in the body first, then the query string
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.body_param(name).or_else(|| self.query_param(name))
    }

    /// Whether `Content-Type` is `application/x-www-form-urlencoded`
    ///
    /// Media type parameters such as `charset` are ignored.
    #[must_use]
    pub fn is_form_urlencoded(&self) -> bool {
        self.header("content-type")
            .map(|value| value.split(';').next().unwrap_or("").trim())
            .is_some_and(|media_type| media_type.eq_ignore_ascii_case(FORM_URLENCODED))
    }
}
