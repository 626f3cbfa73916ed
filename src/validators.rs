// ABOUTME: Syntactic validators for the RFC 6749 Appendix A character classes
// ABOUTME: Predicates over protocol parameter values; all reject empty strings
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use url::Url;

/// VSCHAR: `%x20-7E` (printable ASCII)
#[must_use]
pub fn is_vschar(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| matches!(c, '\x20'..='\x7e'))
}

/// NCHAR: `"-" / "." / "_" / ALPHA / DIGIT` (grant and response type names)
#[must_use]
pub fn is_nchar(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| matches!(c, '-' | '.' | '_' | 'a'..='z' | 'A'..='Z' | '0'..='9'))
}

/// NQCHAR: `%x21 / %x23-5B / %x5D-7E` (no quotes, no backslash)
#[must_use]
pub fn is_nqchar(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| matches!(c, '\x21' | '\x23'..='\x5b' | '\x5d'..='\x7e'))
}

/// NQSCHAR: NQCHAR plus space (scope strings)
#[must_use]
pub fn is_nqschar(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| matches!(c, '\x20'..='\x21' | '\x23'..='\x5b' | '\x5d'..='\x7e'))
}

/// UNICODECHARNOCRLF: any unicode character except CR and LF (credentials)
#[must_use]
pub fn is_unicodecharnocrlf(value: &str) -> bool {
    !value.is_empty()
        && value.chars().all(|c| {
            matches!(c,
                '\u{09}' | '\u{20}'..='\u{7e}' | '\u{80}'..='\u{d7ff}'
                | '\u{e000}'..='\u{fffd}' | '\u{10000}'..='\u{10ffff}')
        })
}

/// Absolute URI check used for `redirect_uri` and URN-style grant names
#[must_use]
pub fn is_uri(value: &str) -> bool {
    Url::parse(value).is_ok()
}
