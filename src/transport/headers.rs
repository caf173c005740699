//! Request header construction.

use std::collections::HashMap;

pub type Headers = HashMap<String, String>;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTHORIZATION: &str = "Authorization";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Headers every request carries: `Content-Type`, plus a bearer
/// `Authorization` when a non-empty token is supplied.
pub fn build_headers(content_type: &str, auth_token: Option<&str>) -> Headers {
    let mut headers = Headers::with_capacity(2);
    headers.insert(CONTENT_TYPE.to_string(), content_type.to_string());
    if let Some(token) = auth_token.filter(|t| !t.is_empty()) {
        headers.insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
    }
    headers
}

/// Merge persistent custom headers with per-request headers.
///
/// Header names compare case-insensitively; on conflict the per-request value wins.
pub fn merge_headers(custom: &Headers, request: Headers) -> Headers {
    let mut merged: Headers = custom
        .iter()
        .filter(|(name, _)| !request.keys().any(|k| k.eq_ignore_ascii_case(name)))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    merged.extend(request);
    merged
}
