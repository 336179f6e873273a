// ABOUTME: Cookie helpers for the browser sign-in round-trip
// ABOUTME: Reads request cookies and formats the short-lived sign-in intent cookie
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 WasteLink

use http::{header, HeaderMap};
use wastelink_core::constants::identity::PENDING_INTENT_TTL_SECS;

/// Cookie that carries the pending-intent key across the provider redirect
pub const SIGN_IN_INTENT_COOKIE: &str = "wastelink_sign_in";

/// Value of cookie `name` from the request, if present and non-empty
#[must_use]
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value holding the intent key for as long as the intent lives
///
/// Scoped to `/auth` so it only travels to the callback.
#[must_use]
pub fn sign_in_intent_cookie(intent_key: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{SIGN_IN_INTENT_COOKIE}={intent_key}; HttpOnly{secure}; Path=/auth; SameSite=Lax; Max-Age={PENDING_INTENT_TTL_SECS}"
    )
}

/// `Set-Cookie` value that removes the intent cookie
#[must_use]
pub fn clear_sign_in_intent_cookie() -> String {
    format!("{SIGN_IN_INTENT_COOKIE}=; HttpOnly; Path=/auth; SameSite=Lax; Max-Age=0")
}
