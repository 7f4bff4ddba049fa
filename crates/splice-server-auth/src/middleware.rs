// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cookie plumbing shared between the HTTP layer and its tests.
//!
//! This module provides:
//! - extraction of the session and OAuth-state cookies from request headers
//! - construction of `Set-Cookie` values with the attributes the service
//!   always uses (HttpOnly, SameSite=Lax, Path=/)
//! - [`generate_state_token`] for the CSRF `state` carried through provider
//!   redirects
//!
//! # Security Notes
//!
//! - Session cookies are HttpOnly; the `Secure` attribute follows
//!   configuration so local development over plain HTTP still works
//! - Cookie values are bearer credentials and are never logged

use http::header::COOKIE;
use http::HeaderMap;
use rand::RngCore;

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "splice_session";

/// Name of the short-lived cookie that double-submits the OAuth `state`.
pub const STATE_COOKIE_NAME: &str = "splice_oauth_state";

/// Lifetime of the state cookie: long enough for a login redirect round
/// trip, short enough not to linger.
pub const STATE_COOKIE_MAX_AGE_SECS: i64 = 600;

/// Extract the session cookie value from request headers.
pub fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
	extract_cookie(headers, SESSION_COOKIE_NAME)
}

/// Extract the OAuth state cookie value from request headers.
pub fn extract_state_cookie(headers: &HeaderMap) -> Option<String> {
	extract_cookie(headers, STATE_COOKIE_NAME)
}

/// Extract a cookie by name from the `Cookie` header.
///
/// Returns the first matching cookie's value, or `None` if the header is
/// absent or the cookie is not present.
pub fn extract_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	headers
		.get(COOKIE)?
		.to_str()
		.ok()?
		.split(';')
		.find_map(|cookie| {
			let cookie = cookie.trim();
			let (name, value) = cookie.split_once('=')?;

			if name == cookie_name {
				Some(value.to_string())
			} else {
				None
			}
		})
}

/// A fresh CSRF `state` value: 32 random bytes, hex-encoded.
pub fn generate_state_token() -> String {
	let mut bytes = [0u8; 32];
	rand::thread_rng().fill_bytes(&mut bytes);
	hex::encode(bytes)
}

/// Build a `Set-Cookie` value with the service's standard attributes.
pub fn set_cookie_value(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
	let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
	if secure {
		cookie.push_str("; Secure");
	}
	cookie
}

/// Build a `Set-Cookie` value that clears the named cookie.
pub fn clear_cookie_value(name: &str, secure: bool) -> String {
	set_cookie_value(name, "", 0, secure)
}
