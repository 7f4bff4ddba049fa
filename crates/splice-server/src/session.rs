// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Session issuance and the signed-in-user extractor.
//!
//! Sessions are opaque bearer tokens stored server-side; the cookie carries
//! only the token. [`CurrentUser`] is the extractor handlers take when a
//! request must come from a signed-in user.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use rand::RngCore;
use splice_server_auth::middleware::{
	extract_session_cookie, set_cookie_value, SESSION_COOKIE_NAME,
};
use splice_server_auth::{StoreError, User, UserId};

use crate::api::AppState;
use crate::api_response::ApiError;

/// A fresh session token: 32 random bytes, hex-encoded.
pub fn generate_session_token() -> String {
	let mut bytes = [0u8; 32];
	rand::thread_rng().fill_bytes(&mut bytes);
	hex::encode(bytes)
}

/// Create a session row for `user_id` and return the `Set-Cookie` value that
/// hands the token to the client.
pub async fn issue_session_cookie(state: &AppState, user_id: UserId) -> Result<String, ApiError> {
	let token = generate_session_token();
	let expires_at = Utc::now() + state.session_ttl;
	state
		.sessions
		.create_session(&token, user_id, expires_at)
		.await?;
	Ok(set_cookie_value(
		SESSION_COOKIE_NAME,
		&token,
		state.session_ttl.num_seconds(),
		state.cookie_secure,
	))
}

/// The signed-in user attached to a request.
///
/// Extraction fails with `401 unauthorized` when the session cookie is
/// missing, unknown, or expired. Handlers that need the raw token (logout)
/// read the cookie themselves.
#[derive(Debug)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
	type Rejection = ApiError;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		let token = extract_session_cookie(&parts.headers)
			.ok_or_else(|| ApiError::unauthorized("authentication required"))?;

		let user_id = state
			.sessions
			.get_user_id(&token)
			.await?
			.ok_or_else(|| ApiError::unauthorized("session expired or unknown"))?;

		match state.accounts.get_user(user_id).await {
			Ok(user) => Ok(CurrentUser(user)),
			// The account can vanish between the session check and the load;
			// a stale session reads the same as no session.
			Err(StoreError::NotFound(_)) => {
				Err(ApiError::unauthorized("session expired or unknown"))
			}
			Err(err) => Err(err.into()),
		}
	}
}
