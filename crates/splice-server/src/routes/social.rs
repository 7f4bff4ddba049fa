// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Social sign-in, link confirmation, and identity management handlers.
//!
//! Every flow is two requests from the client's point of view:
//!
//! 1. `GET` an authorization URL. The handler mints a random `state`, sets it
//!    as a short-lived cookie, and embeds the same value in the URL.
//! 2. `POST` back the `code` and `state` the provider echoed. The handler
//!    compares the posted `state` with the cookie before anything else; a
//!    mismatch means the response was not initiated here.
//!
//! The link-confirmation variant additionally carries the link decision
//! token minted when a social email collided with an existing account.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use splice_server_auth::middleware::{
	clear_cookie_value, extract_state_cookie, generate_state_token, set_cookie_value,
	STATE_COOKIE_MAX_AGE_SECS, STATE_COOKIE_NAME,
};
use splice_server_auth::AuthOutcome;
use utoipa::{IntoParams, ToSchema};

use crate::api::AppState;
use crate::api_response::{require_non_empty, ApiError, ErrorResponse};
use crate::session::{issue_session_cookie, CurrentUser};

/// Response code signalling that sign-in paused for link confirmation.
const LINK_REQUIRED: &str = "link_required";

/// Query parameters for `GET /api/login/social/{provider}`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AuthUrlParams {
	/// Where the provider should send the user back to. Must match the
	/// redirect URI registered with the provider.
	pub redirect_uri: String,
}

/// Response body carrying a provider authorization URL.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthUrlResponse {
	pub auth_url: String,
}

/// Request body for `POST /api/login/social/callback`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SocialCallbackRequest {
	pub provider: String,
	pub code: String,
	pub state: String,
	pub redirect_uri: String,
}

/// Response body when sign-in needs explicit link confirmation.
#[derive(Debug, Serialize, ToSchema)]
pub struct LinkRequiredResponse {
	/// Always `link_required`.
	pub code: String,
	/// Pass back through the link-confirmation flow.
	pub link_token: String,
}

/// Query parameters for `GET /api/login/social/{provider}/link`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct LinkAuthUrlParams {
	/// The link decision token from the earlier callback response.
	pub link_token: String,
	/// Where the provider should send the user back to.
	pub redirect_uri: String,
}

/// Response body carrying the link-confirmation authorization URL.
#[derive(Debug, Serialize, ToSchema)]
pub struct LinkAuthUrlResponse {
	pub link_auth_url: String,
}

/// Request body for `POST /api/login/social/link`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmLinkRequest {
	pub provider: String,
	pub code: String,
	pub state: String,
	pub link_token: String,
	pub redirect_uri: String,
}

/// Request body for `POST /api/user/link/{provider}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkProviderRequest {
	pub code: String,
	pub state: String,
	pub redirect_uri: String,
}

/// Compare the `state` a client posted back with the double-submit cookie.
///
/// Runs before any provider exchange: a missing cookie or a mismatch means
/// the round trip was not initiated by this server for this browser.
fn check_state(headers: &HeaderMap, submitted: &str) -> Result<(), ApiError> {
	if submitted.is_empty() {
		return Err(ApiError::bad_request(
			"invalid_state",
			"missing OAuth state value",
		));
	}
	match extract_state_cookie(headers) {
		Some(expected) if expected == submitted => Ok(()),
		Some(_) => Err(ApiError::bad_request(
			"invalid_state",
			"OAuth state does not match the expected value",
		)),
		None => Err(ApiError::bad_request(
			"invalid_state",
			"missing OAuth state cookie",
		)),
	}
}

/// Start a social sign-in: mint a `state`, build the provider URL.
#[utoipa::path(
	get,
	path = "/api/login/social/{provider}",
	params(
		("provider" = String, Path, description = "Provider wire name (google, facebook)"),
		AuthUrlParams
	),
	responses(
		(status = 200, description = "Authorization URL; state set via cookie", body = AuthUrlResponse),
		(status = 400, description = "Unknown provider or blank redirect_uri", body = ErrorResponse)
	),
	tag = "social"
)]
#[tracing::instrument(skip(state, params), fields(provider = %provider))]
pub async fn social_auth_url(
	State(state): State<AppState>,
	Path(provider): Path<String>,
	Query(params): Query<AuthUrlParams>,
) -> Result<impl IntoResponse, ApiError> {
	require_non_empty("redirect_uri", &params.redirect_uri)?;

	let oauth_state = generate_state_token();
	let auth_url = state
		.auth
		.authorization_url(&provider, &oauth_state, &params.redirect_uri)?;

	let cookie = set_cookie_value(
		STATE_COOKIE_NAME,
		&oauth_state,
		STATE_COOKIE_MAX_AGE_SECS,
		state.cookie_secure,
	);
	Ok((
		[(header::SET_COOKIE, cookie)],
		Json(AuthUrlResponse { auth_url }),
	))
}

/// Finish a social sign-in with the code the provider issued.
///
/// Three outcomes: a session (the identity resolved to an account), a
/// `link_required` body (the email belongs to an existing account and the
/// user must confirm the link), or an error.
#[utoipa::path(
	post,
	path = "/api/login/social/callback",
	request_body = SocialCallbackRequest,
	responses(
		(status = 204, description = "Signed in; session issued via Set-Cookie"),
		(status = 200, description = "Link confirmation required", body = LinkRequiredResponse),
		(status = 400, description = "Bad provider, state, or code", body = ErrorResponse)
	),
	tag = "social"
)]
#[tracing::instrument(skip(state, headers, payload))]
pub async fn social_auth_callback(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<SocialCallbackRequest>,
) -> Result<Response, ApiError> {
	check_state(&headers, &payload.state)?;

	let outcome = state
		.auth
		.authenticate_via_provider(&payload.provider, &payload.code, &payload.redirect_uri)
		.await?;

	let clear_state = clear_cookie_value(STATE_COOKIE_NAME, state.cookie_secure);
	match outcome {
		AuthOutcome::Authenticated(user) => {
			let session_cookie = issue_session_cookie(&state, user.id).await?;
			Ok((
				StatusCode::NO_CONTENT,
				AppendHeaders([
					(header::SET_COOKIE, session_cookie),
					(header::SET_COOKIE, clear_state),
				]),
			)
				.into_response())
		}
		AuthOutcome::LinkRequired { link_token, .. } => Ok((
			StatusCode::OK,
			[(header::SET_COOKIE, clear_state)],
			Json(LinkRequiredResponse {
				code: LINK_REQUIRED.to_string(),
				link_token,
			}),
		)
			.into_response()),
	}
}

/// Start the link-confirmation round trip for a pending link.
///
/// The link token is checked up front so a tampered or expired token fails
/// here instead of after a pointless provider round trip.
#[utoipa::path(
	get,
	path = "/api/login/social/{provider}/link",
	params(
		("provider" = String, Path, description = "Provider wire name (google, facebook)"),
		LinkAuthUrlParams
	),
	responses(
		(status = 200, description = "Authorization URL; state set via cookie", body = LinkAuthUrlResponse),
		(status = 400, description = "Unknown provider or invalid link token", body = ErrorResponse)
	),
	tag = "social"
)]
#[tracing::instrument(skip(state, params), fields(provider = %provider))]
pub async fn link_auth_url(
	State(state): State<AppState>,
	Path(provider): Path<String>,
	Query(params): Query<LinkAuthUrlParams>,
) -> Result<impl IntoResponse, ApiError> {
	require_non_empty("redirect_uri", &params.redirect_uri)?;
	state.auth.validate_link_token(&params.link_token)?;

	let oauth_state = generate_state_token();
	let link_auth_url = state
		.auth
		.authorization_url(&provider, &oauth_state, &params.redirect_uri)?;

	let cookie = set_cookie_value(
		STATE_COOKIE_NAME,
		&oauth_state,
		STATE_COOKIE_MAX_AGE_SECS,
		state.cookie_secure,
	);
	Ok((
		[(header::SET_COOKIE, cookie)],
		Json(LinkAuthUrlResponse { link_auth_url }),
	))
}

/// Confirm a pending link and sign the user in.
#[utoipa::path(
	post,
	path = "/api/login/social/link",
	request_body = ConfirmLinkRequest,
	responses(
		(status = 204, description = "Linked and signed in; session issued via Set-Cookie"),
		(status = 400, description = "Bad provider, state, code, or link token", body = ErrorResponse),
		(status = 409, description = "Identity no longer matches the pending link", body = ErrorResponse)
	),
	tag = "social"
)]
#[tracing::instrument(skip(state, headers, payload))]
pub async fn confirm_social_link(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<ConfirmLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
	check_state(&headers, &payload.state)?;

	let user = state
		.auth
		.confirm_link(
			&payload.link_token,
			&payload.provider,
			&payload.code,
			&payload.redirect_uri,
		)
		.await?;

	let session_cookie = issue_session_cookie(&state, user.id).await?;
	let clear_state = clear_cookie_value(STATE_COOKIE_NAME, state.cookie_secure);
	Ok((
		StatusCode::NO_CONTENT,
		AppendHeaders([
			(header::SET_COOKIE, session_cookie),
			(header::SET_COOKIE, clear_state),
		]),
	))
}

/// Attach a provider identity to the signed-in user's account.
#[utoipa::path(
	post,
	path = "/api/user/link/{provider}",
	params(
		("provider" = String, Path, description = "Provider wire name (google, facebook)")
	),
	request_body = LinkProviderRequest,
	responses(
		(status = 204, description = "Identity linked"),
		(status = 400, description = "Bad provider, state, or code", body = ErrorResponse),
		(status = 401, description = "No valid session", body = ErrorResponse),
		(status = 409, description = "Identity already linked elsewhere", body = ErrorResponse)
	),
	tag = "social"
)]
#[tracing::instrument(skip(state, current_user, headers, payload), fields(provider = %provider))]
pub async fn link_provider(
	State(state): State<AppState>,
	current_user: CurrentUser,
	Path(provider): Path<String>,
	headers: HeaderMap,
	Json(payload): Json<LinkProviderRequest>,
) -> Result<impl IntoResponse, ApiError> {
	check_state(&headers, &payload.state)?;

	let user = current_user.0;
	state
		.auth
		.link_social_account(user.id, &provider, &payload.code, &payload.redirect_uri)
		.await?;

	let clear_state = clear_cookie_value(STATE_COOKIE_NAME, state.cookie_secure);
	Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, clear_state)]))
}

/// Detach a provider identity from the signed-in user's account.
///
/// The identity is released, not deleted: a later sign-in with it goes back
/// through the normal decision procedure.
#[utoipa::path(
	delete,
	path = "/api/user/link/{provider}",
	params(
		("provider" = String, Path, description = "Provider wire name (google, facebook)")
	),
	responses(
		(status = 204, description = "Identity unlinked"),
		(status = 400, description = "Unknown provider", body = ErrorResponse),
		(status = 401, description = "No valid session", body = ErrorResponse),
		(status = 409, description = "No identity linked for this provider", body = ErrorResponse)
	),
	tag = "social"
)]
#[tracing::instrument(skip(state, current_user), fields(provider = %provider))]
pub async fn unlink_provider(
	State(state): State<AppState>,
	current_user: CurrentUser,
	Path(provider): Path<String>,
) -> Result<StatusCode, ApiError> {
	let user = current_user.0;
	state.auth.unlink_social_account(user.id, &provider).await?;
	Ok(StatusCode::NO_CONTENT)
}
