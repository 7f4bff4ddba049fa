// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Email/password registration, login, and logout handlers.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use splice_server_auth::middleware::{
	clear_cookie_value, extract_session_cookie, SESSION_COOKIE_NAME,
};
use splice_server_auth::{password, AuthError, NewUser};
use utoipa::ToSchema;

use crate::api::AppState;
use crate::api_response::{require_non_empty, ApiError, ErrorResponse};
use crate::routes::users::UserResponse;
use crate::session::issue_session_cookie;

/// Request body for `POST /api/register`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
	pub email: String,
	pub password: String,
	pub name: String,
}

/// Request body for `POST /api/login`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
	pub email: String,
	pub password: String,
}

/// Create an account from an email, password, and display name.
///
/// The password is hashed before storage; the plaintext never leaves this
/// handler. The email must not belong to an existing account.
#[utoipa::path(
	post,
	path = "/api/register",
	request_body = RegisterRequest,
	responses(
		(status = 201, description = "Account created", body = UserResponse),
		(status = 400, description = "Missing or blank fields", body = ErrorResponse),
		(status = 409, description = "Email already registered", body = ErrorResponse)
	),
	tag = "auth"
)]
#[tracing::instrument(skip(state, payload))]
pub async fn register(
	State(state): State<AppState>,
	Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
	require_non_empty("email", &payload.email)?;
	require_non_empty("password", &payload.password)?;
	require_non_empty("name", &payload.name)?;

	let password_hash = password::hash_password(&payload.password)?;
	let user = state
		.accounts
		.create_user(NewUser {
			email: payload.email,
			password_hash: Some(password_hash),
			name: payload.name,
			avatar: None,
		})
		.await?;

	tracing::info!(user_id = %user.id, "user registered");
	Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Authenticate with email and password and start a session.
///
/// A wrong password, an unknown email, and a social-only account (no
/// password set) all produce the same `401 invalid_credentials`, so the
/// endpoint cannot be used to probe which emails are registered.
#[utoipa::path(
	post,
	path = "/api/login",
	request_body = LoginRequest,
	responses(
		(status = 204, description = "Session issued via Set-Cookie"),
		(status = 401, description = "Invalid email or password", body = ErrorResponse)
	),
	tag = "auth"
)]
#[tracing::instrument(skip(state, payload))]
pub async fn login(
	State(state): State<AppState>,
	Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
	let user = state
		.accounts
		.get_user_by_email(&payload.email)
		.await?
		.ok_or(AuthError::InvalidCredentials)?;

	let password_hash = user
		.password_hash
		.as_deref()
		.ok_or(AuthError::InvalidCredentials)?;
	if !password::verify_password(&payload.password, password_hash)? {
		return Err(AuthError::InvalidCredentials.into());
	}

	let cookie = issue_session_cookie(&state, user.id).await?;
	tracing::info!(user_id = %user.id, "user logged in");
	Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

/// End the current session.
///
/// The session row is deleted server-side and the cookie is cleared, so the
/// token cannot be replayed afterwards.
#[utoipa::path(
	post,
	path = "/api/logout",
	responses(
		(status = 204, description = "Session ended, cookie cleared"),
		(status = 401, description = "No valid session", body = ErrorResponse)
	),
	tag = "auth"
)]
#[tracing::instrument(skip(state, headers))]
pub async fn logout(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
	let token = extract_session_cookie(&headers)
		.ok_or_else(|| ApiError::unauthorized("authentication required"))?;

	if !state.sessions.delete_session(&token).await? {
		return Err(ApiError::unauthorized("session expired or unknown"));
	}

	let clearing = clear_cookie_value(SESSION_COOKIE_NAME, state.cookie_secure);
	tracing::info!("user logged out");
	Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, clearing)]))
}
