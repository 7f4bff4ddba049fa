// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Profile handlers for the signed-in user.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use splice_server_auth::{AuthError, SocialAccount, StoreError, User};
use utoipa::ToSchema;

use crate::api::AppState;
use crate::api_response::{require_non_empty, ApiError, ErrorResponse};
use crate::session::CurrentUser;

/// A linked social account, as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct SocialAccountResponse {
	/// Provider wire name (`google`, `facebook`).
	pub provider: String,
	/// Email reported by the provider at the last sign-in.
	pub email: String,
	/// Display name reported by the provider.
	pub name: String,
	/// Avatar URL reported by the provider, if any.
	pub avatar: Option<String>,
	pub created_at: DateTime<Utc>,
}

impl From<SocialAccount> for SocialAccountResponse {
	fn from(account: SocialAccount) -> Self {
		Self {
			provider: account.provider.as_str().to_string(),
			email: account.email,
			name: account.name,
			avatar: account.avatar,
			created_at: account.created_at,
		}
	}
}

/// A user account, as returned by the API.
///
/// The password hash is not a field of this type, so it cannot leak through
/// serialization.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
	pub id: i64,
	pub email: String,
	pub name: String,
	pub avatar: Option<String>,
	pub social_accounts: Vec<SocialAccountResponse>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
	fn from(user: User) -> Self {
		Self {
			id: user.id.as_i64(),
			email: user.email,
			name: user.name,
			avatar: user.avatar,
			social_accounts: user.social_accounts.into_iter().map(Into::into).collect(),
			created_at: user.created_at,
			updated_at: user.updated_at,
		}
	}
}

/// Request body for `PATCH /api/user/avatar`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAvatarRequest {
	pub avatar: String,
}

/// Return the signed-in user's profile, including linked social accounts.
#[utoipa::path(
	get,
	path = "/api/user",
	responses(
		(status = 200, description = "The signed-in user", body = UserResponse),
		(status = 401, description = "No valid session", body = ErrorResponse)
	),
	tag = "users"
)]
#[tracing::instrument(skip(user))]
pub async fn get_current_user(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
	Json(UserResponse::from(user))
}

/// Update the signed-in user's avatar URL.
#[utoipa::path(
	patch,
	path = "/api/user/avatar",
	request_body = UpdateAvatarRequest,
	responses(
		(status = 204, description = "Avatar updated"),
		(status = 400, description = "Blank avatar value", body = ErrorResponse),
		(status = 401, description = "No valid session", body = ErrorResponse)
	),
	tag = "users"
)]
#[tracing::instrument(skip(state, current_user, payload))]
pub async fn update_avatar(
	State(state): State<AppState>,
	current_user: CurrentUser,
	Json(payload): Json<UpdateAvatarRequest>,
) -> Result<StatusCode, ApiError> {
	require_non_empty("avatar", &payload.avatar)?;

	let user = current_user.0;
	match state
		.accounts
		.update_user_avatar(user.id, &payload.avatar)
		.await
	{
		Ok(_) => {
			tracing::info!(user_id = %user.id, "avatar updated");
			Ok(StatusCode::NO_CONTENT)
		}
		// The account can be deleted out from under a live session.
		Err(StoreError::NotFound(_)) => Err(AuthError::UserNotFound.into()),
		Err(err) => Err(err.into()),
	}
}
