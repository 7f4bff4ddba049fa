// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! API error responses.
//!
//! Every error leaving this server has the same JSON shape: a stable
//! machine-readable `error` code plus a human-readable `message`. Handlers
//! return [`ApiError`] and let `?` do the mapping: [`AuthError`] and
//! [`StoreError`] convert into the right status and error code, and anything
//! internal is logged server-side rather than leaked into the body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use splice_server_auth::{AuthError, StoreError};
use utoipa::ToSchema;

/// The JSON body carried by every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
	/// Stable machine-readable error code (e.g. `invalid_credentials`).
	pub error: String,
	/// Human-readable description of what went wrong.
	pub message: String,
}

/// An HTTP error: a status code plus the JSON error body.
#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	body: ErrorResponse,
}

impl ApiError {
	/// Create an error response with an explicit status code.
	pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			status,
			body: ErrorResponse {
				error: error.into(),
				message: message.into(),
			},
		}
	}

	/// Create a 400 Bad Request response.
	pub fn bad_request(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, error, message)
	}

	/// Create a 401 Unauthorized response.
	pub fn unauthorized(message: impl Into<String>) -> Self {
		Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
	}

	/// Create a 404 Not Found response.
	pub fn not_found(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(StatusCode::NOT_FOUND, error, message)
	}

	/// Create a 409 Conflict response.
	pub fn conflict(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(StatusCode::CONFLICT, error, message)
	}

	/// Create a 500 Internal Server Error response with a generic body.
	pub fn internal_error() -> Self {
		Self::new(
			StatusCode::INTERNAL_SERVER_ERROR,
			"internal_error",
			"an internal error occurred",
		)
	}

	/// The HTTP status this error maps to.
	pub fn status(&self) -> StatusCode {
		self.status
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status, Json(self.body)).into_response()
	}
}

impl From<AuthError> for ApiError {
	fn from(err: AuthError) -> Self {
		let message = err.to_string();
		match err {
			AuthError::InvalidProvider(_) => {
				Self::bad_request("invalid_provider", message)
			}
			AuthError::SocialProviderFetchFailed(source) => {
				// The gateway error can carry upstream URLs and response
				// bodies; log it, return a generic description.
				tracing::warn!(error = %source, "provider exchange failed");
				Self::bad_request(
					"social_provider_fetch_failed",
					"failed to fetch identity from provider",
				)
			}
			AuthError::DuplicateEmail => Self::conflict("duplicate_email", message),
			AuthError::UserNotFound => Self::not_found("user_not_found", message),
			AuthError::InvalidCredentials => {
				Self::new(StatusCode::UNAUTHORIZED, "invalid_credentials", message)
			}
			AuthError::InvalidLinkToken => Self::bad_request("invalid_link_token", message),
			AuthError::MismatchedLinkedUser => {
				Self::conflict("mismatched_linked_user", message)
			}
			AuthError::SocialAccountAlreadyLinked => {
				Self::conflict("social_account_already_linked", message)
			}
			AuthError::SocialAccountAlreadyUnlinked => {
				Self::conflict("social_account_already_unlinked", message)
			}
			AuthError::Store(source) => {
				tracing::error!(error = %source, "store error while handling request");
				Self::internal_error()
			}
			AuthError::Internal(detail) => {
				tracing::error!(error = %detail, "internal error while handling request");
				Self::internal_error()
			}
		}
	}
}

impl From<StoreError> for ApiError {
	fn from(err: StoreError) -> Self {
		Self::from(AuthError::from(err))
	}
}

/// Reject a blank required field with a 400 `validation_error`.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
	if value.trim().is_empty() {
		return Err(ApiError::bad_request(
			"validation_error",
			format!("{field} must not be empty"),
		));
	}
	Ok(())
}
