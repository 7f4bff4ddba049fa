// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! OpenAPI document assembly.

use utoipa::OpenApi;

/// The OpenAPI document covering every route this server exposes.
#[derive(OpenApi)]
#[openapi(
	info(
		title = "splice-server",
		description = "Account service with email/password and social sign-in"
	),
	paths(
		crate::routes::health::health_check,
		crate::routes::auth::register,
		crate::routes::auth::login,
		crate::routes::auth::logout,
		crate::routes::users::get_current_user,
		crate::routes::users::update_avatar,
		crate::routes::social::social_auth_url,
		crate::routes::social::social_auth_callback,
		crate::routes::social::link_auth_url,
		crate::routes::social::confirm_social_link,
		crate::routes::social::link_provider,
		crate::routes::social::unlink_provider,
	),
	components(schemas(
		crate::api_response::ErrorResponse,
		crate::routes::health::HealthResponse,
		crate::routes::auth::RegisterRequest,
		crate::routes::auth::LoginRequest,
		crate::routes::users::UserResponse,
		crate::routes::users::SocialAccountResponse,
		crate::routes::users::UpdateAvatarRequest,
		crate::routes::social::AuthUrlResponse,
		crate::routes::social::SocialCallbackRequest,
		crate::routes::social::LinkRequiredResponse,
		crate::routes::social::LinkAuthUrlResponse,
		crate::routes::social::ConfirmLinkRequest,
		crate::routes::social::LinkProviderRequest,
	)),
	tags(
		(name = "health", description = "Liveness checks"),
		(name = "auth", description = "Registration, login, and sessions"),
		(name = "users", description = "The signed-in user's profile"),
		(name = "social", description = "Social sign-in and identity linking")
	)
)]
pub struct ApiDoc;
