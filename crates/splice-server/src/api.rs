// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP API routes and application state for account operations.

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use chrono::Duration;
use splice_common_secret::SecretString;
use splice_server_auth::{LinkTokenCodec, ProviderRegistry, SocialAuthService};
use splice_server_auth_facebook::{FacebookOAuthClient, FacebookOAuthConfig};
use splice_server_auth_google::{GoogleOAuthClient, GoogleOAuthConfig};
use splice_server_config::{OAuthProviderConfig, ServerConfig};
use splice_server_db::{AccountRepository, SessionRepository};
use sqlx::SqlitePool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::routes;
use crate::session::generate_session_token;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub accounts: Arc<AccountRepository>,
	pub sessions: Arc<SessionRepository>,
	pub auth: Arc<SocialAuthService>,
	/// Advertised public base URL, used as the server entry in the OpenAPI
	/// document.
	pub base_url: String,
	/// Whether issued cookies carry the `Secure` attribute.
	pub cookie_secure: bool,
	/// Lifetime of a newly issued session.
	pub session_ttl: Duration,
}

/// Create the application state from a database pool and resolved config.
///
/// Providers with credentials in `config.oauth` are registered with the
/// account service; the rest are skipped with a log line, and requests
/// naming them fail with `invalid_provider`.
pub fn create_app_state(pool: SqlitePool, config: &ServerConfig) -> AppState {
	let accounts = Arc::new(AccountRepository::new(pool.clone()));
	let sessions = Arc::new(SessionRepository::new(pool.clone()));

	let mut registry = ProviderRegistry::new();
	if let Some(gateway) = initialize_google_gateway(config.oauth.google.as_ref()) {
		registry.register(gateway);
	}
	if let Some(gateway) = initialize_facebook_gateway(config.oauth.facebook.as_ref()) {
		registry.register(gateway);
	}

	let link_ttl = Duration::seconds(config.auth.link_token_ttl_secs as i64);
	let codec = match &config.auth.link_token_secret {
		Some(secret) => LinkTokenCodec::new(secret, link_ttl),
		None => {
			// Config validation rejects providers without a signing secret,
			// so this branch only runs when no provider is registered and no
			// link token can ever be minted. An ephemeral key keeps the
			// codec constructible without inventing a shared secret.
			let ephemeral = SecretString::new(generate_session_token());
			LinkTokenCodec::new(&ephemeral, link_ttl)
		}
	};

	let auth = Arc::new(SocialAuthService::new(accounts.clone(), registry, codec));

	AppState {
		pool,
		accounts,
		sessions,
		auth,
		base_url: config.http.base_url.clone(),
		cookie_secure: config.auth.cookie_secure,
		session_ttl: Duration::hours(config.auth.session_ttl_hours as i64),
	}
}

/// Initialize the Google OAuth gateway if configured.
fn initialize_google_gateway(
	provider: Option<&OAuthProviderConfig>,
) -> Option<Arc<GoogleOAuthClient>> {
	match provider {
		Some(credentials) => {
			tracing::info!("Google OAuth configured");
			Some(Arc::new(GoogleOAuthClient::new(GoogleOAuthConfig::new(
				credentials.client_id.clone(),
				credentials.client_secret.clone(),
			))))
		}
		None => {
			tracing::info!("Google OAuth not configured");
			None
		}
	}
}

/// Initialize the Facebook OAuth gateway if configured.
fn initialize_facebook_gateway(
	provider: Option<&OAuthProviderConfig>,
) -> Option<Arc<FacebookOAuthClient>> {
	match provider {
		Some(credentials) => {
			tracing::info!("Facebook OAuth configured");
			Some(Arc::new(FacebookOAuthClient::new(FacebookOAuthConfig::new(
				credentials.client_id.clone(),
				credentials.client_secret.clone(),
			))))
		}
		None => {
			tracing::info!("Facebook OAuth not configured");
			None
		}
	}
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
	let mut api_doc = crate::api_docs::ApiDoc::openapi();
	api_doc.servers = Some(vec![utoipa::openapi::Server::new(state.base_url.clone())]);

	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/api/register", post(routes::auth::register))
		.route("/api/login", post(routes::auth::login))
		.route("/api/logout", post(routes::auth::logout))
		.route("/api/user", get(routes::users::get_current_user))
		.route("/api/user/avatar", patch(routes::users::update_avatar))
		.route(
			"/api/login/social/{provider}",
			get(routes::social::social_auth_url),
		)
		.route(
			"/api/login/social/callback",
			post(routes::social::social_auth_callback),
		)
		.route(
			"/api/login/social/{provider}/link",
			get(routes::social::link_auth_url),
		)
		.route(
			"/api/login/social/link",
			post(routes::social::confirm_social_link),
		)
		.route(
			"/api/user/link/{provider}",
			post(routes::social::link_provider).delete(routes::social::unlink_provider),
		)
		.with_state(state)
		.merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", api_doc))
}
