// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Facebook OAuth 2.0 sign-in for Splice.
//!
//! This module implements the Facebook OAuth 2.0 authorization code flow and
//! exposes it through the [`IdentityGateway`] trait so the rest of the server
//! never sees Graph-API-specific wire formats.
//!
//! # OAuth Flow
//!
//! 1. **Authorization URL Generation**: Generate a URL with a state parameter
//!    for CSRF protection. The user is redirected to Facebook to authorize
//!    the application.
//!
//! 2. **User Authorization**: The user authorizes in their browser and is
//!    redirected back to the caller's `redirect_uri` with an authorization
//!    `code` and `state` parameter.
//!
//! 3. **Code Exchange**: Exchange the authorization code for an access token
//!    at the Graph API token endpoint using the client credentials.
//!
//! 4. **Profile Fetch**: Unlike Google there is no identity token, so a
//!    second request to `/me` fetches the id, name, email, and picture.
//!
//! # Security Considerations
//!
//! - The `client_secret` is wrapped in [`SecretString`] to prevent accidental logging.
//! - Access tokens in [`FacebookTokenResponse`] are also wrapped to prevent exposure.
//! - All tracing instrumentation skips sensitive parameters.
//! - Always validate the `state` parameter in callbacks to prevent CSRF attacks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use splice_common_secret::SecretString;
use splice_server_auth::{GatewayError, IdentityGateway, Provider, VerifiedIdentity};
use url::Url;

const FACEBOOK_AUTHORIZE_URL: &str = "https://www.facebook.com/v16.0/dialog/oauth";
const FACEBOOK_TOKEN_URL: &str = "https://graph.facebook.com/v16.0/oauth/access_token";
const FACEBOOK_ME_URL: &str = "https://graph.facebook.com/v16.0/me";

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur when building the client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// A configuration value was empty or invalid.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Facebook OAuth client.
///
/// The `client_secret` is wrapped in [`SecretString`] to prevent accidental
/// logging or exposure. There is no configured redirect URI: callers pass one
/// per request, because the callback route differs between the sign-in and
/// link-confirmation flows.
#[derive(Debug, Clone)]
pub struct FacebookOAuthConfig {
	/// The OAuth application client ID.
	pub client_id: String,
	/// The OAuth application client secret (wrapped to prevent logging).
	pub client_secret: SecretString,
	/// OAuth scopes to request. `public_profile` is always granted, so the
	/// only scope requested by default is `email`.
	pub scopes: Vec<String>,
}

impl FacebookOAuthConfig {
	/// Build a configuration with the default scope (`email`).
	pub fn new(client_id: String, client_secret: SecretString) -> Self {
		Self {
			client_id,
			client_secret,
			scopes: vec!["email".to_string()],
		}
	}

	/// Validate that all configuration fields are non-empty.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::InvalidConfig`] if any field is empty.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.is_empty() {
			return Err(ConfigError::InvalidConfig(
				"client_id cannot be empty".to_string(),
			));
		}
		if self.client_secret.expose().is_empty() {
			return Err(ConfigError::InvalidConfig(
				"client_secret cannot be empty".to_string(),
			));
		}
		Ok(())
	}

	/// Join scopes into a comma-separated string for the authorization URL.
	pub fn scopes_string(&self) -> String {
		self.scopes.join(",")
	}
}

// =============================================================================
// Response types
// =============================================================================

/// Response from the Graph API token endpoint after exchanging an
/// authorization code.
#[derive(Debug, Clone, Deserialize)]
pub struct FacebookTokenResponse {
	/// The access token for Graph API requests (wrapped to prevent logging).
	#[serde(deserialize_with = "splice_common_secret::deserialize_secret_string")]
	pub access_token: SecretString,
	/// The token type (always "bearer").
	pub token_type: String,
	/// Seconds until the access token expires.
	pub expires_in: i64,
}

/// User profile information from the Graph API `/me` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacebookUser {
	/// Facebook's app-scoped user ID.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Email address. Absent when the user declined the `email` permission
	/// or has no confirmed email on the account.
	pub email: Option<String>,
	/// Profile picture, as a nested `{ "data": { "url": ... } }` object.
	pub picture: Option<FacebookPicture>,
}

/// The envelope the Graph API wraps picture data in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacebookPicture {
	pub data: FacebookPictureData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacebookPictureData {
	/// URL of the picture.
	pub url: String,
}

#[derive(Debug, Deserialize)]
struct FacebookErrorResponse {
	error: FacebookErrorDetail,
}

#[derive(Debug, Deserialize)]
struct FacebookErrorDetail {
	message: String,
}

fn identity_from_profile(profile: FacebookUser) -> VerifiedIdentity {
	VerifiedIdentity {
		provider_user_id: profile.id,
		email: profile.email.unwrap_or_default(),
		name: profile.name,
		avatar: profile
			.picture
			.map(|p| p.data.url)
			.filter(|u| !u.is_empty()),
	}
}

// =============================================================================
// Client
// =============================================================================

/// OAuth client for authenticating users via Facebook.
///
/// Handles the OAuth 2.0 authorization code flow with Facebook: generating
/// authorization URLs, exchanging codes for tokens, and fetching the user's
/// profile from the Graph API.
#[derive(Debug, Clone)]
pub struct FacebookOAuthClient {
	config: FacebookOAuthConfig,
	http_client: reqwest::Client,
}

impl FacebookOAuthClient {
	/// Create a new Facebook OAuth client with the given configuration.
	///
	/// # Panics
	///
	/// Panics if the HTTP client cannot be built (should never happen in practice).
	#[tracing::instrument(skip_all, name = "FacebookOAuthClient::new")]
	pub fn new(config: FacebookOAuthConfig) -> Self {
		let http_client = splice_common_http::builder()
			.build()
			.expect("failed to build HTTP client");

		Self {
			config,
			http_client,
		}
	}

	/// Generate the Facebook authorization URL for the OAuth flow.
	///
	/// # Arguments
	///
	/// - `state`: A random, unguessable string to prevent CSRF attacks. This
	///   value should be stored server-side and verified when the user is
	///   redirected back.
	/// - `redirect_uri`: Where Facebook sends the user after authorization.
	#[tracing::instrument(skip(self, redirect_uri), fields(client_id = %self.config.client_id))]
	pub fn authorization_url(&self, state: &str, redirect_uri: &str) -> String {
		let mut url = Url::parse(FACEBOOK_AUTHORIZE_URL).expect("invalid authorize URL");

		url.query_pairs_mut()
			.append_pair("client_id", &self.config.client_id)
			.append_pair("redirect_uri", redirect_uri)
			.append_pair("response_type", "code")
			.append_pair("scope", &self.config.scopes_string())
			.append_pair("state", state);

		url.to_string()
	}

	/// Exchange an authorization code for an access token.
	///
	/// # Arguments
	///
	/// - `code`: The authorization code from the OAuth callback.
	/// - `redirect_uri`: The same redirect URI used to obtain the code;
	///   Facebook rejects the exchange if they differ.
	///
	/// # Errors
	///
	/// - [`GatewayError::Http`]: Network error or timeout.
	/// - [`GatewayError::Rejected`]: Facebook rejected the code (expired, reused, etc.).
	/// - [`GatewayError::Parse`]: Unexpected response format.
	#[tracing::instrument(skip(self, code, redirect_uri), name = "FacebookOAuthClient::exchange_code")]
	pub async fn exchange_code(
		&self,
		code: &str,
		redirect_uri: &str,
	) -> Result<FacebookTokenResponse, GatewayError> {
		tracing::debug!("exchanging authorization code for access token");

		let response = self
			.http_client
			.post(FACEBOOK_TOKEN_URL)
			.header("Accept", "application/json")
			.form(&[
				("code", code),
				("client_id", self.config.client_id.as_str()),
				("client_secret", self.config.client_secret.expose().as_str()),
				("redirect_uri", redirect_uri),
				("grant_type", "authorization_code"),
			])
			.send()
			.await?;

		let body = response.text().await?;

		if let Ok(error_response) = serde_json::from_str::<FacebookErrorResponse>(&body) {
			return Err(GatewayError::Rejected(error_response.error.message));
		}

		serde_json::from_str(&body)
			.map_err(|e| GatewayError::Parse(format!("failed to parse token response: {e}")))
	}

	/// Fetch the authenticated user's profile from the Graph API.
	///
	/// # Arguments
	///
	/// - `access_token`: The OAuth access token from [`Self::exchange_code`].
	///
	/// # Errors
	///
	/// - [`GatewayError::Http`]: Network error or timeout.
	/// - [`GatewayError::Rejected`]: Token is invalid or expired.
	/// - [`GatewayError::Parse`]: Unexpected response format.
	#[tracing::instrument(skip(self, access_token), name = "FacebookOAuthClient::get_profile")]
	pub async fn get_profile(&self, access_token: &str) -> Result<FacebookUser, GatewayError> {
		tracing::debug!("fetching Facebook user profile");

		let response = self
			.http_client
			.get(FACEBOOK_ME_URL)
			.query(&[("fields", "id,name,email,picture")])
			.header("Authorization", format!("Bearer {access_token}"))
			.send()
			.await?;

		if !response.status().is_success() {
			let body = response.text().await.unwrap_or_default();
			let message = serde_json::from_str::<FacebookErrorResponse>(&body)
				.map(|e| e.error.message)
				.unwrap_or(body);
			return Err(GatewayError::Rejected(format!(
				"failed to get profile: {message}"
			)));
		}

		response
			.json()
			.await
			.map_err(|e| GatewayError::Parse(format!("failed to parse profile response: {e}")))
	}
}

#[async_trait]
impl IdentityGateway for FacebookOAuthClient {
	fn provider(&self) -> Provider {
		Provider::Facebook
	}

	fn authorization_url(&self, state: &str, redirect_uri: &str) -> String {
		FacebookOAuthClient::authorization_url(self, state, redirect_uri)
	}

	#[tracing::instrument(skip(self, code, redirect_uri), name = "FacebookOAuthClient::verified_identity")]
	async fn verified_identity(
		&self,
		code: &str,
		redirect_uri: &str,
	) -> Result<VerifiedIdentity, GatewayError> {
		let token = self.exchange_code(code, redirect_uri).await?;
		let profile = self.get_profile(token.access_token.expose()).await?;
		Ok(identity_from_profile(profile))
	}
}
