// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Google OAuth 2.0 sign-in for Splice.
//!
//! This module implements the Google OAuth 2.0 authorization code flow and
//! exposes it through the [`IdentityGateway`] trait so the rest of the server
//! never sees Google-specific wire formats.
//!
//! # OAuth Flow
//!
//! 1. **Authorization URL Generation**: Generate a URL with a state parameter
//!    for CSRF protection. The user is redirected to Google to authorize the
//!    application.
//!
//! 2. **User Authorization**: The user authorizes in their browser and is
//!    redirected back to the caller's `redirect_uri` with an authorization
//!    `code` and `state` parameter.
//!
//! 3. **Code Exchange**: Exchange the authorization code for tokens at
//!    Google's token endpoint using the client credentials.
//!
//! 4. **Identity Extraction**: The token response carries an OpenID Connect
//!    `id_token` whose claims hold the stable subject identifier, email,
//!    display name, and picture. No further API round trip is needed.
//!
//! # Security Considerations
//!
//! - The `client_secret` is wrapped in [`SecretString`] to prevent accidental logging.
//! - Access tokens in [`GoogleTokenResponse`] are also wrapped to prevent exposure.
//! - All tracing instrumentation skips sensitive parameters.
//! - Always validate the `state` parameter in callbacks to prevent CSRF attacks.

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;
use splice_common_secret::SecretString;
use splice_server_auth::{GatewayError, IdentityGateway, Provider, VerifiedIdentity};
use url::Url;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

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

/// Configuration for the Google OAuth client.
///
/// The `client_secret` is wrapped in [`SecretString`] to prevent accidental
/// logging or exposure. There is no configured redirect URI: callers pass one
/// per request, because the callback route differs between the sign-in and
/// link-confirmation flows.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
	/// The OAuth application client ID.
	pub client_id: String,
	/// The OAuth application client secret (wrapped to prevent logging).
	pub client_secret: SecretString,
	/// OAuth scopes to request (e.g., "openid", "email").
	pub scopes: Vec<String>,
}

impl GoogleOAuthConfig {
	/// Build a configuration with the default scopes (`openid`, `profile`,
	/// `email`).
	pub fn new(client_id: String, client_secret: SecretString) -> Self {
		Self {
			client_id,
			client_secret,
			scopes: vec![
				"openid".to_string(),
				"profile".to_string(),
				"email".to_string(),
			],
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

	/// Join scopes into a space-separated string for the authorization URL.
	pub fn scopes_string(&self) -> String {
		self.scopes.join(" ")
	}
}

// =============================================================================
// Response types
// =============================================================================

/// Response from Google's token endpoint after exchanging an authorization code.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenResponse {
	/// The access token for API requests (wrapped to prevent logging).
	#[serde(deserialize_with = "splice_common_secret::deserialize_secret_string")]
	pub access_token: SecretString,
	/// The token type (always "Bearer").
	pub token_type: String,
	/// Seconds until the access token expires.
	pub expires_in: i64,
	/// The signed OpenID Connect identity token carrying the user's claims.
	pub id_token: String,
}

/// Claims extracted from the `id_token` payload.
///
/// Only the claims the service consumes are modeled; everything else in the
/// token is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleIdTokenClaims {
	/// Google's stable subject identifier for the user.
	pub sub: String,
	/// The user's email address.
	pub email: String,
	/// Whether Google has verified the email address.
	#[serde(default)]
	pub email_verified: bool,
	/// Display name (optional, may be absent for minimal profiles).
	pub name: Option<String>,
	/// Profile picture URL (optional).
	pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
	error: String,
	error_description: Option<String>,
}

/// Read the claims out of an `id_token`.
///
/// The token's signature is not checked: the token was just received over TLS
/// directly from Google's token endpoint, never from the client, so the
/// transport already authenticates its origin.
fn decode_id_token_claims(id_token: &str) -> Result<GoogleIdTokenClaims, GatewayError> {
	let mut segments = id_token.split('.');
	let (Some(_header), Some(payload), Some(_signature), None) = (
		segments.next(),
		segments.next(),
		segments.next(),
		segments.next(),
	) else {
		return Err(GatewayError::Parse(
			"id_token is not a three-segment JWT".to_string(),
		));
	};

	let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
		.decode(payload)
		.map_err(|e| GatewayError::Parse(format!("failed to decode id_token payload: {e}")))?;

	serde_json::from_slice(&bytes)
		.map_err(|e| GatewayError::Parse(format!("failed to parse id_token claims: {e}")))
}

fn identity_from_claims(claims: GoogleIdTokenClaims) -> VerifiedIdentity {
	VerifiedIdentity {
		provider_user_id: claims.sub,
		email: claims.email,
		name: claims.name.unwrap_or_default(),
		avatar: claims.picture.filter(|p| !p.is_empty()),
	}
}

// =============================================================================
// Client
// =============================================================================

/// OAuth client for authenticating users via Google.
///
/// Handles the OAuth 2.0 authorization code flow with Google: generating
/// authorization URLs, exchanging codes for tokens, and extracting the
/// user's identity from the `id_token`.
#[derive(Debug, Clone)]
pub struct GoogleOAuthClient {
	config: GoogleOAuthConfig,
	http_client: reqwest::Client,
}

impl GoogleOAuthClient {
	/// Create a new Google OAuth client with the given configuration.
	///
	/// # Panics
	///
	/// Panics if the HTTP client cannot be built (should never happen in practice).
	#[tracing::instrument(skip_all, name = "GoogleOAuthClient::new")]
	pub fn new(config: GoogleOAuthConfig) -> Self {
		let http_client = splice_common_http::builder()
			.build()
			.expect("failed to build HTTP client");

		Self {
			config,
			http_client,
		}
	}

	/// Generate the Google authorization URL for the OAuth flow.
	///
	/// # Arguments
	///
	/// - `state`: A random, unguessable string to prevent CSRF attacks. This
	///   value should be stored server-side and verified when the user is
	///   redirected back.
	/// - `redirect_uri`: Where Google sends the user after authorization.
	#[tracing::instrument(skip(self, redirect_uri), fields(client_id = %self.config.client_id))]
	pub fn authorization_url(&self, state: &str, redirect_uri: &str) -> String {
		let mut url = Url::parse(GOOGLE_AUTHORIZE_URL).expect("invalid authorize URL");

		url.query_pairs_mut()
			.append_pair("client_id", &self.config.client_id)
			.append_pair("redirect_uri", redirect_uri)
			.append_pair("response_type", "code")
			.append_pair("scope", &self.config.scopes_string())
			.append_pair("state", state);

		url.to_string()
	}

	/// Exchange an authorization code for tokens.
	///
	/// # Arguments
	///
	/// - `code`: The authorization code from the OAuth callback.
	/// - `redirect_uri`: The same redirect URI used to obtain the code;
	///   Google rejects the exchange if they differ.
	///
	/// # Errors
	///
	/// - [`GatewayError::Http`]: Network error or timeout.
	/// - [`GatewayError::Rejected`]: Google rejected the code (expired, reused, etc.).
	/// - [`GatewayError::Parse`]: Unexpected response format.
	#[tracing::instrument(skip(self, code, redirect_uri), name = "GoogleOAuthClient::exchange_code")]
	pub async fn exchange_code(
		&self,
		code: &str,
		redirect_uri: &str,
	) -> Result<GoogleTokenResponse, GatewayError> {
		tracing::debug!("exchanging authorization code for tokens");

		let response = self
			.http_client
			.post(GOOGLE_TOKEN_URL)
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

		if let Ok(error_response) = serde_json::from_str::<GoogleErrorResponse>(&body) {
			if !error_response.error.is_empty() {
				let message = error_response
					.error_description
					.unwrap_or(error_response.error);
				return Err(GatewayError::Rejected(message));
			}
		}

		serde_json::from_str(&body)
			.map_err(|e| GatewayError::Parse(format!("failed to parse token response: {e}")))
	}
}

#[async_trait]
impl IdentityGateway for GoogleOAuthClient {
	fn provider(&self) -> Provider {
		Provider::Google
	}

	fn authorization_url(&self, state: &str, redirect_uri: &str) -> String {
		GoogleOAuthClient::authorization_url(self, state, redirect_uri)
	}

	#[tracing::instrument(skip(self, code, redirect_uri), name = "GoogleOAuthClient::verified_identity")]
	async fn verified_identity(
		&self,
		code: &str,
		redirect_uri: &str,
	) -> Result<VerifiedIdentity, GatewayError> {
		let token = self.exchange_code(code, redirect_uri).await?;
		let claims = decode_id_token_claims(&token.id_token)?;
		Ok(identity_from_claims(claims))
	}
}
