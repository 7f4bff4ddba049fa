// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the Splice server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`SPLICE_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use splice_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}:{}", config.http.host, config.http.port);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub auth: AuthConfig,
	pub oauth: OAuthConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`SPLICE_SERVER_*`)
/// 2. Config file (`/etc/splice/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	let mut sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	];

	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	let mut sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	];

	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let oauth = layer.oauth.unwrap_or_default().finalize()?;

	let link_token_secret =
		splice_common_config::load_secret_env("SPLICE_SERVER_LINK_TOKEN_SECRET")
			.map_err(|e| ConfigError::Secret(e.to_string()))?;
	let auth = layer.auth.unwrap_or_default().finalize(link_token_secret);

	validate_config(&auth, &oauth)?;

	info!(
		host = %http.host,
		port = http.port,
		database = %database.url,
		google_oauth_configured = oauth.google.is_some(),
		facebook_oauth_configured = oauth.facebook.is_some(),
		link_token_secret_configured = auth.link_token_secret.is_some(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		database,
		auth,
		oauth,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(auth: &AuthConfig, oauth: &OAuthConfig) -> Result<(), ConfigError> {
	let any_provider = oauth.google.is_some() || oauth.facebook.is_some();
	if any_provider && auth.link_token_secret.is_none() {
		return Err(ConfigError::Validation(
			"an OAuth provider is configured but SPLICE_SERVER_LINK_TOKEN_SECRET is not set. \
			 Social sign-in cannot issue link confirmation tokens without a signing secret."
				.to_string(),
		));
	}

	if auth.link_token_ttl_secs == 0 {
		return Err(ConfigError::Validation(
			"SPLICE_SERVER_LINK_TOKEN_TTL_SECS must be greater than zero; \
			 a zero TTL makes every link token expired at mint time."
				.to_string(),
		));
	}

	if auth.session_ttl_hours == 0 {
		return Err(ConfigError::Validation(
			"SPLICE_SERVER_SESSION_TTL_HOURS must be greater than zero.".to_string(),
		));
	}

	Ok(())
}
