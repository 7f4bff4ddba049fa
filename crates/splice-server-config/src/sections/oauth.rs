// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OAuth provider credentials (Google, Facebook).
//!
//! Client IDs may come from the config file or environment; client secrets are
//! only ever loaded from the environment (`SPLICE_SERVER_<PROVIDER>_CLIENT_SECRET`
//! or its `_FILE` variant), so the layer field is skipped during TOML
//! deserialization. A provider is configured when both halves are present;
//! setting exactly one is rejected rather than silently disabling the provider.

use serde::Deserialize;
use splice_common_config::SecretString;

use crate::error::ConfigError;

/// Resolved credentials for one OAuth provider.
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
	pub client_id: String,
	pub client_secret: SecretString,
}

/// OAuth configuration (runtime, fully resolved).
///
/// A `None` provider entry means that provider is not configured and its
/// sign-in routes reject requests.
#[derive(Debug, Clone, Default)]
pub struct OAuthConfig {
	pub google: Option<OAuthProviderConfig>,
	pub facebook: Option<OAuthProviderConfig>,
}

/// Per-provider configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthProviderConfigLayer {
	#[serde(default)]
	pub client_id: Option<String>,
	#[serde(skip)]
	pub client_secret: Option<SecretString>,
}

impl OAuthProviderConfigLayer {
	pub fn merge(&mut self, other: OAuthProviderConfigLayer) {
		if other.client_id.is_some() {
			self.client_id = other.client_id;
		}
		if other.client_secret.is_some() {
			self.client_secret = other.client_secret;
		}
	}

	pub fn finalize(self, provider: &str) -> Result<Option<OAuthProviderConfig>, ConfigError> {
		match (self.client_id, self.client_secret) {
			(Some(client_id), Some(client_secret)) => Ok(Some(OAuthProviderConfig {
				client_id,
				client_secret,
			})),
			(None, None) => Ok(None),
			(Some(_), None) => Err(ConfigError::Validation(format!(
				"{provider} OAuth client_id is set without a client secret; \
				 set SPLICE_SERVER_{}_CLIENT_SECRET or remove the client_id",
				provider.to_uppercase()
			))),
			(None, Some(_)) => Err(ConfigError::Validation(format!(
				"{provider} OAuth client secret is set without a client_id; \
				 set SPLICE_SERVER_{}_CLIENT_ID or remove the secret",
				provider.to_uppercase()
			))),
		}
	}
}

/// OAuth configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthConfigLayer {
	#[serde(default)]
	pub google: OAuthProviderConfigLayer,
	#[serde(default)]
	pub facebook: OAuthProviderConfigLayer,
}

impl OAuthConfigLayer {
	pub fn merge(&mut self, other: OAuthConfigLayer) {
		self.google.merge(other.google);
		self.facebook.merge(other.facebook);
	}

	pub fn finalize(self) -> Result<OAuthConfig, ConfigError> {
		Ok(OAuthConfig {
			google: self.google.finalize("google")?,
			facebook: self.facebook.finalize("facebook")?,
		})
	}
}
