// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication configuration: session lifetime and link-token signing.

use serde::Deserialize;
use splice_common_config::SecretString;

const DEFAULT_LINK_TOKEN_TTL_SECS: u64 = 300;
const DEFAULT_SESSION_TTL_HOURS: u64 = 720;

/// Authentication configuration (runtime, fully resolved).
///
/// `link_token_secret` signs the short-lived tokens that carry a pending
/// social-account link across the confirmation round trip. It is loaded from
/// `SPLICE_SERVER_LINK_TOKEN_SECRET` (or the `_FILE` variant), never from the
/// config file. Validation rejects configurations that enable an OAuth
/// provider without it.
#[derive(Debug, Clone)]
pub struct AuthConfig {
	pub link_token_secret: Option<SecretString>,
	pub link_token_ttl_secs: u64,
	pub session_ttl_hours: u64,
	pub cookie_secure: bool,
}

impl Default for AuthConfig {
	fn default() -> Self {
		Self {
			link_token_secret: None,
			link_token_ttl_secs: DEFAULT_LINK_TOKEN_TTL_SECS,
			session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
			cookie_secure: false,
		}
	}
}

/// Authentication configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub link_token_ttl_secs: Option<u64>,
	#[serde(default)]
	pub session_ttl_hours: Option<u64>,
	#[serde(default)]
	pub cookie_secure: Option<bool>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.link_token_ttl_secs.is_some() {
			self.link_token_ttl_secs = other.link_token_ttl_secs;
		}
		if other.session_ttl_hours.is_some() {
			self.session_ttl_hours = other.session_ttl_hours;
		}
		if other.cookie_secure.is_some() {
			self.cookie_secure = other.cookie_secure;
		}
	}

	pub fn finalize(self, link_token_secret: Option<SecretString>) -> AuthConfig {
		AuthConfig {
			link_token_secret,
			link_token_ttl_secs: self
				.link_token_ttl_secs
				.unwrap_or(DEFAULT_LINK_TOKEN_TTL_SECS),
			session_ttl_hours: self.session_ttl_hours.unwrap_or(DEFAULT_SESSION_TTL_HOURS),
			cookie_secure: self.cookie_secure.unwrap_or(false),
		}
	}
}
