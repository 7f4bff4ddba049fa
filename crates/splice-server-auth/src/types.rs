// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core identifier types and the closed provider set.
//!
//! This module provides:
//! - [`UserId`] / [`SocialAccountId`] - store-assigned numeric id newtypes
//! - [`Provider`] - the closed set of supported identity providers
//! - [`InvalidProviderError`] - returned when a provider name does not parse

use serde::{Deserialize, Serialize};

/// Macro to define a strongly-typed ID wrapper around a store-assigned `i64`.
///
/// Row ids come back from the database as plain integers; wrapping them keeps
/// a user id from ever being passed where a social-account id belongs.
macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(
			Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
		)]
		#[serde(transparent)]
		pub struct $name(i64);

		impl $name {
			/// Wrap a raw id value.
			pub fn new(id: i64) -> Self {
				Self(id)
			}

			/// Unwrap to the raw id value.
			pub fn into_inner(self) -> i64 {
				self.0
			}

			/// The raw id value.
			pub fn as_i64(&self) -> i64 {
				self.0
			}
		}

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<i64> for $name {
			fn from(id: i64) -> Self {
				Self(id)
			}
		}

		impl From<$name> for i64 {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user account.");
define_id_type!(
	SocialAccountId,
	"Unique identifier for a social-account (external identity) row."
);

/// The closed set of supported identity providers.
///
/// New providers are added here and given an [`crate::gateway::IdentityGateway`]
/// implementation; nothing else in the system switches on provider names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
	/// Google OAuth (OpenID Connect).
	Google,
	/// Facebook Login.
	Facebook,
}

impl Provider {
	/// All supported providers.
	pub const ALL: [Provider; 2] = [Provider::Google, Provider::Facebook];

	/// The wire name for this provider (lowercase, stable).
	pub fn as_str(&self) -> &'static str {
		match self {
			Provider::Google => "google",
			Provider::Facebook => "facebook",
		}
	}
}

impl std::fmt::Display for Provider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A provider name that is not in the supported set.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown identity provider: {0}")]
pub struct InvalidProviderError(pub String);

impl std::str::FromStr for Provider {
	type Err = InvalidProviderError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"google" => Ok(Provider::Google),
			"facebook" => Ok(Provider::Facebook),
			other => Err(InvalidProviderError(other.to_string())),
		}
	}
}
