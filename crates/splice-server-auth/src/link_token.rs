// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The link decision token.
//!
//! When a social sign-in hits an email that already belongs to a local user,
//! the pending "may I merge these?" decision has to survive a browser
//! redirect round-trip. It travels as a compact HS256-signed claim set:
//! target user, target social-account row, the user's currently-linked
//! providers (so the confirmation page can show them), and a short expiry.
//!
//! Nothing is stored server-side. Signature and expiry are the only validity
//! proof, which means a token can be presented more than once inside its
//! lifetime; the TTL (minutes, not hours) bounds that window. Every
//! validation failure collapses to [`AuthError::InvalidLinkToken`] so a
//! caller cannot learn which check rejected the token.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use splice_common_secret::SecretString;

use crate::error::AuthError;
use crate::types::{Provider, SocialAccountId, UserId};
use crate::user::User;

/// The claim set carried by a link decision token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTokenClaims {
	/// The user the identity would be linked to.
	pub user_id: UserId,
	/// The social-account row the decision is about.
	pub social_account_id: SocialAccountId,
	/// Providers the user already had linked when the token was minted.
	/// Display data for the confirmation step, nothing more.
	pub linked_providers: Vec<Provider>,
	/// Expiry, unix seconds.
	pub exp: i64,
}

/// Mints and validates link decision tokens.
///
/// Construct once from configuration and share; the signing key never leaves
/// the codec.
pub struct LinkTokenCodec {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	ttl: Duration,
}

impl LinkTokenCodec {
	/// Build a codec from the symmetric signing key and token lifetime.
	pub fn new(secret: &SecretString, ttl: Duration) -> Self {
		Self {
			encoding_key: EncodingKey::from_secret(secret.expose().as_bytes()),
			decoding_key: DecodingKey::from_secret(secret.expose().as_bytes()),
			ttl,
		}
	}

	/// Mint a token binding `user` to the social account awaiting linkage.
	pub fn mint(
		&self,
		user: &User,
		social_account_id: SocialAccountId,
	) -> Result<String, AuthError> {
		let claims = LinkTokenClaims {
			user_id: user.id,
			social_account_id,
			linked_providers: user.linked_providers(),
			exp: (Utc::now() + self.ttl).timestamp(),
		};

		jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
			.map_err(|e| AuthError::Internal(format!("failed to sign link token: {e}")))
	}

	/// Validate a token and return its claims.
	///
	/// Signature, shape, and expiry failures are indistinguishable to the
	/// caller. A token is valid strictly before its expiry instant; at the
	/// instant itself it is already rejected.
	pub fn decode(&self, token: &str) -> Result<LinkTokenClaims, AuthError> {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.leeway = 0;

		let data = jsonwebtoken::decode::<LinkTokenClaims>(token, &self.decoding_key, &validation)
			.map_err(|_| AuthError::InvalidLinkToken)?;

		// jsonwebtoken accepts exp == now; the window is open-ended only on
		// the left, so reject the boundary second too.
		if data.claims.exp <= Utc::now().timestamp() {
			return Err(AuthError::InvalidLinkToken);
		}

		Ok(data.claims)
	}
}

impl std::fmt::Debug for LinkTokenCodec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LinkTokenCodec").field("ttl", &self.ttl).finish()
	}
}
