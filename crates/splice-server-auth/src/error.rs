// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The authentication error taxonomy.
//!
//! Every operation in this crate fails with an [`AuthError`]. Kinds are never
//! downgraded on the way up: a duplicate email stays [`AuthError::DuplicateEmail`]
//! through every layer, and only the transport layer may collapse kinds it does
//! not recognize into a generic internal response (after logging the original).

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::store::StoreError;
use crate::types::InvalidProviderError;

/// Errors produced by authentication and account-linking operations.
#[derive(Debug, Error)]
pub enum AuthError {
	/// The provider name is unknown, or known but not configured.
	#[error(transparent)]
	InvalidProvider(#[from] InvalidProviderError),

	/// The identity provider could not produce a verified identity: the code
	/// exchange was rejected, the network call failed, or the response did
	/// not parse.
	#[error("failed to fetch identity from provider: {0}")]
	SocialProviderFetchFailed(#[from] GatewayError),

	/// A user with this email already exists.
	#[error("an account with this email already exists")]
	DuplicateEmail,

	/// No user with the given identifier.
	#[error("user not found")]
	UserNotFound,

	/// Login failed. Covers unknown email, wrong password, and accounts that
	/// have no password set, so a failed login never reveals which.
	#[error("invalid email or password")]
	InvalidCredentials,

	/// The link decision token failed validation. Signature, expiry, and
	/// shape failures all collapse here so callers cannot probe which check
	/// rejected the token.
	#[error("invalid or expired link token")]
	InvalidLinkToken,

	/// The token's target no longer matches the identity's current state:
	/// the identity changed or its owner was reassigned after the token was
	/// minted.
	#[error("link token does not match the social account's current state")]
	MismatchedLinkedUser,

	/// The social account is already owned by a different user.
	#[error("social account is already linked to another user")]
	SocialAccountAlreadyLinked,

	/// No linked social account exists for this user and provider.
	#[error("no linked social account for this provider")]
	SocialAccountAlreadyUnlinked,

	/// An unclassified storage failure.
	#[error("store error: {0}")]
	Store(StoreError),

	/// An internal invariant failed (signing failure, row vanished
	/// mid-operation). Surfaces as a generic 500 at the transport layer.
	#[error("internal error: {0}")]
	Internal(String),
}

impl From<StoreError> for AuthError {
	fn from(err: StoreError) -> Self {
		match err {
			// The one store kind with an exact counterpart in the taxonomy.
			// NotFound stays wrapped; call sites that know what was being
			// looked up map it themselves.
			StoreError::DuplicateEmail => AuthError::DuplicateEmail,
			other => AuthError::Store(other),
		}
	}
}
