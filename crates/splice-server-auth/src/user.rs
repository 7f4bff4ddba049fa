// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Account entity types.
//!
//! This module provides:
//! - [`User`] - a local account, reachable by password and/or linked providers
//! - [`SocialAccount`] - one (provider, provider-subject) identity, optionally
//!   owned by a user

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Provider, SocialAccountId, UserId};

/// A user account.
///
/// Accounts registered with a password carry a hash; accounts created from a
/// social sign-in have no hash and can only authenticate through a linked
/// provider until a password is set.
///
/// # PII Handling
///
/// `email`, `name`, and `avatar` are user PII and must not appear in logs;
/// log the numeric `id` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	/// Unique identifier, assigned by the store at creation.
	pub id: UserId,

	/// Email address, globally unique across all users.
	pub email: String,

	/// Argon2id hash of the password, absent for social-only accounts.
	/// Never serialized into API responses.
	#[serde(skip_serializing, default)]
	pub password_hash: Option<String>,

	/// Display name.
	pub name: String,

	/// URL of the user's avatar image.
	pub avatar: Option<String>,

	/// Social accounts currently owned by this user, ordered by id.
	pub social_accounts: Vec<SocialAccount>,

	/// When the account was created.
	pub created_at: DateTime<Utc>,

	/// When the account was last updated.
	pub updated_at: DateTime<Utc>,
}

impl User {
	/// Returns true if this account has a password set.
	pub fn has_password(&self) -> bool {
		self.password_hash.is_some()
	}

	/// The linked social account for `provider`, if any.
	pub fn social_account(&self, provider: Provider) -> Option<&SocialAccount> {
		self.social_accounts
			.iter()
			.find(|account| account.provider == provider)
	}

	/// Providers this user currently has linked, in link order.
	pub fn linked_providers(&self) -> Vec<Provider> {
		self.social_accounts
			.iter()
			.map(|account| account.provider)
			.collect()
	}
}

/// One third-party identity: a (provider, provider-subject-id) pair.
///
/// A row exists for every identity that has ever completed a code exchange,
/// whether or not a local user has claimed it. `user_id` is `None` for
/// unclaimed identities; linking sets it, unlinking clears it.
///
/// # PII Handling
///
/// `email`, `name`, and `avatar` are snapshots of provider PII, refreshed on
/// every sign-in with the provider's latest values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialAccount {
	/// Unique identifier, assigned by the store at creation.
	pub id: SocialAccountId,

	/// The owning user, if this identity has been claimed.
	pub user_id: Option<UserId>,

	/// The identity provider.
	pub provider: Provider,

	/// The provider's stable subject identifier for this identity.
	pub provider_user_id: String,

	/// Email address reported by the provider at last sign-in.
	pub email: String,

	/// Display name reported by the provider at last sign-in.
	pub name: String,

	/// Avatar URL reported by the provider at last sign-in.
	pub avatar: Option<String>,

	/// When this identity first completed a code exchange.
	pub created_at: DateTime<Utc>,

	/// When the provider snapshot was last refreshed.
	pub updated_at: DateTime<Utc>,
}

impl SocialAccount {
	/// Returns true if this identity is owned by `user_id`.
	pub fn is_owned_by(&self, user_id: UserId) -> bool {
		self.user_id == Some(user_id)
	}

	/// Returns true if no user has claimed this identity.
	pub fn is_unowned(&self) -> bool {
		self.user_id.is_none()
	}
}
