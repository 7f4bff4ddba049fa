// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The persistence contract the orchestrator runs against.
//!
//! All cross-request state lives behind [`AccountStore`]; the orchestrator
//! itself is stateless. The two operations with correctness-critical
//! atomicity requirements are [`AccountStore::upsert_social_account`]
//! (conflict-aware write on the (provider, subject) key) and
//! [`AccountStore::create_user_and_own_identity`] (user creation and identity
//! claim in one transaction, so a crash cannot strand a fresh user without
//! its identity).

use async_trait::async_trait;
use thiserror::Error;

use crate::gateway::VerifiedIdentity;
use crate::types::{Provider, SocialAccountId, UserId};
use crate::user::{SocialAccount, User};

/// Storage failures, classified only as far as the orchestrator needs.
#[derive(Debug, Error)]
pub enum StoreError {
	/// A unique-email constraint rejected a user creation.
	#[error("a user with this email already exists")]
	DuplicateEmail,

	/// The requested row does not exist.
	#[error("not found: {0}")]
	NotFound(String),

	/// Any other backend failure, with context.
	#[error("storage backend error: {0}")]
	Backend(String),
}

/// Parameters for creating a user.
///
/// `password_hash` is `None` for accounts created from a social sign-in;
/// those can only authenticate through a linked provider.
#[derive(Debug, Clone)]
pub struct NewUser {
	pub email: String,
	pub password_hash: Option<String>,
	pub name: String,
	pub avatar: Option<String>,
}

/// Persistence operations for users and social accounts.
///
/// Lookup absence is modelled per-operation: `get_user` takes an id the
/// caller already holds, so a miss is an error; `get_user_by_email` and
/// `get_social_account` answer "does this exist" questions, so a miss is
/// `Ok(None)`.
#[async_trait]
pub trait AccountStore: Send + Sync {
	/// Create a user. Fails with [`StoreError::DuplicateEmail`] if the email
	/// is taken; the constraint is enforced by the store, atomically.
	async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

	/// Fetch a user by id, including its linked social accounts in id order.
	async fn get_user(&self, id: UserId) -> Result<User, StoreError>;

	/// Fetch a user by email, or `None` if no user has it.
	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

	/// Insert the identity or, if (provider, subject) already exists, refresh
	/// its email/name/avatar snapshot. Atomic: concurrent calls for the same
	/// subject never produce two rows. Returns the stored row either way.
	async fn upsert_social_account(
		&self,
		provider: Provider,
		identity: &VerifiedIdentity,
	) -> Result<SocialAccount, StoreError>;

	/// Fetch a social account by (provider, subject), or `None`.
	async fn get_social_account(
		&self,
		provider: Provider,
		provider_user_id: &str,
	) -> Result<Option<SocialAccount>, StoreError>;

	/// Point the identity at `user_id`. Returns false if no row with that id
	/// exists, so callers can fail definitively instead of assuming success.
	async fn set_social_account_owner(
		&self,
		id: SocialAccountId,
		user_id: UserId,
	) -> Result<bool, StoreError>;

	/// Create a user and claim the identity for it in a single transaction.
	/// Fails with [`StoreError::DuplicateEmail`] if the email is taken and
	/// [`StoreError::NotFound`] if the identity row does not exist; in both
	/// cases nothing is written.
	async fn create_user_and_own_identity(
		&self,
		new_user: NewUser,
		social_account_id: SocialAccountId,
	) -> Result<User, StoreError>;

	/// Clear the ownership of this user's identity for `provider`. Returns
	/// false if the user has no linked identity for that provider.
	async fn clear_social_account_owner(
		&self,
		user_id: UserId,
		provider: Provider,
	) -> Result<bool, StoreError>;
}
