// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Account repository for database operations.
//!
//! This module provides database access for account management including:
//! - User CRUD and email lookup
//! - Social account upsert keyed by (provider, provider_user_id)
//! - Ownership transitions (claim, release) used by the linking flows
//! - The atomic create-user-and-claim-identity step for first-time social
//!   sign-ins

use async_trait::async_trait;
use chrono::Utc;
use splice_server_auth::{
	AccountStore, NewUser, Provider, SocialAccount, SocialAccountId, StoreError, UserId,
	VerifiedIdentity,
};
use sqlx::{sqlite::SqlitePool, Row};

use crate::{backend_error, parse_timestamp};

/// Repository for user and social-account database operations.
///
/// Implements the `AccountStore` contract. IDs are SQLite rowids; the
/// `(provider, provider_user_id)` pair is enforced unique by the schema, so
/// concurrent upserts of the same identity converge on one row.
#[derive(Clone)]
pub struct AccountRepository {
	pool: SqlitePool,
}

impl AccountRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	// =========================================================================
	// Users
	// =========================================================================

	/// Create a user.
	///
	/// # Errors
	/// Returns `StoreError::DuplicateEmail` if the email is already taken.
	#[tracing::instrument(skip(self, new_user), fields(email = %new_user.email))]
	pub async fn create_user(&self, new_user: NewUser) -> Result<splice_server_auth::User, StoreError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			INSERT INTO users (email, password_hash, name, avatar, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&new_user.email)
		.bind(&new_user.password_hash)
		.bind(&new_user.name)
		.bind(&new_user.avatar)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await
		.map_err(|e| match e {
			sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
				StoreError::DuplicateEmail
			}
			_ => backend_error(e),
		})?;

		let id = UserId::new(result.last_insert_rowid());
		tracing::debug!(user_id = %id, "user created");
		self.get_user(id).await
	}

	/// Get a user by ID, with their linked social accounts.
	///
	/// # Errors
	/// Returns `StoreError::NotFound` if no user exists with this ID.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user(&self, id: UserId) -> Result<splice_server_auth::User, StoreError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, password_hash, name, avatar, created_at, updated_at
			FROM users
			WHERE id = ?
			"#,
		)
		.bind(id.as_i64())
		.fetch_optional(&self.pool)
		.await
		.map_err(backend_error)?;

		let Some(row) = row else {
			return Err(StoreError::NotFound(format!("user {id}")));
		};

		let mut user = row_to_user(&row)?;
		user.social_accounts = self.social_accounts_for_user(user.id).await?;
		Ok(user)
	}

	/// Get a user by email, with their linked social accounts.
	///
	/// # Returns
	/// `None` if no user has this email.
	#[tracing::instrument(skip(self, email))]
	pub async fn get_user_by_email(
		&self,
		email: &str,
	) -> Result<Option<splice_server_auth::User>, StoreError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, password_hash, name, avatar, created_at, updated_at
			FROM users
			WHERE email = ?
			"#,
		)
		.bind(email)
		.fetch_optional(&self.pool)
		.await
		.map_err(backend_error)?;

		let Some(row) = row else {
			return Ok(None);
		};

		let mut user = row_to_user(&row)?;
		user.social_accounts = self.social_accounts_for_user(user.id).await?;
		Ok(Some(user))
	}

	/// Update a user's avatar and return the refreshed user.
	///
	/// Not part of the `AccountStore` contract; only the profile routes use
	/// it.
	///
	/// # Errors
	/// Returns `StoreError::NotFound` if no user exists with this ID.
	#[tracing::instrument(skip(self, avatar), fields(user_id = %id))]
	pub async fn update_user_avatar(
		&self,
		id: UserId,
		avatar: &str,
	) -> Result<splice_server_auth::User, StoreError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			UPDATE users
			SET avatar = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(avatar)
		.bind(&now)
		.bind(id.as_i64())
		.execute(&self.pool)
		.await
		.map_err(backend_error)?;

		if result.rows_affected() == 0 {
			return Err(StoreError::NotFound(format!("user {id}")));
		}

		tracing::debug!(user_id = %id, "user avatar updated");
		self.get_user(id).await
	}

	// =========================================================================
	// Social accounts
	// =========================================================================

	/// Insert or refresh the identity row for `(provider, provider_user_id)`.
	///
	/// On conflict the provider snapshot (email, name, avatar) is refreshed
	/// in place; ownership and `created_at` are left untouched. Either way
	/// the resulting row is returned.
	#[tracing::instrument(skip(self, identity), fields(provider = %provider))]
	pub async fn upsert_social_account(
		&self,
		provider: Provider,
		identity: &VerifiedIdentity,
	) -> Result<SocialAccount, StoreError> {
		let now = Utc::now().to_rfc3339();
		let row = sqlx::query(
			r#"
			INSERT INTO social_accounts (user_id, provider, provider_user_id, email, name, avatar, created_at, updated_at)
			VALUES (NULL, ?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT(provider, provider_user_id) DO UPDATE SET
				email = excluded.email,
				name = excluded.name,
				avatar = excluded.avatar,
				updated_at = excluded.updated_at
			RETURNING id, user_id, provider, provider_user_id, email, name, avatar, created_at, updated_at
			"#,
		)
		.bind(provider.as_str())
		.bind(&identity.provider_user_id)
		.bind(&identity.email)
		.bind(&identity.name)
		.bind(&identity.avatar)
		.bind(&now)
		.bind(&now)
		.fetch_one(&self.pool)
		.await
		.map_err(backend_error)?;

		row_to_social_account(&row)
	}

	/// Get the identity row for `(provider, provider_user_id)`.
	///
	/// # Returns
	/// `None` if the identity has never been seen.
	#[tracing::instrument(skip(self, provider_user_id), fields(provider = %provider))]
	pub async fn get_social_account(
		&self,
		provider: Provider,
		provider_user_id: &str,
	) -> Result<Option<SocialAccount>, StoreError> {
		let row = sqlx::query(
			r#"
			SELECT id, user_id, provider, provider_user_id, email, name, avatar, created_at, updated_at
			FROM social_accounts
			WHERE provider = ? AND provider_user_id = ?
			"#,
		)
		.bind(provider.as_str())
		.bind(provider_user_id)
		.fetch_optional(&self.pool)
		.await
		.map_err(backend_error)?;

		row.map(|r| row_to_social_account(&r)).transpose()
	}

	/// Point the identity row at `user_id`.
	///
	/// # Returns
	/// `false` if no row has this ID. Setting the same owner again still
	/// reports `true`; SQLite counts rows matched by the UPDATE.
	#[tracing::instrument(skip(self), fields(social_account_id = %id, user_id = %user_id))]
	pub async fn set_social_account_owner(
		&self,
		id: SocialAccountId,
		user_id: UserId,
	) -> Result<bool, StoreError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			UPDATE social_accounts
			SET user_id = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(user_id.as_i64())
		.bind(&now)
		.bind(id.as_i64())
		.execute(&self.pool)
		.await
		.map_err(backend_error)?;

		Ok(result.rows_affected() > 0)
	}

	/// Create a user and claim an existing identity row for them, in one
	/// transaction.
	///
	/// If the email is taken or the identity row is gone, nothing is
	/// written.
	///
	/// # Errors
	/// - `StoreError::DuplicateEmail` if the email is already taken.
	/// - `StoreError::NotFound` if the identity row does not exist.
	#[tracing::instrument(skip(self, new_user), fields(email = %new_user.email, social_account_id = %social_account_id))]
	pub async fn create_user_and_own_identity(
		&self,
		new_user: NewUser,
		social_account_id: SocialAccountId,
	) -> Result<splice_server_auth::User, StoreError> {
		let mut tx = self.pool.begin().await.map_err(backend_error)?;
		let now = Utc::now().to_rfc3339();

		let result = sqlx::query(
			r#"
			INSERT INTO users (email, password_hash, name, avatar, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&new_user.email)
		.bind(&new_user.password_hash)
		.bind(&new_user.name)
		.bind(&new_user.avatar)
		.bind(&now)
		.bind(&now)
		.execute(&mut *tx)
		.await
		.map_err(|e| match e {
			sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
				StoreError::DuplicateEmail
			}
			_ => backend_error(e),
		})?;

		let user_id = result.last_insert_rowid();

		let claimed = sqlx::query(
			r#"
			UPDATE social_accounts
			SET user_id = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(user_id)
		.bind(&now)
		.bind(social_account_id.as_i64())
		.execute(&mut *tx)
		.await
		.map_err(backend_error)?;

		// Dropping the transaction without committing rolls the insert back.
		if claimed.rows_affected() != 1 {
			return Err(StoreError::NotFound(format!(
				"social account {social_account_id}"
			)));
		}

		tx.commit().await.map_err(backend_error)?;

		tracing::debug!(user_id, "user created and identity claimed");
		self.get_user(UserId::new(user_id)).await
	}

	/// Release this user's identity for `provider`.
	///
	/// # Returns
	/// `false` if the user has no identity for this provider.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, provider = %provider))]
	pub async fn clear_social_account_owner(
		&self,
		user_id: UserId,
		provider: Provider,
	) -> Result<bool, StoreError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			UPDATE social_accounts
			SET user_id = NULL, updated_at = ?
			WHERE user_id = ? AND provider = ?
			"#,
		)
		.bind(&now)
		.bind(user_id.as_i64())
		.bind(provider.as_str())
		.execute(&self.pool)
		.await
		.map_err(backend_error)?;

		Ok(result.rows_affected() > 0)
	}

	// =========================================================================
	// Helpers
	// =========================================================================

	async fn social_accounts_for_user(
		&self,
		user_id: UserId,
	) -> Result<Vec<SocialAccount>, StoreError> {
		let rows = sqlx::query(
			r#"
			SELECT id, user_id, provider, provider_user_id, email, name, avatar, created_at, updated_at
			FROM social_accounts
			WHERE user_id = ?
			ORDER BY id ASC
			"#,
		)
		.bind(user_id.as_i64())
		.fetch_all(&self.pool)
		.await
		.map_err(backend_error)?;

		rows.iter().map(row_to_social_account).collect()
	}
}

#[async_trait]
impl AccountStore for AccountRepository {
	async fn create_user(&self, new_user: NewUser) -> Result<splice_server_auth::User, StoreError> {
		self.create_user(new_user).await
	}

	async fn get_user(&self, id: UserId) -> Result<splice_server_auth::User, StoreError> {
		self.get_user(id).await
	}

	async fn get_user_by_email(
		&self,
		email: &str,
	) -> Result<Option<splice_server_auth::User>, StoreError> {
		self.get_user_by_email(email).await
	}

	async fn upsert_social_account(
		&self,
		provider: Provider,
		identity: &VerifiedIdentity,
	) -> Result<SocialAccount, StoreError> {
		self.upsert_social_account(provider, identity).await
	}

	async fn get_social_account(
		&self,
		provider: Provider,
		provider_user_id: &str,
	) -> Result<Option<SocialAccount>, StoreError> {
		self.get_social_account(provider, provider_user_id).await
	}

	async fn set_social_account_owner(
		&self,
		id: SocialAccountId,
		user_id: UserId,
	) -> Result<bool, StoreError> {
		self.set_social_account_owner(id, user_id).await
	}

	async fn create_user_and_own_identity(
		&self,
		new_user: NewUser,
		social_account_id: SocialAccountId,
	) -> Result<splice_server_auth::User, StoreError> {
		self.create_user_and_own_identity(new_user, social_account_id)
			.await
	}

	async fn clear_social_account_owner(
		&self,
		user_id: UserId,
		provider: Provider,
	) -> Result<bool, StoreError> {
		self.clear_social_account_owner(user_id, provider).await
	}
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<splice_server_auth::User, StoreError> {
	let id: i64 = row.get("id");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(splice_server_auth::User {
		id: UserId::new(id),
		email: row.get("email"),
		password_hash: row.get("password_hash"),
		name: row.get("name"),
		avatar: row.get("avatar"),
		social_accounts: Vec::new(),
		created_at: parse_timestamp(&created_at, "created_at")?,
		updated_at: parse_timestamp(&updated_at, "updated_at")?,
	})
}

fn row_to_social_account(row: &sqlx::sqlite::SqliteRow) -> Result<SocialAccount, StoreError> {
	let id: i64 = row.get("id");
	let user_id: Option<i64> = row.get("user_id");
	let provider_str: String = row.get("provider");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	let provider: Provider = provider_str
		.parse()
		.map_err(|e| StoreError::Backend(format!("invalid provider in row: {e}")))?;

	Ok(SocialAccount {
		id: SocialAccountId::new(id),
		user_id: user_id.map(UserId::new),
		provider,
		provider_user_id: row.get("provider_user_id"),
		email: row.get("email"),
		name: row.get("name"),
		avatar: row.get("avatar"),
		created_at: parse_timestamp(&created_at, "created_at")?,
		updated_at: parse_timestamp(&updated_at, "updated_at")?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_account_test_pool;

	async fn make_repo() -> AccountRepository {
		AccountRepository::new(create_account_test_pool().await)
	}

	fn make_new_user(email: &str) -> NewUser {
		NewUser {
			email: email.to_string(),
			password_hash: Some("$argon2id$test-hash".to_string()),
			name: "Test User".to_string(),
			avatar: None,
		}
	}

	fn make_identity(subject: &str, email: &str) -> VerifiedIdentity {
		VerifiedIdentity {
			provider_user_id: subject.to_string(),
			email: email.to_string(),
			name: "Ada".to_string(),
			avatar: Some("https://img.example.com/a.png".to_string()),
		}
	}

	#[tokio::test]
	async fn test_create_and_get_user() {
		let repo = make_repo().await;

		let created = repo.create_user(make_new_user("a@example.com")).await.unwrap();
		assert_eq!(created.email, "a@example.com");
		assert_eq!(created.name, "Test User");
		assert!(created.password_hash.is_some());
		assert!(created.social_accounts.is_empty());

		let fetched = repo.get_user(created.id).await.unwrap();
		assert_eq!(fetched.id, created.id);
		assert_eq!(fetched.email, "a@example.com");
	}

	#[tokio::test]
	async fn test_create_user_duplicate_email_conflicts() {
		let repo = make_repo().await;
		repo.create_user(make_new_user("a@example.com")).await.unwrap();

		let err = repo
			.create_user(make_new_user("a@example.com"))
			.await
			.unwrap_err();
		assert!(matches!(err, StoreError::DuplicateEmail));
	}

	#[tokio::test]
	async fn test_get_user_not_found() {
		let repo = make_repo().await;
		let err = repo.get_user(UserId::new(999)).await.unwrap_err();
		assert!(matches!(err, StoreError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_get_user_by_email() {
		let repo = make_repo().await;
		repo.create_user(make_new_user("a@example.com")).await.unwrap();

		let found = repo.get_user_by_email("a@example.com").await.unwrap();
		assert!(found.is_some());

		let missing = repo.get_user_by_email("b@example.com").await.unwrap();
		assert!(missing.is_none());
	}

	#[tokio::test]
	async fn test_upsert_creates_then_refreshes_in_place() {
		let repo = make_repo().await;

		let first = repo
			.upsert_social_account(Provider::Google, &make_identity("g-1", "a@example.com"))
			.await
			.unwrap();
		assert!(first.user_id.is_none());
		assert_eq!(first.email, "a@example.com");

		let refreshed = VerifiedIdentity {
			provider_user_id: "g-1".to_string(),
			email: "renamed@example.com".to_string(),
			name: "Ada Lovelace".to_string(),
			avatar: None,
		};
		let second = repo
			.upsert_social_account(Provider::Google, &refreshed)
			.await
			.unwrap();

		// Same row, refreshed snapshot.
		assert_eq!(second.id, first.id);
		assert_eq!(second.email, "renamed@example.com");
		assert_eq!(second.name, "Ada Lovelace");
		assert!(second.avatar.is_none());
		assert_eq!(second.created_at, first.created_at);
	}

	#[tokio::test]
	async fn test_upsert_preserves_ownership() {
		let repo = make_repo().await;
		let user = repo.create_user(make_new_user("a@example.com")).await.unwrap();

		let account = repo
			.upsert_social_account(Provider::Google, &make_identity("g-1", "a@example.com"))
			.await
			.unwrap();
		assert!(repo
			.set_social_account_owner(account.id, user.id)
			.await
			.unwrap());

		let again = repo
			.upsert_social_account(Provider::Google, &make_identity("g-1", "a@example.com"))
			.await
			.unwrap();
		assert_eq!(again.user_id, Some(user.id));
	}

	#[tokio::test]
	async fn test_same_subject_different_providers_are_distinct_rows() {
		let repo = make_repo().await;

		let google = repo
			.upsert_social_account(Provider::Google, &make_identity("shared-id", "a@example.com"))
			.await
			.unwrap();
		let facebook = repo
			.upsert_social_account(Provider::Facebook, &make_identity("shared-id", "a@example.com"))
			.await
			.unwrap();

		assert_ne!(google.id, facebook.id);
	}

	#[tokio::test]
	async fn test_set_owner_reports_whether_row_exists() {
		let repo = make_repo().await;
		let user = repo.create_user(make_new_user("a@example.com")).await.unwrap();
		let account = repo
			.upsert_social_account(Provider::Google, &make_identity("g-1", "a@example.com"))
			.await
			.unwrap();

		assert!(repo
			.set_social_account_owner(account.id, user.id)
			.await
			.unwrap());
		assert!(!repo
			.set_social_account_owner(SocialAccountId::new(999), user.id)
			.await
			.unwrap());
	}

	#[tokio::test]
	async fn test_set_owner_to_the_same_user_still_reports_updated() {
		let repo = make_repo().await;
		let user = repo.create_user(make_new_user("a@example.com")).await.unwrap();
		let account = repo
			.upsert_social_account(Provider::Google, &make_identity("g-1", "a@example.com"))
			.await
			.unwrap();

		assert!(repo
			.set_social_account_owner(account.id, user.id)
			.await
			.unwrap());
		// Identical value; the row is still matched.
		assert!(repo
			.set_social_account_owner(account.id, user.id)
			.await
			.unwrap());
	}

	#[tokio::test]
	async fn test_create_user_and_own_identity() {
		let repo = make_repo().await;
		let account = repo
			.upsert_social_account(Provider::Google, &make_identity("g-1", "a@example.com"))
			.await
			.unwrap();

		let user = repo
			.create_user_and_own_identity(
				NewUser {
					email: "a@example.com".to_string(),
					password_hash: None,
					name: "Ada".to_string(),
					avatar: None,
				},
				account.id,
			)
			.await
			.unwrap();

		assert!(user.password_hash.is_none());
		assert_eq!(user.social_accounts.len(), 1);
		assert_eq!(user.social_accounts[0].id, account.id);
		assert_eq!(user.social_accounts[0].user_id, Some(user.id));
	}

	#[tokio::test]
	async fn test_create_user_and_own_identity_duplicate_email_writes_nothing() {
		let repo = make_repo().await;
		repo.create_user(make_new_user("a@example.com")).await.unwrap();
		let account = repo
			.upsert_social_account(Provider::Google, &make_identity("g-1", "a@example.com"))
			.await
			.unwrap();

		let err = repo
			.create_user_and_own_identity(
				NewUser {
					email: "a@example.com".to_string(),
					password_hash: None,
					name: "Ada".to_string(),
					avatar: None,
				},
				account.id,
			)
			.await
			.unwrap_err();
		assert!(matches!(err, StoreError::DuplicateEmail));

		// The identity row was not claimed.
		let account = repo
			.get_social_account(Provider::Google, "g-1")
			.await
			.unwrap()
			.unwrap();
		assert!(account.user_id.is_none());
	}

	#[tokio::test]
	async fn test_create_user_and_own_identity_missing_account_writes_nothing() {
		let repo = make_repo().await;

		let err = repo
			.create_user_and_own_identity(
				NewUser {
					email: "a@example.com".to_string(),
					password_hash: None,
					name: "Ada".to_string(),
					avatar: None,
				},
				SocialAccountId::new(999),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, StoreError::NotFound(_)));

		// The user insert was rolled back.
		let user = repo.get_user_by_email("a@example.com").await.unwrap();
		assert!(user.is_none());
	}

	#[tokio::test]
	async fn test_clear_social_account_owner() {
		let repo = make_repo().await;
		let user = repo.create_user(make_new_user("a@example.com")).await.unwrap();
		let account = repo
			.upsert_social_account(Provider::Google, &make_identity("g-1", "a@example.com"))
			.await
			.unwrap();
		repo.set_social_account_owner(account.id, user.id)
			.await
			.unwrap();

		assert!(repo
			.clear_social_account_owner(user.id, Provider::Google)
			.await
			.unwrap());
		assert!(!repo
			.clear_social_account_owner(user.id, Provider::Google)
			.await
			.unwrap());

		// The identity row survives, unowned.
		let account = repo
			.get_social_account(Provider::Google, "g-1")
			.await
			.unwrap()
			.unwrap();
		assert!(account.user_id.is_none());
	}

	#[tokio::test]
	async fn test_get_user_loads_accounts_in_id_order() {
		let repo = make_repo().await;
		let user = repo.create_user(make_new_user("a@example.com")).await.unwrap();

		let google = repo
			.upsert_social_account(Provider::Google, &make_identity("g-1", "a@example.com"))
			.await
			.unwrap();
		let facebook = repo
			.upsert_social_account(Provider::Facebook, &make_identity("f-1", "a@example.com"))
			.await
			.unwrap();
		repo.set_social_account_owner(google.id, user.id).await.unwrap();
		repo.set_social_account_owner(facebook.id, user.id)
			.await
			.unwrap();

		let user = repo.get_user(user.id).await.unwrap();
		assert_eq!(user.social_accounts.len(), 2);
		assert_eq!(user.social_accounts[0].id, google.id);
		assert_eq!(user.social_accounts[1].id, facebook.id);
	}

	#[tokio::test]
	async fn test_update_user_avatar() {
		let repo = make_repo().await;
		let user = repo.create_user(make_new_user("a@example.com")).await.unwrap();

		let updated = repo
			.update_user_avatar(user.id, "https://img.example.com/new.png")
			.await
			.unwrap();
		assert_eq!(
			updated.avatar.as_deref(),
			Some("https://img.example.com/new.png")
		);

		let err = repo
			.update_user_avatar(UserId::new(999), "https://img.example.com/x.png")
			.await
			.unwrap_err();
		assert!(matches!(err, StoreError::NotFound(_)));
	}
}
