// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Idempotent schema setup.
//!
//! Every statement is `IF NOT EXISTS`, so [`run_migrations`] is safe to run
//! on every startup. The same DDL backs the [`crate::testing`] helpers so
//! tests and production agree on the schema.

use sqlx::sqlite::SqlitePool;
use splice_server_auth::StoreError;

pub(crate) const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	email TEXT NOT NULL UNIQUE,
	password_hash TEXT,
	name TEXT NOT NULL,
	avatar TEXT,
	created_at TEXT NOT NULL,
	updated_at TEXT NOT NULL
)
"#;

pub(crate) const CREATE_SOCIAL_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS social_accounts (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
	provider TEXT NOT NULL,
	provider_user_id TEXT NOT NULL,
	email TEXT NOT NULL,
	name TEXT NOT NULL,
	avatar TEXT,
	created_at TEXT NOT NULL,
	updated_at TEXT NOT NULL,
	UNIQUE(provider, provider_user_id)
)
"#;

pub(crate) const CREATE_SOCIAL_ACCOUNTS_USER_INDEX: &str =
	"CREATE INDEX IF NOT EXISTS idx_social_accounts_user_id ON social_accounts(user_id)";

pub(crate) const CREATE_SESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
	token TEXT PRIMARY KEY,
	user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
	created_at TEXT NOT NULL,
	expires_at TEXT NOT NULL
)
"#;

pub(crate) const CREATE_SESSIONS_USER_INDEX: &str =
	"CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id)";

/// Create all tables and indexes the server needs.
///
/// # Errors
/// Returns `StoreError::Backend` if any DDL statement fails.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
	for statement in [
		CREATE_USERS_TABLE,
		CREATE_SOCIAL_ACCOUNTS_TABLE,
		CREATE_SOCIAL_ACCOUNTS_USER_INDEX,
		CREATE_SESSIONS_TABLE,
		CREATE_SESSIONS_USER_INDEX,
	] {
		sqlx::query(statement)
			.execute(pool)
			.await
			.map_err(crate::backend_error)?;
	}

	tracing::debug!("database migrations applied");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	#[tokio::test]
	async fn test_migrations_are_idempotent() {
		let pool = create_test_pool().await;

		run_migrations(&pool).await.unwrap();
		run_migrations(&pool).await.unwrap();

		sqlx::query("SELECT id FROM users").execute(&pool).await.unwrap();
		sqlx::query("SELECT id FROM social_accounts")
			.execute(&pool)
			.await
			.unwrap();
		sqlx::query("SELECT token FROM sessions")
			.execute(&pool)
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn test_social_accounts_enforce_identity_uniqueness() {
		let pool = create_test_pool().await;
		run_migrations(&pool).await.unwrap();

		let insert = r#"
			INSERT INTO social_accounts (user_id, provider, provider_user_id, email, name, avatar, created_at, updated_at)
			VALUES (NULL, 'google', 'g-123', 'a@example.com', 'Ada', NULL, '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')
		"#;

		sqlx::query(insert).execute(&pool).await.unwrap();
		let err = sqlx::query(insert).execute(&pool).await.unwrap_err();
		match err {
			sqlx::Error::Database(db_err) => assert!(db_err.is_unique_violation()),
			other => panic!("expected unique violation, got {other:?}"),
		}
	}
}
