// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server-side login sessions.
//!
//! Sessions are opaque random tokens handed to browsers in an HttpOnly
//! cookie. Storing them server-side keeps logout immediate: deleting the
//! row revokes the session.

use chrono::{DateTime, Utc};
use splice_server_auth::{StoreError, UserId};
use sqlx::{sqlite::SqlitePool, Row};

use crate::{backend_error, parse_timestamp};

/// A stored login session.
#[derive(Debug, Clone)]
pub struct Session {
	pub token: String,
	pub user_id: UserId,
	pub created_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

/// Repository for session database operations.
#[derive(Clone)]
pub struct SessionRepository {
	pool: SqlitePool,
}

impl SessionRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Persist a session token for a user.
	///
	/// The token is generated by the caller; this layer only stores it.
	#[tracing::instrument(skip(self, token), fields(user_id = %user_id))]
	pub async fn create_session(
		&self,
		token: &str,
		user_id: UserId,
		expires_at: DateTime<Utc>,
	) -> Result<Session, StoreError> {
		let now = Utc::now();
		sqlx::query(
			r#"
			INSERT INTO sessions (token, user_id, created_at, expires_at)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(token)
		.bind(user_id.as_i64())
		.bind(now.to_rfc3339())
		.bind(expires_at.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(backend_error)?;

		tracing::debug!(user_id = %user_id, "session created");
		Ok(Session {
			token: token.to_string(),
			user_id,
			created_at: now,
			expires_at,
		})
	}

	/// Resolve a session token to its user.
	///
	/// # Returns
	/// `None` for unknown and for expired tokens alike.
	#[tracing::instrument(skip(self, token))]
	pub async fn get_user_id(&self, token: &str) -> Result<Option<UserId>, StoreError> {
		let row = sqlx::query(
			r#"
			SELECT user_id, expires_at
			FROM sessions
			WHERE token = ?
			"#,
		)
		.bind(token)
		.fetch_optional(&self.pool)
		.await
		.map_err(backend_error)?;

		let Some(row) = row else {
			return Ok(None);
		};

		let expires_at: String = row.get("expires_at");
		let expires_at = parse_timestamp(&expires_at, "expires_at")?;
		if expires_at <= Utc::now() {
			return Ok(None);
		}

		let user_id: i64 = row.get("user_id");
		Ok(Some(UserId::new(user_id)))
	}

	/// Delete a session, revoking it.
	///
	/// # Returns
	/// `false` if no session had this token.
	#[tracing::instrument(skip(self, token))]
	pub async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
		let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
			.bind(token)
			.execute(&self.pool)
			.await
			.map_err(backend_error)?;

		Ok(result.rows_affected() > 0)
	}

	/// Delete all expired sessions.
	///
	/// RFC 3339 UTC strings compare chronologically, so the filter runs in
	/// SQL.
	///
	/// # Returns
	/// The number of sessions removed.
	#[tracing::instrument(skip(self))]
	pub async fn delete_expired(&self) -> Result<u64, StoreError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
			.bind(&now)
			.execute(&self.pool)
			.await
			.map_err(backend_error)?;

		let removed = result.rows_affected();
		if removed > 0 {
			tracing::debug!(removed, "expired sessions deleted");
		}
		Ok(removed)
	}
}
