// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory pools and table helpers for tests.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::migrations;

/// An in-memory pool pinned to a single connection.
///
/// SQLite gives every `:memory:` connection its own database, so the pool
/// must never open a second one.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.create_if_missing(true);

	SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("failed to create test pool")
}

pub async fn create_users_table(pool: &SqlitePool) {
	sqlx::query(migrations::CREATE_USERS_TABLE)
		.execute(pool)
		.await
		.unwrap();
}

pub async fn create_social_accounts_table(pool: &SqlitePool) {
	sqlx::query(migrations::CREATE_SOCIAL_ACCOUNTS_TABLE)
		.execute(pool)
		.await
		.unwrap();
	sqlx::query(migrations::CREATE_SOCIAL_ACCOUNTS_USER_INDEX)
		.execute(pool)
		.await
		.unwrap();
}

pub async fn create_sessions_table(pool: &SqlitePool) {
	sqlx::query(migrations::CREATE_SESSIONS_TABLE)
		.execute(pool)
		.await
		.unwrap();
	sqlx::query(migrations::CREATE_SESSIONS_USER_INDEX)
		.execute(pool)
		.await
		.unwrap();
}

pub async fn create_account_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	create_users_table(&pool).await;
	create_social_accounts_table(&pool).await;
	pool
}

pub async fn create_session_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	create_users_table(&pool).await;
	create_sessions_table(&pool).await;
	pool
}
