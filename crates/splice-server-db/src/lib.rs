// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for Splice.
//!
//! This crate provides:
//! - [`create_pool`]: WAL-mode connection pool construction
//! - [`run_migrations`]: idempotent schema setup
//! - [`AccountRepository`]: users and social accounts, implementing the
//!   `AccountStore` contract consumed by the auth service
//! - [`SessionRepository`]: server-side login sessions
//! - [`testing`]: in-memory pools and table helpers for tests
//!
//! All timestamps are stored as RFC 3339 UTC strings in TEXT columns.

pub mod account;
pub mod migrations;
pub mod pool;
pub mod session;
pub mod testing;

pub use account::AccountRepository;
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use session::{Session, SessionRepository};

use splice_server_auth::StoreError;

/// Map a low-level sqlx error into the store error contract.
///
/// Conflict-aware call sites (unique violations) match on the sqlx error
/// themselves before falling back to this.
pub(crate) fn backend_error(e: sqlx::Error) -> StoreError {
	StoreError::Backend(e.to_string())
}

/// Parse an RFC 3339 TEXT column back into a UTC timestamp.
pub(crate) fn parse_timestamp(
	value: &str,
	column: &str,
) -> Result<chrono::DateTime<chrono::Utc>, StoreError> {
	chrono::DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&chrono::Utc))
		.map_err(|e| StoreError::Backend(format!("invalid {column}: {e}")))
}
