// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Password hashing and verification.
//!
//! Argon2id throughout; the cost parameters come from
//! [`crate::argon2_config::argon2_instance`]. Stored hashes are PHC strings,
//! so parameters can change without invalidating existing hashes.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use crate::argon2_config::argon2_instance;
use crate::error::AuthError;

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
	let salt = SaltString::generate(&mut OsRng);
	argon2_instance()
		.hash_password(password.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|_| AuthError::Internal("failed to hash password".to_string()))
}

/// Verify a password against a stored hash.
///
/// A wrong password is `Ok(false)`; an unparseable stored hash is an error,
/// because it means the stored data is corrupt, not that the caller guessed
/// wrong.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
	let parsed_hash = PasswordHash::new(hash)
		.map_err(|_| AuthError::Internal("invalid password hash format".to_string()))?;

	Ok(argon2_instance()
		.verify_password(password.as_bytes(), &parsed_hash)
		.is_ok())
}
