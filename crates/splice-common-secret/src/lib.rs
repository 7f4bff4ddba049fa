// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret wrapper type that keeps sensitive values out of logs and debug output.
//!
//! This crate provides:
//! - [`Secret<T>`] - a generic wrapper that redacts its contents in `Debug`/`Display`
//!   and zeroizes the inner value on drop
//! - [`SecretString`] - the common `Secret<String>` alias used for tokens, client
//!   secrets, and signing keys
//! - [`deserialize_secret_string`] - a serde helper for deserializing directly into
//!   a [`SecretString`] without an intermediate owned `String` outliving the parse
//!
//! # Usage
//!
//! ```
//! use splice_common_secret::SecretString;
//!
//! let token = SecretString::new("super-sensitive".to_string());
//! assert_eq!(format!("{token:?}"), "[REDACTED]");
//! assert_eq!(token.expose(), "super-sensitive");
//! ```
//!
//! The only way at the inner value is [`Secret::expose`]; call it at the last
//! possible moment (the form-encode or header-build site) and let the wrapper
//! own the value everywhere else.

use zeroize::Zeroize;

/// The placeholder printed in place of any secret value.
pub const REDACTED: &str = "[REDACTED]";

/// A wrapper that hides its contents from `Debug` and `Display` output and
/// zeroizes the inner value when dropped.
///
/// Equality compares the inner values so tests can assert against expected
/// secrets; the comparison is not constant-time and must not be used to check
/// untrusted input against a stored credential.
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
	/// Wrap a sensitive value.
	pub fn new(value: T) -> Self {
		Self(value)
	}

	/// Borrow the inner value.
	pub fn expose(&self) -> &T {
		&self.0
	}
}

impl<T: Zeroize> Drop for Secret<T> {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<T: Zeroize> std::fmt::Debug for Secret<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T: Zeroize> std::fmt::Display for Secret<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T: Zeroize + PartialEq> PartialEq for Secret<T> {
	fn eq(&self, other: &Self) -> bool {
		self.0 == other.0
	}
}

impl<T: Zeroize + Eq> Eq for Secret<T> {}

/// A redacting wrapper around a `String`.
pub type SecretString = Secret<String>;

impl SecretString {
	/// Borrow the inner value as a `&str`.
	pub fn expose_str(&self) -> &str {
		&self.0
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value.to_string())
	}
}

/// Deserialize a string field directly into a [`SecretString`].
///
/// Use with `#[serde(deserialize_with = "splice_common_secret::deserialize_secret_string")]`
/// on token fields of wire-format structs so the raw value never lands in a
/// plain `String` field that derives `Debug`.
#[cfg(feature = "serde")]
pub fn deserialize_secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
	D: serde::Deserializer<'de>,
{
	use serde::Deserialize;
	let value = String::deserialize(deserializer)?;
	Ok(SecretString::new(value))
}
