// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Common configuration primitives shared across the Splice workspace.
//!
//! Re-exports the secret wrapper types from `splice-common-secret` and adds
//! environment helpers for loading secrets:
//!
//! - [`load_secret_env`] - reads `NAME`, falling back to the file named by
//!   `NAME_FILE` (for mounted secrets), into a [`SecretString`]
//! - [`load_required_secret_env`] - same, but absence is an error
//!
//! Secrets never pass through the TOML/env config layers as plain strings;
//! config loading calls these helpers and hands the resulting
//! [`SecretString`] to section finalizers.

mod env;

pub use env::{load_required_secret_env, load_secret_env, RequiredSecretError, SecretEnvError};
pub use splice_common_secret::{Secret, SecretString, REDACTED};

#[cfg(feature = "serde")]
pub use splice_common_secret::deserialize_secret_string;
