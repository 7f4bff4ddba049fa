// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment-variable secret loading with `*_FILE` indirection.

use splice_common_secret::SecretString;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading a secret out of the environment.
#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("environment variable {name} is not valid unicode")]
	NotUnicode { name: String },

	#[error("failed to read secret file {path} for {name}: {source}")]
	FileRead {
		name: String,
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("both {name} and {name}_FILE are set; set exactly one")]
	BothSet { name: String },

	#[error(transparent)]
	Required(#[from] RequiredSecretError),
}

/// A required secret was absent from the environment.
#[derive(Debug, Error)]
#[error("required secret {name} is not set (set {name} or {name}_FILE)")]
pub struct RequiredSecretError {
	pub name: String,
}

/// Load an optional secret from `name`, or from the file named by
/// `{name}_FILE`.
///
/// The file variant exists for orchestrators that mount secrets as files;
/// a single trailing newline is stripped from file contents. Setting both
/// variables is a configuration error rather than a silent precedence rule.
pub fn load_secret_env(name: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let direct = read_env(name)?;
	let file_var = format!("{name}_FILE");
	let file_path = read_env(&file_var)?;

	match (direct, file_path) {
		(Some(_), Some(_)) => Err(SecretEnvError::BothSet {
			name: name.to_string(),
		}),
		(Some(value), None) => Ok(Some(SecretString::new(value))),
		(None, Some(path)) => {
			let path = PathBuf::from(path);
			let mut contents =
				std::fs::read_to_string(&path).map_err(|source| SecretEnvError::FileRead {
					name: name.to_string(),
					path: path.clone(),
					source,
				})?;
			if contents.ends_with('\n') {
				contents.pop();
				if contents.ends_with('\r') {
					contents.pop();
				}
			}
			Ok(Some(SecretString::new(contents)))
		}
		(None, None) => Ok(None),
	}
}

/// Load a secret from the environment, failing if it is absent.
pub fn load_required_secret_env(name: &str) -> Result<SecretString, SecretEnvError> {
	load_secret_env(name)?.ok_or_else(|| {
		SecretEnvError::Required(RequiredSecretError {
			name: name.to_string(),
		})
	})
}

fn read_env(name: &str) -> Result<Option<String>, SecretEnvError> {
	match std::env::var(name) {
		Ok(value) if value.is_empty() => Ok(None),
		Ok(value) => Ok(Some(value)),
		Err(std::env::VarError::NotPresent) => Ok(None),
		Err(std::env::VarError::NotUnicode(_)) => Err(SecretEnvError::NotUnicode {
			name: name.to_string(),
		}),
	}
}
