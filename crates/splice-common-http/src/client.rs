// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Outbound HTTP client builders with a consistent user agent.

use std::time::Duration;

/// Default timeout applied by [`new_client`].
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The user agent sent on every outbound request.
///
/// Format: `splice/{version}/{os}`, e.g. `splice/0.1.0/linux`.
pub fn user_agent() -> String {
	format!(
		"splice/{}/{}",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS
	)
}

/// A `reqwest::ClientBuilder` preconfigured with the Splice user agent.
///
/// Use this when a caller needs to adjust settings (timeouts, redirect
/// policy) before building.
pub fn builder() -> reqwest::ClientBuilder {
	reqwest::Client::builder().user_agent(user_agent())
}

/// Build a client with the default timeout.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized. This only happens on
/// broken installs and is not recoverable at runtime.
pub fn new_client() -> reqwest::Client {
	new_client_with_timeout(DEFAULT_TIMEOUT)
}

/// Build a client with an explicit request timeout.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized. This only happens on
/// broken installs and is not recoverable at runtime.
pub fn new_client_with_timeout(timeout: Duration) -> reqwest::Client {
	builder()
		.timeout(timeout)
		.build()
		.expect("failed to build HTTP client")
}
