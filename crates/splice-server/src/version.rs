// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Build information and version utilities for splice-server.

/// The crate version baked in at compile time.
pub fn version() -> &'static str {
	env!("CARGO_PKG_VERSION")
}

/// Format version info for display.
pub fn format_version_info() -> String {
	format!(
		"splice-server version: {}\n\
         Platform:              {}-{}",
		version(),
		std::env::consts::OS,
		std::env::consts::ARCH,
	)
}
