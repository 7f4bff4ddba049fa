// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.
//!
//! Each section pairs a fully resolved `*Config` struct with a partial
//! `*ConfigLayer` that supports field-wise merging across sources.

pub mod auth;
pub mod database;
pub mod http;
pub mod logging;
pub mod oauth;

pub use auth::{AuthConfig, AuthConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use oauth::{OAuthConfig, OAuthConfigLayer, OAuthProviderConfig, OAuthProviderConfigLayer};
