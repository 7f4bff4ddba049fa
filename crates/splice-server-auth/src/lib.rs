// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Account domain and social-authentication orchestration for Splice.
//!
//! This crate holds the decision procedure at the center of the service: given
//! a verified third-party identity, decide whether to sign in an existing
//! user, create a fresh one, or demand an explicit link confirmation before
//! merging two account records. Everything else here exists in service of
//! that procedure:
//!
//! - [`types`] - id newtypes and the closed [`Provider`] set
//! - [`user`] - the [`User`] and [`SocialAccount`] entities
//! - [`gateway`] - the [`IdentityGateway`] trait the per-provider crates
//!   implement, plus the [`ProviderRegistry`] that selects one by name
//! - [`store`] - the [`AccountStore`] persistence contract
//! - [`link_token`] - the signed, short-lived link decision token
//! - [`service`] - the orchestrator, [`SocialAuthService`]
//! - [`password`] - Argon2id password hashing
//! - [`middleware`] - session/state cookie helpers shared with the HTTP layer
//! - [`error`] - the [`AuthError`] taxonomy

mod argon2_config;
pub mod error;
pub mod gateway;
pub mod link_token;
pub mod middleware;
pub mod password;
pub mod service;
pub mod store;
pub mod types;
pub mod user;

pub use error::AuthError;
pub use gateway::{GatewayError, IdentityGateway, ProviderRegistry, VerifiedIdentity};
pub use link_token::{LinkTokenClaims, LinkTokenCodec};
pub use service::{AuthOutcome, SocialAuthService};
pub use store::{AccountStore, NewUser, StoreError};
pub use types::{Provider, SocialAccountId, UserId};
pub use user::{SocialAccount, User};
