// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The identity-provider gateway seam.
//!
//! This module provides:
//! - [`VerifiedIdentity`] - what a completed code exchange proves
//! - [`GatewayError`] - rejection vs. transport vs. parse failures
//! - [`IdentityGateway`] - the capability trait each provider crate implements
//! - [`ProviderRegistry`] - name-keyed lookup of the configured gateways

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::types::Provider;

/// A third-party identity verified by exchanging an authorization code.
///
/// The `provider_user_id` is the provider's stable subject identifier; email
/// and profile fields are the provider's current values and are snapshotted
/// into the store on every sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
	/// The provider's stable subject identifier.
	pub provider_user_id: String,
	/// Email address the provider reports for this identity.
	pub email: String,
	/// Display name the provider reports.
	pub name: String,
	/// Avatar URL the provider reports, if any.
	pub avatar: Option<String>,
}

/// Failures while talking to an identity provider.
///
/// A rejected code exchange is deliberately distinct from a transport
/// failure: the former means the code is bad (expired, reused, wrong
/// redirect URI, bad client credentials) and retrying is pointless.
#[derive(Debug, Error)]
pub enum GatewayError {
	/// The provider refused the code exchange.
	#[error("provider rejected the code exchange: {0}")]
	Rejected(String),

	/// The request to the provider failed at the transport level.
	#[error("provider request failed: {0}")]
	Http(#[from] reqwest::Error),

	/// The provider answered with something that did not parse.
	#[error("failed to parse provider response: {0}")]
	Parse(String),
}

/// One identity provider's capabilities.
///
/// Implementations hold their own client credentials and endpoints; callers
/// select one through the [`ProviderRegistry`] and never branch on provider
/// names themselves.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
	/// Which provider this gateway speaks for.
	fn provider(&self) -> Provider;

	/// The URL to send the user's browser to, carrying the caller's CSRF
	/// `state` and the `redirect_uri` the provider will send the code to.
	fn authorization_url(&self, state: &str, redirect_uri: &str) -> String;

	/// Exchange an authorization code for a verified identity.
	///
	/// No internal retry: a failure surfaces immediately and the caller owns
	/// retry policy.
	async fn verified_identity(
		&self,
		code: &str,
		redirect_uri: &str,
	) -> Result<VerifiedIdentity, GatewayError>;
}

/// The configured identity gateways, keyed by provider.
///
/// Providers without credentials at startup are simply absent; looking one
/// up behaves exactly like an unknown provider name.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
	gateways: HashMap<Provider, Arc<dyn IdentityGateway>>,
}

impl ProviderRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a gateway under the provider it reports.
	pub fn register(&mut self, gateway: Arc<dyn IdentityGateway>) {
		self.gateways.insert(gateway.provider(), gateway);
	}

	/// Look up the gateway for `provider`, if one is configured.
	pub fn get(&self, provider: Provider) -> Option<&Arc<dyn IdentityGateway>> {
		self.gateways.get(&provider)
	}

	/// Providers that currently have a configured gateway.
	pub fn configured(&self) -> Vec<Provider> {
		let mut providers: Vec<Provider> = self.gateways.keys().copied().collect();
		providers.sort_by_key(|p| p.as_str());
		providers
	}

	/// Returns true if no gateway is configured.
	pub fn is_empty(&self) -> bool {
		self.gateways.is_empty()
	}
}

impl std::fmt::Debug for ProviderRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ProviderRegistry")
			.field("configured", &self.configured())
			.finish()
	}
}
