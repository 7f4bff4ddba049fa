// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The social-authentication orchestrator.
//!
//! [`SocialAuthService`] owns the decision procedure at the heart of the
//! service. Given a verified third-party identity it decides between three
//! outcomes:
//!
//! 1. the identity already has an owner → sign that user in (fast path)
//! 2. nobody owns it and no local account has its email → create a user and
//!    claim the identity for it, atomically
//! 3. nobody owns it but a local account has the same email → do NOT merge;
//!    hand back a signed link decision token and make the caller confirm
//!
//! Email equality alone is never proof of ownership, so branch 3 exists even
//! though silently merging would be more convenient. The service holds no
//! mutable state of its own; every cross-request fact lives in the
//! [`AccountStore`], and the store's conflict-aware writes are what make
//! concurrent callbacks safe.

use std::sync::Arc;

use crate::error::AuthError;
use crate::gateway::{IdentityGateway, ProviderRegistry};
use crate::link_token::{LinkTokenClaims, LinkTokenCodec};
use crate::store::{AccountStore, NewUser, StoreError};
use crate::types::{InvalidProviderError, Provider, UserId};
use crate::user::User;

/// The result of a provider sign-in.
#[derive(Debug)]
pub enum AuthOutcome {
	/// The identity resolved to exactly one account; the caller should
	/// establish a session for this user.
	Authenticated(User),

	/// The identity's email belongs to an existing account that has not
	/// linked it. The caller must present the token to the link-confirmation
	/// step before any merge happens.
	LinkRequired {
		/// The account the identity would be linked to.
		user: User,
		/// Signed, short-lived link decision token.
		link_token: String,
	},
}

/// Orchestrates provider sign-in, link confirmation, and explicit
/// link/unlink for signed-in users.
///
/// Construct once at startup from the configured collaborators and share.
pub struct SocialAuthService {
	store: Arc<dyn AccountStore>,
	providers: ProviderRegistry,
	codec: LinkTokenCodec,
}

impl SocialAuthService {
	pub fn new(
		store: Arc<dyn AccountStore>,
		providers: ProviderRegistry,
		codec: LinkTokenCodec,
	) -> Self {
		Self {
			store,
			providers,
			codec,
		}
	}

	/// Providers that have a configured gateway.
	pub fn configured_providers(&self) -> Vec<Provider> {
		self.providers.configured()
	}

	/// The provider's authorization URL carrying the caller's CSRF `state`.
	pub fn authorization_url(
		&self,
		provider_name: &str,
		state: &str,
		redirect_uri: &str,
	) -> Result<String, AuthError> {
		let (_, gateway) = self.resolve(provider_name)?;
		Ok(gateway.authorization_url(state, redirect_uri))
	}

	/// Sign in with a provider authorization code.
	///
	/// The provider name is checked before anything touches the network, and
	/// the identity row is upserted before the ownership branch so the
	/// provider snapshot is fresh whichever way the decision goes.
	#[tracing::instrument(skip(self, code, redirect_uri), fields(provider = %provider_name))]
	pub async fn authenticate_via_provider(
		&self,
		provider_name: &str,
		code: &str,
		redirect_uri: &str,
	) -> Result<AuthOutcome, AuthError> {
		let (provider, gateway) = self.resolve(provider_name)?;
		let identity = gateway.verified_identity(code, redirect_uri).await?;

		let social = self.store.upsert_social_account(provider, &identity).await?;

		if let Some(owner_id) = social.user_id {
			// Fast path: the identity already belongs to someone.
			let user = self.load_user(owner_id).await?;
			tracing::debug!(user_id = %user.id, "social sign-in fast path");
			return Ok(AuthOutcome::Authenticated(user));
		}

		match self.store.get_user_by_email(&identity.email).await? {
			None => {
				let new_user = NewUser {
					email: identity.email.clone(),
					password_hash: None,
					name: identity.name.clone(),
					avatar: identity.avatar.clone(),
				};
				let user = self
					.store
					.create_user_and_own_identity(new_user, social.id)
					.await?;
				tracing::info!(user_id = %user.id, "created user from social identity");
				Ok(AuthOutcome::Authenticated(user))
			}
			Some(existing) => {
				// An account already has this email. That is not proof the
				// identity belongs to it, so require explicit confirmation.
				let link_token = self.codec.mint(&existing, social.id)?;
				tracing::info!(user_id = %existing.id, "link confirmation required");
				Ok(AuthOutcome::LinkRequired {
					user: existing,
					link_token,
				})
			}
		}
	}

	/// Finalize a pending link using a link decision token.
	///
	/// The token is validated before any provider call, and the code is
	/// re-exchanged rather than trusting anything cached at mint time, so a
	/// stale code can never bind a different identity than the one the
	/// token was scoped to.
	#[tracing::instrument(skip(self, link_token, code, redirect_uri), fields(provider = %provider_name))]
	pub async fn confirm_link(
		&self,
		link_token: &str,
		provider_name: &str,
		code: &str,
		redirect_uri: &str,
	) -> Result<User, AuthError> {
		let claims = self.codec.decode(link_token)?;

		let (provider, gateway) = self.resolve(provider_name)?;
		let identity = gateway.verified_identity(code, redirect_uri).await?;

		let social = self
			.store
			.get_social_account(provider, &identity.provider_user_id)
			.await?
			.ok_or(AuthError::MismatchedLinkedUser)?;

		// The code must resolve to the identity the token was minted for,
		// and that identity must not have been claimed by someone else in
		// the meantime.
		if social.id != claims.social_account_id {
			return Err(AuthError::MismatchedLinkedUser);
		}
		if let Some(owner_id) = social.user_id {
			if owner_id != claims.user_id {
				return Err(AuthError::MismatchedLinkedUser);
			}
		}

		let updated = self
			.store
			.set_social_account_owner(social.id, claims.user_id)
			.await?;
		if !updated {
			return Err(AuthError::Internal(
				"social account disappeared during link confirmation".to_string(),
			));
		}

		tracing::info!(user_id = %claims.user_id, "social account linked");
		self.load_user(claims.user_id).await
	}

	/// Check a link decision token without acting on it.
	///
	/// Lets callers reject a tampered or expired token before starting a
	/// second authorization round-trip that would be wasted on it.
	pub fn validate_link_token(&self, link_token: &str) -> Result<LinkTokenClaims, AuthError> {
		self.codec.decode(link_token)
	}

	/// Attach a provider identity to an already-authenticated user.
	///
	/// No token is involved: the session proves who the caller is. Attaching
	/// an identity the caller already owns is a no-op success.
	#[tracing::instrument(skip(self, code, redirect_uri), fields(provider = %provider_name, user_id = %user_id))]
	pub async fn link_social_account(
		&self,
		user_id: UserId,
		provider_name: &str,
		code: &str,
		redirect_uri: &str,
	) -> Result<(), AuthError> {
		let (provider, gateway) = self.resolve(provider_name)?;
		let identity = gateway.verified_identity(code, redirect_uri).await?;

		let social = self.store.upsert_social_account(provider, &identity).await?;

		match social.user_id {
			Some(owner_id) if owner_id != user_id => Err(AuthError::SocialAccountAlreadyLinked),
			Some(_) => Ok(()),
			None => {
				let updated = self
					.store
					.set_social_account_owner(social.id, user_id)
					.await?;
				if updated {
					tracing::info!(user_id = %user_id, "social account linked");
					Ok(())
				} else {
					Err(AuthError::Internal(
						"social account disappeared during linking".to_string(),
					))
				}
			}
		}
	}

	/// Detach this user's identity for `provider`.
	///
	/// Validates the name against the provider set, not the registry: a
	/// provider whose credentials were removed from configuration can still
	/// be unlinked.
	#[tracing::instrument(skip(self), fields(provider = %provider_name, user_id = %user_id))]
	pub async fn unlink_social_account(
		&self,
		user_id: UserId,
		provider_name: &str,
	) -> Result<(), AuthError> {
		let provider: Provider = provider_name.parse()?;

		let cleared = self
			.store
			.clear_social_account_owner(user_id, provider)
			.await?;
		if cleared {
			tracing::info!(user_id = %user_id, "social account unlinked");
			Ok(())
		} else {
			Err(AuthError::SocialAccountAlreadyUnlinked)
		}
	}

	/// Parse the provider name and find its gateway.
	///
	/// An unconfigured provider answers exactly like an unknown one.
	fn resolve(
		&self,
		provider_name: &str,
	) -> Result<(Provider, &Arc<dyn IdentityGateway>), AuthError> {
		let provider: Provider = provider_name.parse()?;
		let gateway = self
			.providers
			.get(provider)
			.ok_or_else(|| InvalidProviderError(provider_name.to_string()))?;
		Ok((provider, gateway))
	}

	/// Fetch a user the orchestrator expects to exist.
	async fn load_user(&self, id: UserId) -> Result<User, AuthError> {
		match self.store.get_user(id).await {
			Ok(user) => Ok(user),
			Err(StoreError::NotFound(_)) => Err(AuthError::UserNotFound),
			Err(e) => Err(e.into()),
		}
	}
}

impl std::fmt::Debug for SocialAuthService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SocialAuthService")
			.field("providers", &self.providers)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gateway::{GatewayError, VerifiedIdentity};
	use crate::types::SocialAccountId;
	use crate::user::SocialAccount;
	use async_trait::async_trait;
	use chrono::{Duration, Utc};
	use splice_common_secret::SecretString;
	use std::collections::HashMap;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;

	// ========================================================================
	// In-memory store double
	// ========================================================================

	#[derive(Default)]
	struct MockState {
		users: Vec<User>,
		accounts: Vec<SocialAccount>,
		next_user_id: i64,
		next_account_id: i64,
	}

	#[derive(Default)]
	struct MockStore {
		state: Mutex<MockState>,
	}

	impl MockStore {
		fn user_count(&self) -> usize {
			self.state.lock().unwrap().users.len()
		}

		fn account_count(&self) -> usize {
			self.state.lock().unwrap().accounts.len()
		}

		fn assemble(state: &MockState, user: &User) -> User {
			let mut user = user.clone();
			user.social_accounts = state
				.accounts
				.iter()
				.filter(|a| a.user_id == Some(user.id))
				.cloned()
				.collect();
			user.social_accounts.sort_by_key(|a| a.id);
			user
		}
	}

	#[async_trait]
	impl AccountStore for MockStore {
		async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
			let mut state = self.state.lock().unwrap();
			if state.users.iter().any(|u| u.email == new_user.email) {
				return Err(StoreError::DuplicateEmail);
			}
			state.next_user_id += 1;
			let user = User {
				id: UserId::new(state.next_user_id),
				email: new_user.email,
				password_hash: new_user.password_hash,
				name: new_user.name,
				avatar: new_user.avatar,
				social_accounts: Vec::new(),
				created_at: Utc::now(),
				updated_at: Utc::now(),
			};
			state.users.push(user.clone());
			Ok(user)
		}

		async fn get_user(&self, id: UserId) -> Result<User, StoreError> {
			let state = self.state.lock().unwrap();
			state
				.users
				.iter()
				.find(|u| u.id == id)
				.map(|u| MockStore::assemble(&state, u))
				.ok_or_else(|| StoreError::NotFound(format!("user {id}")))
		}

		async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
			let state = self.state.lock().unwrap();
			Ok(state
				.users
				.iter()
				.find(|u| u.email == email)
				.map(|u| MockStore::assemble(&state, u)))
		}

		async fn upsert_social_account(
			&self,
			provider: Provider,
			identity: &VerifiedIdentity,
		) -> Result<SocialAccount, StoreError> {
			let mut state = self.state.lock().unwrap();
			if let Some(account) = state.accounts.iter_mut().find(|a| {
				a.provider == provider && a.provider_user_id == identity.provider_user_id
			}) {
				account.email = identity.email.clone();
				account.name = identity.name.clone();
				account.avatar = identity.avatar.clone();
				account.updated_at = Utc::now();
				return Ok(account.clone());
			}
			state.next_account_id += 1;
			let account = SocialAccount {
				id: SocialAccountId::new(state.next_account_id),
				user_id: None,
				provider,
				provider_user_id: identity.provider_user_id.clone(),
				email: identity.email.clone(),
				name: identity.name.clone(),
				avatar: identity.avatar.clone(),
				created_at: Utc::now(),
				updated_at: Utc::now(),
			};
			state.accounts.push(account.clone());
			Ok(account)
		}

		async fn get_social_account(
			&self,
			provider: Provider,
			provider_user_id: &str,
		) -> Result<Option<SocialAccount>, StoreError> {
			let state = self.state.lock().unwrap();
			Ok(state
				.accounts
				.iter()
				.find(|a| a.provider == provider && a.provider_user_id == provider_user_id)
				.cloned())
		}

		async fn set_social_account_owner(
			&self,
			id: SocialAccountId,
			user_id: UserId,
		) -> Result<bool, StoreError> {
			let mut state = self.state.lock().unwrap();
			match state.accounts.iter_mut().find(|a| a.id == id) {
				Some(account) => {
					account.user_id = Some(user_id);
					account.updated_at = Utc::now();
					Ok(true)
				}
				None => Ok(false),
			}
		}

		async fn create_user_and_own_identity(
			&self,
			new_user: NewUser,
			social_account_id: SocialAccountId,
		) -> Result<User, StoreError> {
			let mut state = self.state.lock().unwrap();
			if state.users.iter().any(|u| u.email == new_user.email) {
				return Err(StoreError::DuplicateEmail);
			}
			if !state.accounts.iter().any(|a| a.id == social_account_id) {
				return Err(StoreError::NotFound(format!(
					"social account {social_account_id}"
				)));
			}
			state.next_user_id += 1;
			let user = User {
				id: UserId::new(state.next_user_id),
				email: new_user.email,
				password_hash: new_user.password_hash,
				name: new_user.name,
				avatar: new_user.avatar,
				social_accounts: Vec::new(),
				created_at: Utc::now(),
				updated_at: Utc::now(),
			};
			state.users.push(user.clone());
			let user_id = user.id;
			if let Some(account) = state
				.accounts
				.iter_mut()
				.find(|a| a.id == social_account_id)
			{
				account.user_id = Some(user_id);
				account.updated_at = Utc::now();
			}
			let user = state
				.users
				.iter()
				.find(|u| u.id == user_id)
				.map(|u| MockStore::assemble(&state, u))
				.unwrap();
			Ok(user)
		}

		async fn clear_social_account_owner(
			&self,
			user_id: UserId,
			provider: Provider,
		) -> Result<bool, StoreError> {
			let mut state = self.state.lock().unwrap();
			match state
				.accounts
				.iter_mut()
				.find(|a| a.provider == provider && a.user_id == Some(user_id))
			{
				Some(account) => {
					account.user_id = None;
					account.updated_at = Utc::now();
					Ok(true)
				}
				None => Ok(false),
			}
		}
	}

	// ========================================================================
	// Scripted gateway double
	// ========================================================================

	struct StubGateway {
		provider: Provider,
		identities: HashMap<String, VerifiedIdentity>,
		exchange_calls: AtomicUsize,
	}

	impl StubGateway {
		fn new(provider: Provider) -> Self {
			Self {
				provider,
				identities: HashMap::new(),
				exchange_calls: AtomicUsize::new(0),
			}
		}

		fn with_identity(mut self, code: &str, identity: VerifiedIdentity) -> Self {
			self.identities.insert(code.to_string(), identity);
			self
		}

		fn exchanges(&self) -> usize {
			self.exchange_calls.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl IdentityGateway for StubGateway {
		fn provider(&self) -> Provider {
			self.provider
		}

		fn authorization_url(&self, state: &str, redirect_uri: &str) -> String {
			format!(
				"https://stub.test/{}/auth?state={state}&redirect_uri={redirect_uri}",
				self.provider
			)
		}

		async fn verified_identity(
			&self,
			code: &str,
			_redirect_uri: &str,
		) -> Result<VerifiedIdentity, GatewayError> {
			self.exchange_calls.fetch_add(1, Ordering::SeqCst);
			self.identities
				.get(code)
				.cloned()
				.ok_or_else(|| GatewayError::Rejected(format!("unknown code: {code}")))
		}
	}

	// ========================================================================
	// Fixtures
	// ========================================================================

	const REDIRECT: &str = "https://app.example.com/callback";

	fn identity(subject: &str, email: &str) -> VerifiedIdentity {
		VerifiedIdentity {
			provider_user_id: subject.to_string(),
			email: email.to_string(),
			name: "Ada".to_string(),
			avatar: Some("https://img.example.com/a.png".to_string()),
		}
	}

	fn codec() -> LinkTokenCodec {
		LinkTokenCodec::new(
			&SecretString::new("orchestrator-test-secret".to_string()),
			Duration::minutes(5),
		)
	}

	fn service(
		store: Arc<MockStore>,
		gateways: Vec<Arc<StubGateway>>,
		codec: LinkTokenCodec,
	) -> SocialAuthService {
		let mut registry = ProviderRegistry::new();
		for gateway in gateways {
			registry.register(gateway);
		}
		SocialAuthService::new(store, registry, codec)
	}

	async fn seed_password_user(store: &MockStore, email: &str) -> User {
		store
			.create_user(NewUser {
				email: email.to_string(),
				password_hash: Some("$argon2id$stub".to_string()),
				name: "Bob".to_string(),
				avatar: None,
			})
			.await
			.unwrap()
	}

	// ========================================================================
	// AuthenticateViaProvider
	// ========================================================================

	mod authenticate {
		use super::*;

		#[tokio::test]
		async fn fresh_identity_with_unknown_email_creates_and_owns() {
			let store = Arc::new(MockStore::default());
			let google = Arc::new(
				StubGateway::new(Provider::Google)
					.with_identity("code-1", identity("g-123", "a@example.com")),
			);
			let svc = service(store.clone(), vec![google], codec());

			let outcome = svc
				.authenticate_via_provider("google", "code-1", REDIRECT)
				.await
				.unwrap();

			let user = match outcome {
				AuthOutcome::Authenticated(user) => user,
				other => panic!("expected Authenticated, got {other:?}"),
			};
			assert_eq!(user.email, "a@example.com");
			assert!(user.password_hash.is_none());
			assert_eq!(user.social_accounts.len(), 1);
			assert_eq!(user.social_accounts[0].provider, Provider::Google);
			assert_eq!(user.social_accounts[0].user_id, Some(user.id));
			assert_eq!(store.user_count(), 1);
			assert_eq!(store.account_count(), 1);
		}

		#[tokio::test]
		async fn owned_identity_reauth_is_idempotent() {
			let store = Arc::new(MockStore::default());
			let google = Arc::new(
				StubGateway::new(Provider::Google)
					.with_identity("code-1", identity("g-123", "a@example.com")),
			);
			let svc = service(store.clone(), vec![google], codec());

			let first = svc
				.authenticate_via_provider("google", "code-1", REDIRECT)
				.await
				.unwrap();
			let first_id = match first {
				AuthOutcome::Authenticated(user) => user.id,
				other => panic!("expected Authenticated, got {other:?}"),
			};

			let second = svc
				.authenticate_via_provider("google", "code-1", REDIRECT)
				.await
				.unwrap();
			match second {
				AuthOutcome::Authenticated(user) => assert_eq!(user.id, first_id),
				other => panic!("expected fast path, got {other:?}"),
			}

			// No new rows either way.
			assert_eq!(store.user_count(), 1);
			assert_eq!(store.account_count(), 1);
		}

		#[tokio::test]
		async fn reauth_refreshes_the_provider_snapshot() {
			let store = Arc::new(MockStore::default());
			let google = Arc::new(
				StubGateway::new(Provider::Google)
					.with_identity("code-1", identity("g-123", "a@example.com"))
					.with_identity(
						"code-2",
						VerifiedIdentity {
							provider_user_id: "g-123".to_string(),
							email: "a@example.com".to_string(),
							name: "Ada Lovelace".to_string(),
							avatar: Some("https://img.example.com/new.png".to_string()),
						},
					),
			);
			let svc = service(store.clone(), vec![google], codec());

			svc.authenticate_via_provider("google", "code-1", REDIRECT)
				.await
				.unwrap();
			let outcome = svc
				.authenticate_via_provider("google", "code-2", REDIRECT)
				.await
				.unwrap();

			let user = match outcome {
				AuthOutcome::Authenticated(user) => user,
				other => panic!("expected Authenticated, got {other:?}"),
			};
			assert_eq!(user.social_accounts[0].name, "Ada Lovelace");
			assert_eq!(
				user.social_accounts[0].avatar.as_deref(),
				Some("https://img.example.com/new.png")
			);
			assert_eq!(store.account_count(), 1);
		}

		#[tokio::test]
		async fn matching_email_requires_link_instead_of_merging() {
			let store = Arc::new(MockStore::default());
			let existing = seed_password_user(&store, "a@example.com").await;
			let google = Arc::new(
				StubGateway::new(Provider::Google)
					.with_identity("code-1", identity("g-456", "a@example.com")),
			);
			let svc = service(store.clone(), vec![google], codec());

			let outcome = svc
				.authenticate_via_provider("google", "code-1", REDIRECT)
				.await
				.unwrap();

			match outcome {
				AuthOutcome::LinkRequired { user, link_token } => {
					assert_eq!(user.id, existing.id);
					assert!(!link_token.is_empty());
				}
				other => panic!("expected LinkRequired, got {other:?}"),
			}

			// The identity row exists but was not claimed.
			let account = store
				.get_social_account(Provider::Google, "g-456")
				.await
				.unwrap()
				.unwrap();
			assert!(account.is_unowned());
			assert_eq!(store.user_count(), 1);
		}

		#[tokio::test]
		async fn unknown_provider_fails_before_any_exchange() {
			let store = Arc::new(MockStore::default());
			let google = Arc::new(
				StubGateway::new(Provider::Google)
					.with_identity("code-1", identity("g-123", "a@example.com")),
			);
			let svc = service(store.clone(), vec![google.clone()], codec());

			let err = svc
				.authenticate_via_provider("myspace", "code-1", REDIRECT)
				.await
				.unwrap_err();

			assert!(matches!(err, AuthError::InvalidProvider(_)));
			assert_eq!(google.exchanges(), 0);
			assert_eq!(store.account_count(), 0);
		}

		#[tokio::test]
		async fn known_but_unconfigured_provider_is_invalid() {
			let store = Arc::new(MockStore::default());
			// Only google is registered.
			let google = Arc::new(StubGateway::new(Provider::Google));
			let svc = service(store, vec![google], codec());

			let err = svc
				.authenticate_via_provider("facebook", "code-1", REDIRECT)
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::InvalidProvider(_)));
		}

		#[tokio::test]
		async fn rejected_code_surfaces_fetch_failure() {
			let store = Arc::new(MockStore::default());
			let google = Arc::new(StubGateway::new(Provider::Google));
			let svc = service(store.clone(), vec![google], codec());

			let err = svc
				.authenticate_via_provider("google", "bad-code", REDIRECT)
				.await
				.unwrap_err();

			assert!(matches!(err, AuthError::SocialProviderFetchFailed(_)));
			// Nothing was written before the failure surfaced.
			assert_eq!(store.account_count(), 0);
			assert_eq!(store.user_count(), 0);
		}
	}

	// ========================================================================
	// ConfirmLink
	// ========================================================================

	mod confirm_link {
		use super::*;

		/// Drive the standard pending-link setup: password user owns the
		/// email, google presents a fresh identity with the same email.
		async fn pending_link(
			store: &Arc<MockStore>,
			svc: &SocialAuthService,
		) -> (User, String) {
			seed_password_user(store, "a@example.com").await;
			match svc
				.authenticate_via_provider("google", "code-1", REDIRECT)
				.await
				.unwrap()
			{
				AuthOutcome::LinkRequired { user, link_token } => (user, link_token),
				other => panic!("expected LinkRequired, got {other:?}"),
			}
		}

		fn google_stub() -> Arc<StubGateway> {
			Arc::new(
				StubGateway::new(Provider::Google)
					.with_identity("code-1", identity("g-456", "a@example.com"))
					.with_identity("code-2", identity("g-456", "a@example.com")),
			)
		}

		#[tokio::test]
		async fn confirm_links_identity_to_token_user() {
			let store = Arc::new(MockStore::default());
			let svc = service(store.clone(), vec![google_stub()], codec());
			let (user, token) = pending_link(&store, &svc).await;

			let refreshed = svc
				.confirm_link(&token, "google", "code-2", REDIRECT)
				.await
				.unwrap();

			assert_eq!(refreshed.id, user.id);
			assert_eq!(refreshed.social_accounts.len(), 1);
			assert_eq!(refreshed.social_accounts[0].provider, Provider::Google);
			assert_eq!(refreshed.social_accounts[0].provider_user_id, "g-456");
		}

		#[tokio::test]
		async fn confirm_is_idempotent_for_the_same_owner() {
			let store = Arc::new(MockStore::default());
			let svc = service(store.clone(), vec![google_stub()], codec());
			let (user, token) = pending_link(&store, &svc).await;

			svc.confirm_link(&token, "google", "code-2", REDIRECT)
				.await
				.unwrap();
			// Within the expiry window the token can be presented again;
			// the owner already matches, so this is a no-op success.
			let refreshed = svc
				.confirm_link(&token, "google", "code-2", REDIRECT)
				.await
				.unwrap();
			assert_eq!(refreshed.id, user.id);
			assert_eq!(store.account_count(), 1);
		}

		#[tokio::test]
		async fn invalid_token_aborts_before_any_exchange() {
			let store = Arc::new(MockStore::default());
			let google = google_stub();
			let svc = service(store.clone(), vec![google.clone()], codec());
			pending_link(&store, &svc).await;
			let exchanges_before = google.exchanges();

			let err = svc
				.confirm_link("not-a-token", "google", "code-2", REDIRECT)
				.await
				.unwrap_err();

			assert!(matches!(err, AuthError::InvalidLinkToken));
			assert_eq!(google.exchanges(), exchanges_before);
		}

		#[tokio::test]
		async fn expired_token_is_rejected() {
			let store = Arc::new(MockStore::default());
			let expired_codec = LinkTokenCodec::new(
				&SecretString::new("orchestrator-test-secret".to_string()),
				Duration::minutes(-5),
			);
			let svc = service(store.clone(), vec![google_stub()], expired_codec);
			let (_, token) = pending_link(&store, &svc).await;

			let err = svc
				.confirm_link(&token, "google", "code-2", REDIRECT)
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::InvalidLinkToken));
		}

		#[tokio::test]
		async fn validate_reports_claims_without_consuming() {
			let store = Arc::new(MockStore::default());
			let svc = service(store.clone(), vec![google_stub()], codec());
			let (user, token) = pending_link(&store, &svc).await;

			let claims = svc.validate_link_token(&token).unwrap();
			assert_eq!(claims.user_id, user.id);

			let err = svc.validate_link_token("not-a-token").unwrap_err();
			assert!(matches!(err, AuthError::InvalidLinkToken));

			// Validation alone must not bind the identity.
			let account = store
				.get_social_account(Provider::Google, "g-456")
				.await
				.unwrap()
				.unwrap();
			assert_eq!(account.user_id, None);
		}

		#[tokio::test]
		async fn owner_change_between_mint_and_confirm_is_mismatched() {
			let store = Arc::new(MockStore::default());
			let svc = service(store.clone(), vec![google_stub()], codec());
			let (_, token) = pending_link(&store, &svc).await;

			// Someone else claims the identity while the token is in flight.
			let interloper = store
				.create_user(NewUser {
					email: "c@example.com".to_string(),
					password_hash: Some("$argon2id$stub".to_string()),
					name: "Carol".to_string(),
					avatar: None,
				})
				.await
				.unwrap();
			let account = store
				.get_social_account(Provider::Google, "g-456")
				.await
				.unwrap()
				.unwrap();
			store
				.set_social_account_owner(account.id, interloper.id)
				.await
				.unwrap();

			let err = svc
				.confirm_link(&token, "google", "code-2", REDIRECT)
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::MismatchedLinkedUser));
		}

		#[tokio::test]
		async fn code_for_a_different_identity_is_mismatched() {
			let store = Arc::new(MockStore::default());
			let google = Arc::new(
				StubGateway::new(Provider::Google)
					.with_identity("code-1", identity("g-456", "a@example.com"))
					.with_identity("code-other", identity("g-999", "other@example.com")),
			);
			let svc = service(store.clone(), vec![google], codec());
			let (_, token) = pending_link(&store, &svc).await;

			// Make the other identity exist as its own row.
			svc.authenticate_via_provider("google", "code-other", REDIRECT)
				.await
				.unwrap();

			// Confirming with a code that resolves to g-999 must not bind
			// the token minted for g-456.
			let err = svc
				.confirm_link(&token, "google", "code-other", REDIRECT)
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::MismatchedLinkedUser));
		}

		#[tokio::test]
		async fn rejected_code_surfaces_fetch_failure() {
			let store = Arc::new(MockStore::default());
			let svc = service(store.clone(), vec![google_stub()], codec());
			let (_, token) = pending_link(&store, &svc).await;

			let err = svc
				.confirm_link(&token, "google", "wrong-code", REDIRECT)
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::SocialProviderFetchFailed(_)));
		}
	}

	// ========================================================================
	// LinkSocialAccount / UnlinkSocialAccount
	// ========================================================================

	mod explicit_link {
		use super::*;

		#[tokio::test]
		async fn attaches_unowned_identity_to_the_caller() {
			let store = Arc::new(MockStore::default());
			let user = seed_password_user(&store, "a@example.com").await;
			let facebook = Arc::new(
				StubGateway::new(Provider::Facebook)
					.with_identity("code-1", identity("f-1", "a@example.com")),
			);
			let svc = service(store.clone(), vec![facebook], codec());

			svc.link_social_account(user.id, "facebook", "code-1", REDIRECT)
				.await
				.unwrap();

			let account = store
				.get_social_account(Provider::Facebook, "f-1")
				.await
				.unwrap()
				.unwrap();
			assert_eq!(account.user_id, Some(user.id));
		}

		#[tokio::test]
		async fn identity_owned_by_someone_else_is_already_linked() {
			let store = Arc::new(MockStore::default());
			let owner = seed_password_user(&store, "owner@example.com").await;
			let caller = seed_password_user(&store, "caller@example.com").await;
			let facebook = Arc::new(
				StubGateway::new(Provider::Facebook)
					.with_identity("code-1", identity("f-1", "owner@example.com")),
			);
			let svc = service(store.clone(), vec![facebook], codec());

			svc.link_social_account(owner.id, "facebook", "code-1", REDIRECT)
				.await
				.unwrap();

			let err = svc
				.link_social_account(caller.id, "facebook", "code-1", REDIRECT)
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::SocialAccountAlreadyLinked));

			// Ownership did not move.
			let account = store
				.get_social_account(Provider::Facebook, "f-1")
				.await
				.unwrap()
				.unwrap();
			assert_eq!(account.user_id, Some(owner.id));
		}

		#[tokio::test]
		async fn relinking_own_identity_is_a_noop_success() {
			let store = Arc::new(MockStore::default());
			let user = seed_password_user(&store, "a@example.com").await;
			let facebook = Arc::new(
				StubGateway::new(Provider::Facebook)
					.with_identity("code-1", identity("f-1", "a@example.com")),
			);
			let svc = service(store.clone(), vec![facebook], codec());

			svc.link_social_account(user.id, "facebook", "code-1", REDIRECT)
				.await
				.unwrap();
			svc.link_social_account(user.id, "facebook", "code-1", REDIRECT)
				.await
				.unwrap();

			assert_eq!(store.account_count(), 1);
		}

		#[tokio::test]
		async fn unlink_clears_ownership() {
			let store = Arc::new(MockStore::default());
			let user = seed_password_user(&store, "a@example.com").await;
			let facebook = Arc::new(
				StubGateway::new(Provider::Facebook)
					.with_identity("code-1", identity("f-1", "a@example.com")),
			);
			let svc = service(store.clone(), vec![facebook], codec());
			svc.link_social_account(user.id, "facebook", "code-1", REDIRECT)
				.await
				.unwrap();

			svc.unlink_social_account(user.id, "facebook").await.unwrap();

			let account = store
				.get_social_account(Provider::Facebook, "f-1")
				.await
				.unwrap()
				.unwrap();
			assert!(account.is_unowned());
		}

		#[tokio::test]
		async fn unlink_without_a_link_is_already_unlinked() {
			let store = Arc::new(MockStore::default());
			let user = seed_password_user(&store, "a@example.com").await;
			let svc = service(store.clone(), vec![], codec());

			let err = svc
				.unlink_social_account(user.id, "facebook")
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::SocialAccountAlreadyUnlinked));
		}

		#[tokio::test]
		async fn unlink_works_without_a_configured_gateway() {
			// Credentials removed from config after the user linked; the
			// provider name still parses, so unlinking still works.
			let store = Arc::new(MockStore::default());
			let user = seed_password_user(&store, "a@example.com").await;
			let facebook = Arc::new(
				StubGateway::new(Provider::Facebook)
					.with_identity("code-1", identity("f-1", "a@example.com")),
			);
			let svc = service(store.clone(), vec![facebook], codec());
			svc.link_social_account(user.id, "facebook", "code-1", REDIRECT)
				.await
				.unwrap();

			let bare = service(store.clone(), vec![], codec());
			bare.unlink_social_account(user.id, "facebook").await.unwrap();
		}

		#[tokio::test]
		async fn unlink_rejects_unknown_provider_names() {
			let store = Arc::new(MockStore::default());
			let user = seed_password_user(&store, "a@example.com").await;
			let svc = service(store, vec![], codec());

			let err = svc
				.unlink_social_account(user.id, "myspace")
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::InvalidProvider(_)));
		}
	}

	// ========================================================================
	// Authorization URLs
	// ========================================================================

	mod authorization_url {
		use super::*;

		#[tokio::test]
		async fn builds_url_for_configured_provider() {
			let google = Arc::new(StubGateway::new(Provider::Google));
			let svc = service(Arc::new(MockStore::default()), vec![google], codec());

			let url = svc
				.authorization_url("google", "state-1", REDIRECT)
				.unwrap();
			assert!(url.contains("state=state-1"));
			assert!(url.contains("google"));
		}

		#[tokio::test]
		async fn unknown_provider_is_invalid() {
			let svc = service(Arc::new(MockStore::default()), vec![], codec());
			let err = svc
				.authorization_url("google", "state-1", REDIRECT)
				.unwrap_err();
			assert!(matches!(err, AuthError::InvalidProvider(_)));
		}
	}

	// ========================================================================
	// Concrete end-to-end scenarios
	// ========================================================================

	mod scenarios {
		use super::*;

		#[tokio::test]
		async fn g123_fresh_email_creates_then_fast_paths() {
			let store = Arc::new(MockStore::default());
			let google = Arc::new(
				StubGateway::new(Provider::Google)
					.with_identity("code-1", identity("g-123", "a@example.com"))
					.with_identity("code-2", identity("g-123", "a@example.com")),
			);
			let svc = service(store.clone(), vec![google], codec());

			let first = match svc
				.authenticate_via_provider("google", "code-1", REDIRECT)
				.await
				.unwrap()
			{
				AuthOutcome::Authenticated(user) => user,
				other => panic!("expected Authenticated, got {other:?}"),
			};
			assert_eq!(first.email, "a@example.com");

			let second = match svc
				.authenticate_via_provider("google", "code-2", REDIRECT)
				.await
				.unwrap()
			{
				AuthOutcome::Authenticated(user) => user,
				other => panic!("expected Authenticated, got {other:?}"),
			};
			assert_eq!(second.id, first.id);
			assert_eq!(store.account_count(), 1);
		}

		#[tokio::test]
		async fn g456_existing_password_user_links_after_confirm() {
			let store = Arc::new(MockStore::default());
			let google = Arc::new(
				StubGateway::new(Provider::Google)
					.with_identity("code-1", identity("g-456", "a@example.com"))
					.with_identity("code-2", identity("g-456", "a@example.com")),
			);
			let svc = service(store.clone(), vec![google], codec());
			let existing = seed_password_user(&store, "a@example.com").await;

			let token = match svc
				.authenticate_via_provider("google", "code-1", REDIRECT)
				.await
				.unwrap()
			{
				AuthOutcome::LinkRequired { user, link_token } => {
					assert_eq!(user.id, existing.id);
					link_token
				}
				other => panic!("expected LinkRequired, got {other:?}"),
			};

			let linked = svc
				.confirm_link(&token, "google", "code-2", REDIRECT)
				.await
				.unwrap();
			assert_eq!(linked.id, existing.id);

			let fetched = store.get_user(existing.id).await.unwrap();
			assert_eq!(fetched.linked_providers(), vec![Provider::Google]);
		}
	}
}
