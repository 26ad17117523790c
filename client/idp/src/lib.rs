#![forbid(unsafe_code)]

//! Identity Provider domain logic.
//!
//! Authenticating the human voter (password verification, session
//! issuance) is plumbing out of scope here; what this crate owns is the
//! one crypto-relevant step the IdP performs: turning an authenticated
//! session into an unlinkable `tempID = H(userID ‖ nonce)` that the
//! Registrar can key its revote bookkeeping on without ever learning who
//! the voter is.

use std::collections::HashMap;

use async_trait::async_trait;
use evoting_bigint::Uint;
use evoting_wire::{domain_hash, VoteError};
use tokio::sync::RwLock;

/// The claims an authenticated session carries: the voter's internal
/// user id and the per-session nonce `tempID` is derived from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionClaims {
	pub user_id: u64,
	pub nonce: Uint,
}

/// Session lookup, backed by whatever session store (Redis, in this
/// system's original design) sits behind the IdP. Authentication itself
/// - verifying a password, minting a JWT - is out of scope; this trait
/// only covers resolving an already-issued token back to its claims.
#[async_trait]
pub trait IdpStore: Send + Sync {
	async fn lookup_session(&self, token: &str) -> Result<SessionClaims, VoteError>;
}

/// The Identity Provider service: resolves a session token to the
/// unlinkable `tempID` the Registrar uses to track registrations.
pub struct IdentityProvider<S> {
	store: S,
}

impl<S: IdpStore> IdentityProvider<S> {
	pub fn new(store: S) -> Self {
		IdentityProvider { store }
	}

	/// Resolves `session_token` to the voter's `tempID` for this session.
	pub async fn resolve_temp_id(&self, session_token: &str) -> Result<Uint, VoteError> {
		let claims = self.store.lookup_session(session_token).await?;
		let temp_id = compute_temp_id(claims.user_id, &claims.nonce);
		tracing::debug!(user_id = claims.user_id, %temp_id, "resolved tempID for session");
		Ok(temp_id)
	}
}

/// `tempID = H(userID ‖ nonce)`.
pub fn compute_temp_id(user_id: u64, nonce: &Uint) -> Uint {
	domain_hash(&[&user_id.to_be_bytes(), &nonce.to_bytes_be()])
}

/// An in-memory `IdpStore`, standing in for the Redis-backed session
/// store the original design calls for. Used by this crate's own tests
/// and by the `testing` crate's scenario fixtures.
#[derive(Default)]
pub struct InMemoryIdpStore {
	sessions: RwLock<HashMap<String, SessionClaims>>,
}

impl InMemoryIdpStore {
	pub fn new() -> Self {
		InMemoryIdpStore::default()
	}

	/// Issues a session token carrying the given claims (test/fixture use
	/// only - a real IdP would mint this after verifying a password).
	pub async fn issue_session(&self, token: impl Into<String>, user_id: u64, nonce: Uint) {
		self.sessions.write().await.insert(token.into(), SessionClaims { user_id, nonce });
	}
}

#[async_trait]
impl IdpStore for InMemoryIdpStore {
	async fn lookup_session(&self, token: &str) -> Result<SessionClaims, VoteError> {
		self.sessions.read().await.get(token).cloned().ok_or(VoteError::SessionInvalid)
	}
}

/// Lets callers share one store between an `IdentityProvider` and whatever
/// else (tests, fixtures) needs to issue sessions into the same backing map,
/// without `IdentityProvider` taking a borrow.
#[async_trait]
impl<S: IdpStore> IdpStore for std::sync::Arc<S> {
	async fn lookup_session(&self, token: &str) -> Result<SessionClaims, VoteError> {
		self.as_ref().lookup_session(token).await
	}
}
