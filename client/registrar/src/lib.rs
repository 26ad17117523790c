#![forbid(unsafe_code)]

//! Registrar domain logic.
//!
//! Holds the RSA blind-signing key for one voting, signs a blinded
//! ballot label on behalf of a `tempID`-identified voter, and enforces
//! at-most-one-signature-per-`tempID`-per-voting with exactly one
//! permitted revote. The Registrar never sees the label or the vote
//! itself - only the blinded value it signs.

use async_trait::async_trait;
use evoting_bigint::Uint;
use evoting_blind_rsa::{sign_blinded, RsaPrivateKey};
use evoting_wire::{VoteError, VotingState};

/// How many times a `tempID` has already registered for a voting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TempIdPresence {
	Absent,
	Once,
	TwiceOrMore,
}

/// Persistence for the `(voting_id, tempID)` bookkeeping table. A real
/// implementation enforces uniqueness with a database unique constraint
/// plus an insert-or-select pattern inside a transaction; this trait
/// only captures the two operations the Registrar's logic needs.
#[async_trait]
pub trait RegistrarStore: Send + Sync {
	async fn temp_id_presence(
		&self,
		voting_id: &str,
		temp_id: &Uint,
	) -> Result<TempIdPresence, VoteError>;

	/// Records one more registration for `(voting_id, temp_id)`.
	async fn record_temp_id(&self, voting_id: &str, temp_id: &Uint) -> Result<(), VoteError>;
}

/// The Registrar service for a single voting's RSA key material.
pub struct Registrar<S> {
	store: S,
	private_key: RsaPrivateKey,
	revote_multiplier: Uint,
}

impl<S: RegistrarStore> Registrar<S> {
	pub fn new(store: S, private_key: RsaPrivateKey, revote_multiplier: Uint) -> Self {
		Registrar { store, private_key, revote_multiplier }
	}

	/// Signs `blinded_ballot` on behalf of `temp_id`, applying the
	/// revote-multiplier trick on a second registration and refusing a
	/// third.
	pub async fn register(
		&self,
		voting_state: VotingState,
		voting_id: &str,
		temp_id: &Uint,
		blinded_ballot: &Uint,
	) -> Result<Uint, VoteError> {
		if !voting_state.accepts_registration() {
			return Err(VoteError::VotingNotOpen);
		}

		match self.store.temp_id_presence(voting_id, temp_id).await? {
			TempIdPresence::Absent => {
				self.store.record_temp_id(voting_id, temp_id).await?;
				tracing::debug!(voting_id, "registrar: first registration for tempID");
				Ok(sign_blinded(blinded_ballot, &self.private_key))
			}
			TempIdPresence::Once => {
				self.store.record_temp_id(voting_id, temp_id).await?;
				tracing::debug!(voting_id, "registrar: revote registration for tempID");
				let scaled = blinded_ballot.mul(&self.revote_multiplier).rem(&self.private_key.n);
				Ok(sign_blinded(&scaled, &self.private_key))
			}
			TempIdPresence::TwiceOrMore => Err(VoteError::RevoteExhausted),
		}
	}
}

/// An in-memory `RegistrarStore`, standing in for the Postgres-backed
/// table the original design calls for.
#[derive(Default)]
pub struct InMemoryRegistrarStore {
	counts: tokio::sync::RwLock<std::collections::HashMap<(String, Vec<u8>), u8>>,
}

impl InMemoryRegistrarStore {
	pub fn new() -> Self {
		InMemoryRegistrarStore::default()
	}
}

#[async_trait]
impl RegistrarStore for InMemoryRegistrarStore {
	async fn temp_id_presence(
		&self,
		voting_id: &str,
		temp_id: &Uint,
	) -> Result<TempIdPresence, VoteError> {
		let key = (voting_id.to_string(), temp_id.to_bytes_be());
		let counts = self.counts.read().await;
		Ok(match counts.get(&key).copied().unwrap_or(0) {
			0 => TempIdPresence::Absent,
			1 => TempIdPresence::Once,
			_ => TempIdPresence::TwiceOrMore,
		})
	}

	async fn record_temp_id(&self, voting_id: &str, temp_id: &Uint) -> Result<(), VoteError> {
		let key = (voting_id.to_string(), temp_id.to_bytes_be());
		let mut counts = self.counts.write().await;
		*counts.entry(key).or_insert(0) += 1;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use evoting_blind_rsa::{blind, generate_keypair, message_to_bigint, unblind, verify};

	fn registrar_with_small_key() -> (Registrar<InMemoryRegistrarStore>, evoting_blind_rsa::RsaPublicKey) {
		let keys = generate_keypair(128);
		let public = keys.public.clone();
		let registrar =
			Registrar::new(InMemoryRegistrarStore::new(), keys.private, Uint::from_u64(65537));
		(registrar, public)
	}

	#[tokio::test]
	async fn first_registration_signs_directly() {
		let (registrar, public) = registrar_with_small_key();
		let temp_id = Uint::from_u64(7);
		let label = message_to_bigint(b"ballot label");
		let (blinded, r) = blind(&label, &public).unwrap();

		let sig = registrar
			.register(VotingState::Accepting, "v1", &temp_id, &blinded)
			.await
			.unwrap();
		let unblinded = unblind(&sig, &r, &public).unwrap();
		assert!(verify(&label, &unblinded, &public));
	}

	#[tokio::test]
	async fn second_registration_is_a_revote_and_third_is_rejected() {
		let (registrar, public) = registrar_with_small_key();
		let temp_id = Uint::from_u64(7);
		let label = message_to_bigint(b"ballot label");
		let (blinded, _r) = blind(&label, &public).unwrap();

		registrar.register(VotingState::Accepting, "v1", &temp_id, &blinded).await.unwrap();
		registrar.register(VotingState::Accepting, "v1", &temp_id, &blinded).await.unwrap();
		let third = registrar.register(VotingState::Accepting, "v1", &temp_id, &blinded).await;
		assert_eq!(third, Err(VoteError::RevoteExhausted));
	}

	#[tokio::test]
	async fn revote_signature_uses_multiplier_and_still_verifies() {
		let (registrar, public) = registrar_with_small_key();
		let temp_id = Uint::from_u64(11);
		let label = message_to_bigint(b"ballot label");
		let (blinded, r) = blind(&label, &public).unwrap();

		registrar.register(VotingState::Accepting, "v1", &temp_id, &blinded).await.unwrap();
		let revote_sig =
			registrar.register(VotingState::Accepting, "v1", &temp_id, &blinded).await.unwrap();

		let unblinded = unblind(&revote_sig, &r, &public).unwrap();
		let k = Uint::from_u64(65537);
		let scaled_label = label.mul(&k).rem(&public.n);
		assert!(verify(&scaled_label, &unblinded, &public));
		assert!(!verify(&label, &unblinded, &public));
	}

	#[tokio::test]
	async fn refuses_registration_outside_accepting() {
		let (registrar, public) = registrar_with_small_key();
		let label = message_to_bigint(b"ballot label");
		let (blinded, _r) = blind(&label, &public).unwrap();
		let result =
			registrar.register(VotingState::Draft, "v1", &Uint::from_u64(1), &blinded).await;
		assert_eq!(result, Err(VoteError::VotingNotOpen));
	}
}
